use std::collections::VecDeque;

use itertools::Itertools;
use log::trace;

use synth_core::{
    Permutation, ReverseElement, SynthesisError, Transposition,
    bits::{Word, bits_of, full_mask, lowest_set_bit},
};

use crate::{
    edges::{BooleanEdge, BooleanEdgeSearcher},
    options::SynthesisOptions,
};

/// One reduction step's choice: a lone transposition, or a Boolean edge
/// whose subcube realizes several transpositions with one gate.
#[derive(Clone, Copy, Debug)]
pub enum PartialResult {
    Transposition(Transposition),
    Edge { edge: BooleanEdge, diff: Word },
}

/// How a partial result ranks against a competing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartialResultKind {
    CommonPair,
    Edge { covered: usize },
}

/// Scalar summary used to pick between the left and right residual of a
/// reduction step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartialResultParams {
    kind: PartialResultKind,
    element_count: usize,
}

impl PartialResultParams {
    #[must_use]
    pub fn kind(&self) -> PartialResultKind {
        self.kind
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Edge beats non-edge, larger coverage beats smaller, and a smaller
    /// residual breaks ties. Equal candidates are not "better".
    #[must_use]
    pub fn is_better_than(&self, other: &PartialResultParams) -> bool {
        use PartialResultKind::{CommonPair, Edge};

        match (self.kind, other.kind) {
            (Edge { .. }, CommonPair) => true,
            (CommonPair, Edge { .. }) => false,
            (Edge { covered: mine }, Edge { covered: theirs }) if mine != theirs => mine > theirs,
            _ => self.element_count < other.element_count,
        }
    }
}

/// Holds one permutation and the precomputed choice for its next
/// reduction step.
pub struct PartialGtGenerator {
    permutation: Permutation,
    n: u32,
    edge_explicit: bool,
    coverage_threshold: f64,
    partial_result: Option<PartialResult>,
    left_residual: Option<Permutation>,
    right_residual: Option<Permutation>,
}

impl PartialGtGenerator {
    #[must_use]
    pub fn new(permutation: Permutation, n: u32, options: &SynthesisOptions) -> Self {
        PartialGtGenerator {
            permutation,
            n,
            edge_explicit: options.edge_explicit_mode,
            coverage_threshold: options.edge_coverage_threshold,
            partial_result: None,
            left_residual: None,
            right_residual: None,
        }
    }

    #[must_use]
    pub fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    /// Choose the next partial result and precompute both residuals.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::InternalInvariantViolation`] when called
    /// on an empty permutation.
    pub fn prepare_for_generation(&mut self) -> Result<(), SynthesisError> {
        if self.permutation.is_empty() {
            return Err(SynthesisError::InternalInvariantViolation(
                "prepared a reduction step for an empty permutation",
            ));
        }

        let current_count = self.permutation.element_count();
        let (result, taus) = self
            .find_best_edge()
            .filter(|(_, taus)| {
                // The edge must strictly shrink the permutation under
                // either multiplication; partial coverage can otherwise
                // grow the residual.
                let left = self.permutation.multiply_by_transpositions(taus, true);
                let right = self.permutation.multiply_by_transpositions(taus, false);
                left.element_count() < current_count && right.element_count() < current_count
            })
            .unwrap_or_else(|| {
                let pair = self
                    .permutation
                    .longest_cycle()
                    .expect("the permutation is not empty")
                    .first_transposition();
                (PartialResult::Transposition(pair), vec![pair])
            });

        trace!("partial result for {}: {result:?}", self.permutation);

        self.left_residual = Some(self.permutation.multiply_by_transpositions(&taus, true));
        self.right_residual = Some(self.permutation.multiply_by_transpositions(&taus, false));
        self.partial_result = Some(result);

        Ok(())
    }

    /// Summary of the prepared choice for left/right comparison.
    ///
    /// # Panics
    ///
    /// Panics unless [`prepare_for_generation`](Self::prepare_for_generation)
    /// ran first.
    #[must_use]
    pub fn partial_result_params(&self) -> PartialResultParams {
        let kind = match self.partial_result.expect("prepare_for_generation ran") {
            PartialResult::Transposition(_) => PartialResultKind::CommonPair,
            PartialResult::Edge { edge, .. } => PartialResultKind::Edge {
                covered: edge.covered_transposition_count(),
            },
        };

        PartialResultParams {
            kind,
            element_count: self.permutation.element_count(),
        }
    }

    /// Whether peeling the partial result off the left differs from
    /// peeling it off the right.
    ///
    /// # Panics
    ///
    /// Panics unless [`prepare_for_generation`](Self::prepare_for_generation)
    /// ran first.
    #[must_use]
    pub fn left_and_right_differ(&self) -> bool {
        self.left_residual.as_ref().expect("prepare_for_generation ran")
            != self.right_residual.as_ref().expect("prepare_for_generation ran")
    }

    /// The permutation that remains after this step, under left or right
    /// multiplication.
    ///
    /// # Panics
    ///
    /// Panics unless [`prepare_for_generation`](Self::prepare_for_generation)
    /// ran first.
    #[must_use]
    pub fn residual_permutation(&self, left: bool) -> Permutation {
        let residual = if left {
            &self.left_residual
        } else {
            &self.right_residual
        };

        residual.clone().expect("prepare_for_generation ran")
    }

    /// The gate block realizing the prepared partial result.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::InternalInvariantViolation`] when no
    /// partial result was prepared.
    pub fn implement_partial_result(
        &self,
    ) -> Result<VecDeque<ReverseElement>, SynthesisError> {
        match self.partial_result {
            Some(PartialResult::Transposition(transposition)) => {
                // A lone pair is the one-word "cube" whose only star is
                // the anchor bit; polarities come from the endpoint with
                // a clear anchor.
                let diff = transposition.diff();
                let anchor = lowest_set_bit(diff);
                let base = if transposition.smaller() & anchor == 0 {
                    transposition.smaller()
                } else {
                    transposition.larger()
                };

                flip_block(self.n, diff, anchor, base)
            }
            Some(PartialResult::Edge { edge, diff }) => {
                flip_block(self.n, diff, edge.stars_mask(), edge.base_value())
            }
            None => Err(SynthesisError::InternalInvariantViolation(
                "no partial result was prepared",
            )),
        }
    }

    /// The best Boolean edge over the extractable transpositions, with
    /// the full involution its gate realizes.
    fn find_best_edge(&self) -> Option<(PartialResult, Vec<Transposition>)> {
        let extractable: Vec<Transposition> = self
            .permutation
            .iter()
            .flat_map(|cycle| cycle.transpositions())
            .collect();

        // Group the extractable transpositions by translation; only a
        // same-diff group can share one gate.
        let (diff, group) = extractable
            .iter()
            .copied()
            .into_group_map_by(Transposition::diff)
            .into_iter()
            .max_by_key(|(diff, group)| (group.len(), std::cmp::Reverse(*diff)))?;

        if group.len() < 2 {
            return None;
        }

        let mut searcher =
            BooleanEdgeSearcher::from_transpositions(&group, self.n, full_mask(self.n));
        searcher.set_explicit_edge(self.edge_explicit);
        searcher.set_coverage_threshold(self.coverage_threshold);

        let edge = searcher.find_edge()?;
        if edge.covered_transposition_count() < 2 || edge.stars_mask() & diff != diff {
            return None;
        }

        // The gate swaps x with x ^ diff across the whole subcube, so the
        // residual must be taken against that full involution, covered or
        // not.
        let anchor = lowest_set_bit(diff);
        let taus: Vec<Transposition> = edge
            .words()
            .filter(|word| word & anchor == 0)
            .map(|word| Transposition::new(word, word ^ diff))
            .collect();

        Some((PartialResult::Edge { edge, diff }, taus))
    }
}

/// The conjugation block `C . core . C^-1` swapping `x` with `x ^ diff`
/// across the subcube `(base, stars)`: one aligning CNOT
/// `(control = anchor, target = p)` per non-anchor bit `p` of `diff`,
/// around a core gate that flips the anchor under controls on every
/// non-star bit, polarities taken from `base`. Each CNOT is an
/// involution, so the closing run is simply reversed.
fn flip_block(
    n: u32,
    diff: Word,
    stars: Word,
    base: Word,
) -> Result<VecDeque<ReverseElement>, SynthesisError> {
    let anchor = lowest_set_bit(diff);
    let cnots = bits_of(diff & !anchor)
        .map(|target| ReverseElement::with_control(n, target, anchor))
        .collect::<Result<Vec<_>, _>>()?;

    let control_mask = full_mask(n) & !stars;
    let core = ReverseElement::with_inversions(n, anchor, control_mask, control_mask & !base)?;

    let mut block: VecDeque<ReverseElement> = cnots.iter().copied().collect();
    block.push_back(core);
    block.extend(cnots.iter().rev().copied());

    Ok(block)
}
