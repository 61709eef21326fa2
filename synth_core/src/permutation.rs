use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use itertools::Itertools;

use crate::{
    bits::Word,
    cycle::{Cycle, Transposition},
    error::SynthesisError,
    truth_table::check_is_permutation,
};

/// A permutation on table indices, stored as its disjoint non-trivial
/// cycles. Fixed points are never stored.
#[derive(Clone, Default)]
pub struct Permutation {
    cycles: Vec<Cycle>,
}

impl Permutation {
    #[must_use]
    pub fn new(cycles: Vec<Cycle>) -> Self {
        Permutation { cycles }
    }

    #[must_use]
    pub fn empty() -> Self {
        Permutation::default()
    }

    pub fn append(&mut self, cycle: Cycle) {
        self.cycles.push(cycle);
    }

    #[must_use]
    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cycle> {
        self.cycles.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// The number of non-fixed points, i.e. the sum of cycle lengths.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.cycles.iter().map(Cycle::len).sum()
    }

    /// A cycle of length `k` decomposes into `k - 1` transpositions, so
    /// the permutation is even when the total over cycles is even.
    #[must_use]
    pub fn is_even(&self) -> bool {
        self.cycles.iter().map(|cycle| cycle.len() - 1).sum::<usize>() % 2 == 0
    }

    /// Every point moved by the permutation, in ascending order.
    #[must_use]
    pub fn support(&self) -> BTreeSet<Word> {
        self.cycles.iter().flat_map(Cycle::iter).collect()
    }

    /// Where the permutation sends `value`.
    #[must_use]
    pub fn map(&self, value: Word) -> Word {
        for cycle in &self.cycles {
            let mapped = cycle.map(value);
            if mapped != value {
                return mapped;
            }
        }

        value
    }

    /// The longest cycle, ties broken by storage order; `None` when the
    /// permutation is empty.
    #[must_use]
    pub fn longest_cycle(&self) -> Option<&Cycle> {
        self.cycles.iter().max_by_key(|cycle| cycle.len())
    }

    /// Append a transposition of the two smallest fixed points so that an
    /// odd permutation becomes even. Even permutations are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::CannotCompleteToEven`] when fewer than
    /// two fixed points below `table_size` exist.
    pub fn complete_to_even(&mut self, table_size: usize) -> Result<(), SynthesisError> {
        if self.is_even() {
            return Ok(());
        }

        let support = self.support();
        let mut fixed_points =
            (0..table_size as Word).filter(|point| !support.contains(point));

        match (fixed_points.next(), fixed_points.next()) {
            (Some(first), Some(second)) => {
                self.cycles.push(Cycle::new(vec![first, second]));
                Ok(())
            }
            _ => Err(SynthesisError::CannotCompleteToEven { table_size }),
        }
    }

    /// The residual permutation after peeling an involution `tau` given as
    /// disjoint transpositions.
    ///
    /// With `tau_first` the residual is `x -> self(tau(x))` (the gates for
    /// `tau` come first in the scheme); otherwise it is `x -> tau(self(x))`
    /// (the gates for `tau` come last). Fixed points of the product are
    /// dropped.
    #[must_use]
    pub fn multiply_by_transpositions(
        &self,
        taus: &[Transposition],
        tau_first: bool,
    ) -> Permutation {
        let tau = |value: Word| {
            taus.iter()
                .find(|transposition| transposition.contains(value))
                .map_or(value, |transposition| transposition.map(value))
        };

        let domain: BTreeSet<Word> = taus
            .iter()
            .flat_map(|transposition| [transposition.smaller(), transposition.larger()])
            .chain(self.support())
            .collect();

        let product: BTreeMap<Word, Word> = domain
            .into_iter()
            .filter_map(|point| {
                let image = if tau_first {
                    self.map(tau(point))
                } else {
                    tau(self.map(point))
                };

                (image != point).then_some((point, image))
            })
            .collect();

        cycles_from_mapping(&product)
    }
}

impl PartialEq for Permutation {
    fn eq(&self, other: &Self) -> bool {
        let canonicalize = |permutation: &Permutation| {
            permutation
                .cycles
                .iter()
                .map(Cycle::canonical)
                .sorted_by_key(Cycle::min_element)
                .collect_vec()
        };

        canonicalize(self) == canonicalize(other)
    }
}

impl Eq for Permutation {}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cycles.is_empty() {
            f.write_str("Id")
        } else {
            for cycle in &self.cycles {
                write!(f, "{cycle}")?;
            }
            Ok(())
        }
    }
}

impl fmt::Debug for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Reassemble disjoint cycles from a sparse mapping of moved points. Keys
/// are walked in ascending order, so every cycle starts at its smallest
/// element and the cycle list is sorted by those starts.
fn cycles_from_mapping(mapping: &BTreeMap<Word, Word>) -> Permutation {
    let mut visited = BTreeSet::new();
    let mut cycles = Vec::new();

    for &start in mapping.keys() {
        if !visited.insert(start) {
            continue;
        }

        let mut orbit = vec![start];
        let mut current = mapping[&start];
        while current != start {
            visited.insert(current);
            orbit.push(current);
            // The image of a moved point is itself moved, so the orbit
            // stays within the mapping's keys.
            current = mapping[&current];
        }

        cycles.push(Cycle::new(orbit));
    }

    Permutation::new(cycles)
}

/// Build a [`Permutation`] from a truth table by collecting cycle pieces
/// and merging them.
///
/// # Errors
///
/// Returns [`SynthesisError::NotAPermutation`] when the table is not a
/// bijection on a power-of-two domain, and
/// [`SynthesisError::InternalInvariantViolation`] when piece collection
/// runs away (a core bug, not an input problem).
pub fn create_permutation(table: &[Word]) -> Result<Permutation, SynthesisError> {
    check_is_permutation(table)?;

    let pieces = find_pieces(table)?;
    let cycles = merge_pieces(pieces);

    Ok(Permutation::new(
        cycles.into_iter().map(Cycle::new).collect(),
    ))
}

/// Walk the table by input index, following `x -> T[x] -> T[T[x]] -> ...`
/// and consuming every visited entry. Each walk emits one piece: a full
/// cycle, or a fragment ending where the walk hit a consumed entry.
fn find_pieces(table: &[Word]) -> Result<Vec<Vec<Word>>, SynthesisError> {
    let mut working: Vec<Option<Word>> = table.iter().copied().map(Some).collect();
    let mut pieces = Vec::new();

    for x in 0..working.len() as Word {
        let Some(y) = working[x as usize].take() else {
            continue;
        };

        if y == x {
            continue;
        }

        let mut piece = vec![x];
        let mut z = y;

        loop {
            if z == x {
                break;
            }

            piece.push(z);
            if piece.len() > working.len() {
                return Err(SynthesisError::InternalInvariantViolation(
                    "cycle piece outgrew the table",
                ));
            }

            match working[z as usize].take() {
                Some(next) if next != z => z = next,
                _ => break,
            }
        }

        pieces.push(piece);
    }

    Ok(pieces)
}

/// Splice pieces end-to-start until no piece's last element matches
/// another's first, leaving the closed cycles.
fn merge_pieces(pieces: Vec<Vec<Word>>) -> Vec<Vec<Word>> {
    let mut cycles = pieces;

    loop {
        let mut merged_any = false;
        let mut output: Vec<Vec<Word>> = Vec::new();

        for piece in cycles {
            let mut merged = false;

            for cycle in &mut output {
                if cycle.first() == piece.last() {
                    let mut spliced = piece[..piece.len() - 1].to_vec();
                    spliced.extend_from_slice(cycle);
                    *cycle = spliced;
                    merged = true;
                } else if cycle.last() == piece.first() {
                    cycle.extend_from_slice(&piece[1..]);
                    merged = true;
                }

                if merged {
                    break;
                }
            }

            if merged {
                merged_any = true;
            } else {
                output.push(piece);
            }
        }

        cycles = output;
        if !merged_any {
            return cycles;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permutation_of(table: &[Word]) -> Permutation {
        create_permutation(table).unwrap()
    }

    #[test]
    fn identity_yields_empty_permutation() {
        let permutation = permutation_of(&[0, 1, 2, 3]);

        assert!(permutation.is_empty());
        assert_eq!(permutation.element_count(), 0);
        assert!(permutation.is_even());
    }

    #[test]
    fn four_cycle_from_table() {
        let permutation = permutation_of(&[1, 2, 3, 0]);

        assert_eq!(permutation.cycles().len(), 1);
        assert_eq!(permutation.cycles()[0].elements(), &[0, 1, 2, 3]);
        assert_eq!(permutation.element_count(), 4);
        assert!(!permutation.is_even());
    }

    #[test]
    fn disjoint_swaps_from_table() {
        let permutation = permutation_of(&[0, 1, 2, 3, 5, 4, 7, 6]);

        assert_eq!(permutation.cycles().len(), 2);
        assert_eq!(permutation.cycles()[0].elements(), &[4, 5]);
        assert_eq!(permutation.cycles()[1].elements(), &[6, 7]);
        assert!(permutation.is_even());
    }

    #[test]
    fn support_matches_moved_points() {
        let table = vec![0, 2, 1, 3, 4, 6, 7, 5];
        let permutation = permutation_of(&table);

        let moved: BTreeSet<Word> = (0..table.len() as Word)
            .filter(|&x| table[x as usize] != x)
            .collect();
        assert_eq!(permutation.support(), moved);

        // Cycles are pairwise disjoint and never of length one.
        let total: usize = permutation.iter().map(Cycle::len).sum();
        assert_eq!(total, moved.len());
        assert!(permutation.iter().all(|cycle| cycle.len() >= 2));
    }

    #[test]
    fn cycles_reconstruct_the_table() {
        let table = vec![3, 0, 5, 1, 4, 7, 2, 6];
        let permutation = permutation_of(&table);

        let rebuilt: Vec<Word> = (0..table.len() as Word)
            .map(|x| permutation.map(x))
            .collect();
        assert_eq!(rebuilt, table);
    }

    #[test]
    fn rejects_non_permutations() {
        assert_eq!(
            create_permutation(&[0, 0, 2, 3]),
            Err(SynthesisError::NotAPermutation { size: 4 })
        );
        assert_eq!(
            create_permutation(&[0, 1, 2]),
            Err(SynthesisError::NotAPermutation { size: 3 })
        );
        assert_eq!(
            create_permutation(&[0, 4, 2, 3]),
            Err(SynthesisError::NotAPermutation { size: 4 })
        );
    }

    #[test]
    fn piece_merging_splices_fragments() {
        let merged = merge_pieces(vec![vec![4, 5], vec![2, 3, 4], vec![0, 1, 2]]);

        assert_eq!(merged, vec![vec![0, 1, 2, 3, 4, 5]]);
    }

    #[test]
    fn parity_completion() {
        // A single transposition is odd.
        let mut permutation = permutation_of(&[1, 0, 2, 3]);
        permutation.complete_to_even(4).unwrap();

        assert!(permutation.is_even());
        assert_eq!(permutation.cycles().len(), 2);
        assert_eq!(permutation.cycles()[1].elements(), &[2, 3]);

        // Even permutations are untouched.
        let mut even = permutation_of(&[1, 2, 0, 3]);
        even.complete_to_even(4).unwrap();
        assert_eq!(even.cycles().len(), 1);
    }

    #[test]
    fn parity_completion_needs_two_fixed_points() {
        // A 4-cycle over the whole domain is odd and leaves no fixed
        // points to pair up.
        let mut stuck = permutation_of(&[1, 2, 3, 0]);
        assert!(!stuck.is_even());
        assert_eq!(
            stuck.complete_to_even(4),
            Err(SynthesisError::CannotCompleteToEven { table_size: 4 })
        );
    }

    #[test]
    fn residual_under_left_and_right_multiplication() {
        // P = (0 1 2 3), tau = {0, 1}.
        let permutation = permutation_of(&[1, 2, 3, 0]);
        let tau = [Transposition::new(0, 1)];

        // tau first: 0 -> tau -> 1 -> P -> 2, 1 stays fixed.
        let left = permutation.multiply_by_transpositions(&tau, true);
        assert_eq!(left, Permutation::new(vec![Cycle::new(vec![0, 2, 3])]));

        // tau last: P sends 3 -> 0, then tau sends 0 -> 1; 0 stays fixed.
        let right = permutation.multiply_by_transpositions(&tau, false);
        assert_eq!(right, Permutation::new(vec![Cycle::new(vec![1, 2, 3])]));

        assert_ne!(left, right);
        assert_eq!(left.element_count(), 3);
        assert_eq!(right.element_count(), 3);
    }

    #[test]
    fn peeling_a_two_cycle_empties_it() {
        let permutation = permutation_of(&[1, 0, 2, 3]);
        let tau = [Transposition::new(0, 1)];

        let left = permutation.multiply_by_transpositions(&tau, true);
        let right = permutation.multiply_by_transpositions(&tau, false);

        assert!(left.is_empty());
        assert!(right.is_empty());
        assert_eq!(left, right);
    }

    #[test]
    fn canonical_equality_ignores_rotation_and_order() {
        let a = Permutation::new(vec![
            Cycle::new(vec![4, 5]),
            Cycle::new(vec![2, 0, 1]),
        ]);
        let b = Permutation::new(vec![
            Cycle::new(vec![0, 1, 2]),
            Cycle::new(vec![5, 4]),
        ]);

        assert_eq!(a, b);
        assert_ne!(a, Permutation::empty());
    }
}
