use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;

use synth_core::{
    Transposition,
    bits::{Word, bits_of, count_nonzero_bits, full_mask, significant_bit_count},
};

/// A subcube of the n-cube: the words agreeing with `base_value` on every
/// bit outside `stars_mask`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BooleanEdge {
    n: u32,
    base_value: Word,
    stars_mask: Word,
    covered_transposition_count: usize,
}

impl BooleanEdge {
    /// # Panics
    ///
    /// Panics if `base_value` overlaps `stars_mask`.
    #[must_use]
    pub fn new(n: u32, base_value: Word, stars_mask: Word) -> Self {
        assert_eq!(base_value & stars_mask, 0);

        BooleanEdge {
            n,
            base_value,
            stars_mask,
            covered_transposition_count: 0,
        }
    }

    #[must_use]
    pub fn base_value(&self) -> Word {
        self.base_value
    }

    #[must_use]
    pub fn stars_mask(&self) -> Word {
        self.stars_mask
    }

    /// The bits pinned by the subcube.
    #[must_use]
    pub fn base_mask(&self) -> Word {
        full_mask(self.n) & !self.stars_mask
    }

    /// How many transpositions of the search input lie entirely inside
    /// the subcube. Zero unless produced by [`BooleanEdgeSearcher`].
    #[must_use]
    pub fn covered_transposition_count(&self) -> usize {
        self.covered_transposition_count
    }

    /// The number of words in the subcube.
    #[must_use]
    pub fn capacity(&self) -> usize {
        1 << count_nonzero_bits(self.stars_mask)
    }

    /// Whether the subcube is the whole n-cube, `**...*`.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.stars_mask == full_mask(self.n)
    }

    #[must_use]
    pub fn contains(&self, value: Word) -> bool {
        value & self.base_mask() == self.base_value
    }

    /// Enumerate the subcube's words, smallest first.
    pub fn words(&self) -> impl Iterator<Item = Word> {
        let base = self.base_value;
        let stars = self.stars_mask;
        let mut subset = 0;
        let mut exhausted = false;

        std::iter::from_fn(move || {
            if exhausted {
                return None;
            }

            let word = base | subset;
            // Standard subset enumeration of the star bits.
            subset = subset.wrapping_sub(stars) & stars;
            exhausted = subset == 0;
            Some(word)
        })
    }
}

/// Searches a set of words for a maximal covering subcube.
pub struct BooleanEdgeSearcher {
    input: Vec<Word>,
    input_set: FxHashSet<Word>,
    transpositions: Vec<Transposition>,
    n: u32,
    initial_mask: Word,
    explicit_edge: bool,
    coverage_threshold: f64,
}

impl BooleanEdgeSearcher {
    /// Search over the endpoints of a transposition set. `initial_mask`
    /// restricts which bits may become stars.
    #[must_use]
    pub fn from_transpositions(
        transpositions: &[Transposition],
        n: u32,
        initial_mask: Word,
    ) -> Self {
        let words = transpositions
            .iter()
            .flat_map(|transposition| [transposition.smaller(), transposition.larger()]);

        let mut searcher = Self::from_words(words, n);
        searcher.initial_mask = initial_mask & full_mask(n);
        searcher.transpositions = transpositions.to_vec();
        searcher
    }

    /// Search over a plain word set; every bit may become a star.
    #[must_use]
    pub fn from_words(words: impl IntoIterator<Item = Word>, n: u32) -> Self {
        let input_set: FxHashSet<Word> = words.into_iter().collect();
        let input = input_set.iter().copied().sorted_unstable().collect();

        BooleanEdgeSearcher {
            input,
            input_set,
            transpositions: Vec::new(),
            n,
            initial_mask: full_mask(n),
            explicit_edge: false,
            coverage_threshold: 0.5,
        }
    }

    /// Require every word of the found subcube to be present in the input.
    pub fn set_explicit_edge(&mut self, explicit_edge: bool) {
        self.explicit_edge = explicit_edge;
    }

    /// Minimum covered fraction of the input for non-explicit search.
    pub fn set_coverage_threshold(&mut self, threshold: f64) {
        self.coverage_threshold = threshold;
    }

    /// Find a maximal subcube covering the input, or `None` when no
    /// subcube of dimension at least one covers enough of it.
    ///
    /// Dimensions are tried from the largest feasible downward, so a
    /// returned edge always has the largest possible `stars_mask`; within
    /// a dimension the best word coverage wins, and remaining ties go to
    /// the candidate covering more whole transpositions. A full edge
    /// aborts the search early.
    #[must_use]
    pub fn find_edge(&self) -> Option<BooleanEdge> {
        let input_len = self.input.len();
        if input_len < 2 {
            return None;
        }

        let max_dimension = significant_bit_count(input_len as Word) - 1;

        // A bit can only be a star if the input sees it in both states.
        let candidate_bits: Vec<Word> = bits_of(self.initial_mask)
            .filter(|&bit| {
                let frequency = self.input.iter().filter(|&&word| word & bit != 0).count();
                frequency > 0 && frequency < input_len
            })
            .collect();

        for dimension in (1..=max_dimension.min(candidate_bits.len() as u32)).rev() {
            let mut best: Option<(BooleanEdge, (usize, usize))> = None;

            for stars in candidate_bits
                .iter()
                .copied()
                .combinations(dimension as usize)
            {
                let stars_mask = stars.iter().fold(0, |mask, bit| mask | bit);
                let Some((edge, coverage)) = self.check_edge(stars_mask) else {
                    continue;
                };

                let edge = self.with_covered_count(edge);
                if edge.is_full() {
                    return Some(edge);
                }

                let rank = (coverage, edge.covered_transposition_count());
                if best.as_ref().is_none_or(|(_, best_rank)| rank > *best_rank) {
                    best = Some((edge, rank));
                }
            }

            if let Some((edge, _)) = best {
                return Some(edge);
            }
        }

        None
    }

    /// The transpositions whose endpoints both lie inside `edge`.
    #[must_use]
    pub fn filter_transpositions_by_edge(
        edge: &BooleanEdge,
        transpositions: &[Transposition],
    ) -> Vec<Transposition> {
        transpositions
            .iter()
            .copied()
            .filter(|transposition| {
                edge.contains(transposition.smaller()) && edge.contains(transposition.larger())
            })
            .collect()
    }

    /// Evaluate one candidate star set: pick the best base value and
    /// check the coverage policy.
    fn check_edge(&self, stars_mask: Word) -> Option<(BooleanEdge, usize)> {
        let base_mask = full_mask(self.n) & !stars_mask;

        let mut residues: FxHashMap<Word, usize> = FxHashMap::default();
        for &word in &self.input {
            *residues.entry(word & base_mask).or_insert(0) += 1;
        }

        // Most frequent residue wins, ties to the smallest value.
        let (base_value, coverage) = residues
            .into_iter()
            .min_by_key(|&(residue, count)| (std::cmp::Reverse(count), residue))?;

        let capacity = 1usize << count_nonzero_bits(stars_mask);
        let enough = if self.explicit_edge {
            coverage == capacity
        } else {
            coverage as f64 >= self.coverage_threshold * self.input.len() as f64
        };

        enough.then(|| (BooleanEdge::new(self.n, base_value, stars_mask), coverage))
    }

    fn with_covered_count(&self, mut edge: BooleanEdge) -> BooleanEdge {
        edge.covered_transposition_count = if self.transpositions.is_empty() {
            // Raw word input: count the pairs of input words inside the
            // subcube.
            edge.words()
                .filter(|word| self.input_set.contains(word))
                .count()
                / 2
        } else {
            Self::filter_transpositions_by_edge(&edge, &self.transpositions).len()
        };

        edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transpositions(pairs: &[(Word, Word)]) -> Vec<Transposition> {
        pairs
            .iter()
            .map(|&(x, y)| Transposition::new(x, y))
            .collect()
    }

    #[test]
    fn subcube_membership_and_enumeration() {
        let edge = BooleanEdge::new(3, 0b100, 0b011);

        assert_eq!(edge.capacity(), 4);
        assert!(!edge.is_full());
        assert!(edge.contains(4) && edge.contains(5) && edge.contains(6) && edge.contains(7));
        assert!(!edge.contains(0));
        assert_eq!(edge.words().collect::<Vec<_>>(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn finds_the_disjoint_swap_cube() {
        let input = transpositions(&[(4, 5), (6, 7)]);
        let searcher = BooleanEdgeSearcher::from_transpositions(&input, 3, full_mask(3));

        let edge = searcher.find_edge().unwrap();
        assert_eq!(edge.base_value(), 4);
        assert_eq!(edge.stars_mask(), 0b011);
        assert_eq!(edge.covered_transposition_count(), 2);
        assert!(edge.stars_mask() & 1 != 0);
    }

    #[test]
    fn full_edge_short_circuits() {
        let searcher = BooleanEdgeSearcher::from_words(0..8, 3);
        let edge = searcher.find_edge().unwrap();

        assert!(edge.is_full());
        assert_eq!(edge.base_value(), 0);
    }

    #[test]
    fn explicit_mode_requires_complete_cubes() {
        // Three of the four words of the (0, stars=0b011) square, plus a
        // stray word.
        let words = [0b000, 0b001, 0b010, 0b101];

        let lenient = BooleanEdgeSearcher::from_words(words, 3);
        let edge = lenient.find_edge().unwrap();
        // Partial coverage admits the square with 3 of its 4 words.
        assert_eq!(edge.capacity(), 4);
        assert_eq!(edge.words().filter(|w| words.contains(w)).count(), 3);

        let mut strict = BooleanEdgeSearcher::from_words(words, 3);
        strict.set_explicit_edge(true);
        let edge = strict.find_edge().unwrap();
        // Only a 1-dimensional cube is completely present.
        assert_eq!(edge.capacity(), 2);
        assert!(edge.words().all(|w| words.contains(&w)));
    }

    #[test]
    fn no_edge_on_tiny_or_spread_input() {
        let searcher = BooleanEdgeSearcher::from_words([5], 3);
        assert_eq!(searcher.find_edge(), None);

        // No 1-dimensional cube covers all of a spread-out input.
        let mut strict = BooleanEdgeSearcher::from_words([0b000, 0b011, 0b101], 3);
        strict.set_coverage_threshold(1.0);
        assert_eq!(strict.find_edge(), None);
    }

    #[test]
    fn coverage_ties_prefer_more_covered_transpositions() {
        // Two candidate squares cover four of the six words each; only
        // one of them keeps two transpositions whole.
        let input = transpositions(&[(0, 4), (2, 6), (1, 3)]);
        let searcher = BooleanEdgeSearcher::from_transpositions(&input, 3, full_mask(3));

        let edge = searcher.find_edge().unwrap();
        assert_eq!(edge.stars_mask(), 0b110);
        assert_eq!(edge.base_value(), 0);
        assert_eq!(edge.covered_transposition_count(), 2);
    }

    #[test]
    fn initial_mask_restricts_star_bits() {
        let input = transpositions(&[(0, 1), (2, 3)]);
        let searcher = BooleanEdgeSearcher::from_transpositions(&input, 2, 0b01);

        let edge = searcher.find_edge().unwrap();
        assert_eq!(edge.stars_mask(), 0b01);
        assert_eq!(edge.covered_transposition_count(), 1);
    }

    #[test]
    fn transposition_filtering() {
        let edge = BooleanEdge::new(3, 0b100, 0b011);
        let input = transpositions(&[(4, 5), (6, 7), (0, 4), (1, 3)]);

        let covered = BooleanEdgeSearcher::filter_transpositions_by_edge(&edge, &input);
        assert_eq!(covered, transpositions(&[(4, 5), (6, 7)]));
    }
}
