/// Tuning options for one synthesis call.
///
/// The record is read-only: build it once, pass it by reference. There is
/// no process-wide options singleton.
#[derive(Clone, Copy, Debug)]
pub struct SynthesisOptions {
    /// Run the Reed-Muller spectrum synthesizer as a pre-pass.
    pub use_rm_generator: bool,
    /// Run the group-theoretic synthesizer on whatever the pre-pass left.
    pub use_gt_generator: bool,
    /// Extend odd permutations to even parity during construction.
    pub complete_permutation_to_even: bool,
    /// Skip spectrum rows with more than this many set bits, leaving them
    /// for the group-theoretic pass.
    pub rm_max_weight: Option<u32>,
    /// Require every word of a candidate subcube to be present in the
    /// edge-search input.
    pub edge_explicit_mode: bool,
    /// Minimum fraction of the edge-search input a subcube must cover in
    /// non-explicit mode.
    pub edge_coverage_threshold: f64,
    /// Debug policy: always pick the right-multiplication residual when
    /// left and right differ. For determinism tests only.
    pub prefer_right_residual: bool,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        SynthesisOptions {
            use_rm_generator: false,
            use_gt_generator: true,
            complete_permutation_to_even: false,
            rm_max_weight: None,
            edge_explicit_mode: false,
            edge_coverage_threshold: 0.5,
            prefer_right_residual: false,
        }
    }
}

impl SynthesisOptions {
    /// Group-theoretic synthesis only.
    #[must_use]
    pub fn gt_only() -> Self {
        SynthesisOptions::default()
    }

    /// Reed-Muller synthesis only.
    #[must_use]
    pub fn rm_only() -> Self {
        SynthesisOptions {
            use_rm_generator: true,
            use_gt_generator: false,
            ..SynthesisOptions::default()
        }
    }

    /// Reed-Muller pre-pass with a group-theoretic pass on the residual.
    #[must_use]
    pub fn hybrid() -> Self {
        SynthesisOptions {
            use_rm_generator: true,
            use_gt_generator: true,
            ..SynthesisOptions::default()
        }
    }
}
