use thiserror::Error;

/// Every failure the synthesis core can surface to a caller.
///
/// `InternalInvariantViolation` indicates a bug in the synthesizer rather
/// than in the input; it is reported instead of being silently recovered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("truth table of size {size} is not a permutation")]
    NotAPermutation { size: usize },
    #[error("cannot complete a permutation over {table_size} points to even parity")]
    CannotCompleteToEven { table_size: usize },
    #[error("internal invariant violation: {0}")]
    InternalInvariantViolation(&'static str),
    #[error("the enabled synthesis passes left a non-identity residual")]
    IncompleteSynthesis,
}
