//! The shared algebra of reversible-circuit synthesis: words and masks,
//! generalized Toffoli gates, gate schemes, and permutations given as
//! disjoint cycles.

pub mod bits;
pub mod cycle;
pub mod element;
pub mod error;
pub mod permutation;
pub mod scheme;
pub mod truth_table;

pub use bits::Word;
pub use cycle::{Cycle, Transposition};
pub use element::ReverseElement;
pub use error::SynthesisError;
pub use permutation::{Permutation, create_permutation};
pub use scheme::Scheme;
pub use truth_table::TruthTable;
