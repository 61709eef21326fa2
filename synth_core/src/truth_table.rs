use crate::{
    bits::{Word, significant_bit_count},
    error::SynthesisError,
};

/// A truth table: the output word for every input word `0..2^n`, in input
/// order. For synthesis the table must be a bijection.
pub type TruthTable = Vec<Word>;

/// The identity table over `n` variables.
#[must_use]
pub fn identity_table(n: u32) -> TruthTable {
    (0..1 << n).collect()
}

#[must_use]
pub fn is_identity(table: &[Word]) -> bool {
    table
        .iter()
        .enumerate()
        .all(|(x, &y)| x as Word == y)
}

/// The number of variables `n` of a table of size `2^n`.
///
/// # Panics
///
/// Panics if the table size is not a power of two; callers validate with
/// [`check_is_permutation`] first.
#[must_use]
pub fn variable_count(table: &[Word]) -> u32 {
    assert!(table.len().is_power_of_two());

    significant_bit_count(table.len() as Word) - 1
}

/// Verify the table is a permutation: a power-of-two number of rows, every
/// output in range, and no output repeated.
///
/// # Errors
///
/// Returns [`SynthesisError::NotAPermutation`] otherwise.
pub fn check_is_permutation(table: &[Word]) -> Result<(), SynthesisError> {
    let size = table.len();
    let not_a_permutation = SynthesisError::NotAPermutation { size };

    if !size.is_power_of_two() {
        return Err(not_a_permutation);
    }

    let mut seen = vec![false; size];
    for &y in table {
        let Some(slot) = seen.get_mut(y as usize) else {
            return Err(not_a_permutation);
        };

        if *slot {
            return Err(not_a_permutation);
        }
        *slot = true;
    }

    Ok(())
}
