use std::collections::VecDeque;

use log::debug;

use synth_core::{
    ReverseElement, Scheme, SynthesisError,
    bits::{Word, bits_of, count_nonzero_bits, highest_set_bit},
    truth_table::variable_count,
};

use crate::spectra::RmSpectrum;

/// The Reed-Muller spectrum synthesizer.
///
/// Walks the spectrum of the working table row by row and emits gates
/// that drive every row to its canonical value, which drives the table
/// itself to the identity. Gates are prepended as they are discovered, so
/// the finished scheme applied to the identity table reproduces the
/// original table.
pub struct RmGenerator {
    max_weight: Option<u32>,
}

impl RmGenerator {
    #[must_use]
    pub fn new(max_weight: Option<u32>) -> Self {
        RmGenerator { max_weight }
    }

    /// Synthesize gates for `table`, mutating it toward the identity.
    ///
    /// Rows heavier than `max_weight` are skipped and remain in `table`
    /// as a residual for a later pass.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::InternalInvariantViolation`] when a row
    /// offers no usable control bit; this indicates a bug, not bad input.
    pub fn generate(&self, table: &mut [Word]) -> Result<Scheme, SynthesisError> {
        let n = variable_count(table);
        let size = table.len();

        let mut scheme = Scheme::new();
        let mut spectrum = RmSpectrum::compute(table);

        // Zero out row 0 with plain NOT gates.
        let row = spectrum.row(0);
        for bit in bits_of(row) {
            let gate = ReverseElement::new(n, bit)?;
            scheme.push_front(gate);
            gate.apply_to_table(table);
        }

        if row != 0 {
            spectrum = RmSpectrum::compute(table);
        }

        for index in 0..size {
            let row = spectrum.row(index);
            if spectrum.is_row_ident(index) {
                continue;
            }

            let too_heavy = self
                .max_weight
                .is_some_and(|max_weight| count_nonzero_bits(row) > max_weight);
            if too_heavy {
                debug!(
                    "skipping spectrum row {index} with weight {}",
                    count_nonzero_bits(row)
                );
                continue;
            }

            if RmSpectrum::is_variable_row(index) {
                process_variable_row(table, n, index, row, &mut scheme)?;
            } else {
                process_dependent_row(table, n, index, row, &spectrum, &mut scheme)?;
            }

            spectrum = RmSpectrum::compute(table);
        }

        Ok(scheme)
    }
}

fn process_variable_row(
    table: &mut [Word],
    n: u32,
    index: usize,
    row: Word,
    scheme: &mut Scheme,
) -> Result<(), SynthesisError> {
    let index_mask = index as Word;

    if row & index_mask == 0 {
        // The row lost its own variable; borrow the highest bit that is
        // present to reintroduce it.
        let control = highest_set_bit(row);
        if control == 0 || control == index_mask {
            return Err(SynthesisError::InternalInvariantViolation(
                "no control bit available for a variable spectrum row",
            ));
        }

        let gate = ReverseElement::with_control(n, index_mask, control)?;
        scheme.push_front(gate);
        gate.apply_to_table(table);
    }

    for target in bits_of(row) {
        if target != index_mask {
            let gate = ReverseElement::with_control(n, target, index_mask)?;
            scheme.push_front(gate);
            gate.apply_to_table(table);
        }
    }

    Ok(())
}

fn process_dependent_row(
    table: &mut [Word],
    n: u32,
    index: usize,
    row: Word,
    spectrum: &RmSpectrum,
    scheme: &mut Scheme,
) -> Result<(), SynthesisError> {
    let index_mask = index as Word;

    // The control must be present in the row but absent from the row
    // index, scanning from the most significant side.
    let control = highest_set_bit(row & !index_mask);
    if control == 0 {
        return Err(SynthesisError::InternalInvariantViolation(
            "no control bit available for a dependent spectrum row",
        ));
    }

    let mut buffered = VecDeque::new();
    for target in bits_of(row) {
        if target != control {
            let gate = ReverseElement::with_control(n, target, control)?;
            buffered.push_front(gate);

            scheme.push_front(gate);
            gate.apply_to_table(table);
        }
    }

    let gate = ReverseElement::with_control(n, control, index_mask)?;
    scheme.push_front(gate);
    gate.apply_to_table(table);

    // Flipping the control may have disturbed rows that were already
    // canonical; the pre-step spectrum snapshot decides whether the
    // buffered gates must run again.
    let need_apply =
        (0..spectrum.len()).any(|other| other != index && spectrum.row(other) & control != 0);

    if need_apply {
        for gate in &buffered {
            scheme.push_front(*gate);
            gate.apply_to_table(table);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use synth_core::truth_table::{identity_table, is_identity};

    use super::*;

    fn synthesize_rm(table: &[Word]) -> (Scheme, Vec<Word>) {
        let mut working = table.to_vec();
        let scheme = RmGenerator::new(None).generate(&mut working).unwrap();
        (scheme, working)
    }

    fn check_realizes(table: &[Word]) {
        let (scheme, residual) = synthesize_rm(table);
        assert!(is_identity(&residual));

        let mut rebuilt = identity_table(variable_count(table));
        scheme.apply_to_table(&mut rebuilt);
        assert_eq!(rebuilt, table);
    }

    #[test]
    fn identity_needs_no_gates() {
        let (scheme, residual) = synthesize_rm(&identity_table(3));
        assert!(scheme.is_empty());
        assert!(is_identity(&residual));
    }

    #[test]
    fn single_not() {
        let (scheme, _) = synthesize_rm(&[1, 0]);
        assert_eq!(scheme.len(), 1);

        let gate = *scheme.iter().next().unwrap();
        assert_eq!(gate.target_mask(), 1);
        assert_eq!(gate.control_mask(), 0);
    }

    #[test]
    fn realizes_small_tables() {
        check_realizes(&[0, 1, 3, 2]);
        check_realizes(&[1, 2, 3, 0]);
        check_realizes(&[0, 2, 1, 3]);
        check_realizes(&[3, 2, 1, 0]);
    }

    #[test]
    fn realizes_three_variable_tables() {
        check_realizes(&[0, 1, 2, 3, 4, 5, 7, 6]);
        check_realizes(&[7, 0, 1, 2, 3, 4, 5, 6]);
        check_realizes(&[1, 3, 5, 7, 0, 2, 4, 6]);
        check_realizes(&[5, 1, 4, 3, 6, 2, 0, 7]);
    }

    #[test]
    fn max_weight_gates_account_for_the_residual() {
        let table = vec![5, 1, 4, 3, 6, 2, 0, 7];
        let mut working = table.clone();
        let scheme = RmGenerator::new(Some(1)).generate(&mut working).unwrap();

        // Whatever progress was made, applying the emitted gates to the
        // residual rows must land back on the original table.
        let mut rebuilt = working.clone();
        scheme.apply_to_table(&mut rebuilt);
        assert_eq!(rebuilt, table);
    }
}
