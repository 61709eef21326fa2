use std::collections::VecDeque;

use log::{debug, trace};

use synth_core::{
    Permutation, ReverseElement, Scheme, SynthesisError,
    bits::Word,
    create_permutation,
    truth_table::{check_is_permutation, variable_count},
};

use crate::{options::SynthesisOptions, partial::PartialGtGenerator};

/// The group-theoretic synthesizer.
///
/// Decomposes the table's permutation into cycles and repeatedly peels
/// off a partial result (a transposition or a Boolean edge), choosing
/// between the left- and right-multiplication residual at every step,
/// until nothing remains.
pub struct GtGenerator {
    options: SynthesisOptions,
}

impl GtGenerator {
    #[must_use]
    pub fn new(options: &SynthesisOptions) -> Self {
        GtGenerator { options: *options }
    }

    /// Synthesize a scheme realizing `table`.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::NotAPermutation`] for a non-bijective
    /// table, [`SynthesisError::CannotCompleteToEven`] when parity
    /// correction is requested but impossible, and
    /// [`SynthesisError::InternalInvariantViolation`] for core bugs.
    pub fn generate(&self, table: &[Word]) -> Result<Scheme, SynthesisError> {
        check_is_permutation(table)?;

        let mut permutation = create_permutation(table)?;
        if self.options.complete_permutation_to_even {
            permutation.complete_to_even(table.len())?;
        }

        // The gate blocks conjugate through every bit of the domain, so
        // the width comes from the table size rather than from the
        // largest moved point.
        let n = variable_count(table);

        let mut scheme = Scheme::new();
        if permutation.is_empty() {
            return Ok(scheme);
        }

        debug!(
            "reducing a permutation with {} non-fixed points over {n} variables",
            permutation.element_count()
        );

        let mut cursor = 0;
        let mut generator = self.prepared(permutation, n)?;

        loop {
            trace!("current permutation: {}", generator.permutation());

            match self.reduce(&mut scheme, &mut cursor, &generator, n)? {
                Some(next) => generator = next,
                None => break,
            }
        }

        debug!("reduction finished with {} gates", scheme.len());
        Ok(scheme)
    }

    /// Implement one partial result and hand back the generator for the
    /// chosen residual, or `None` when the permutation is exhausted.
    fn reduce(
        &self,
        scheme: &mut Scheme,
        cursor: &mut usize,
        generator: &PartialGtGenerator,
        n: u32,
    ) -> Result<Option<PartialGtGenerator>, SynthesisError> {
        let block = generator.implement_partial_result()?;

        if generator.left_and_right_differ() {
            let left = self.prepared(generator.residual_permutation(true), n)?;
            let right = self.prepared(generator.residual_permutation(false), n)?;

            let mut left_is_better = left
                .partial_result_params()
                .is_better_than(&right.partial_result_params());

            if self.options.prefer_right_residual {
                left_is_better = false;
            }

            trace!(
                "left residual {} vs right residual {}: taking {}",
                left.permutation(),
                right.permutation(),
                if left_is_better { "left" } else { "right" }
            );

            insert_block(scheme, cursor, block, left_is_better)?;
            Ok(Some(if left_is_better { left } else { right }))
        } else {
            insert_block(scheme, cursor, block, true)?;

            let residual = generator.residual_permutation(true);
            if residual.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.prepared(residual, n)?))
            }
        }
    }

    fn prepared(
        &self,
        permutation: Permutation,
        n: u32,
    ) -> Result<PartialGtGenerator, SynthesisError> {
        let mut generator = PartialGtGenerator::new(permutation, n, &self.options);
        generator.prepare_for_generation()?;
        Ok(generator)
    }
}

/// Splice a gate block into the scheme at the moving cursor. Under left
/// multiplication the cursor advances past the block so that later steps
/// land after it; under right multiplication it stays put so that they
/// land before it.
fn insert_block(
    scheme: &mut Scheme,
    cursor: &mut usize,
    block: VecDeque<ReverseElement>,
    advance: bool,
) -> Result<(), SynthesisError> {
    if block.is_empty() {
        return Err(SynthesisError::InternalInvariantViolation(
            "a reduction step produced no gates",
        ));
    }

    let block_len = block.len();
    scheme.insert_all(*cursor, block);
    if advance {
        *cursor += block_len;
    }

    Ok(())
}
