//! Reversible-circuit synthesis: turn a bijective truth table into an
//! ordered sequence of generalized Toffoli gates realizing it.
//!
//! Two synthesizers cooperate behind [`synthesize`]: [`rm::RmGenerator`]
//! drives the table's Reed-Muller spectrum to canonical form, and
//! [`gt::GtGenerator`] peels transpositions and Boolean edges off the
//! table's cycle decomposition. Options select either one or a hybrid of
//! both.

pub mod edges;
pub mod gt;
pub mod options;
pub mod partial;
pub mod rm;
pub mod spectra;

use log::{debug, info};

use synth_core::{
    Scheme, SynthesisError,
    bits::Word,
    truth_table::{check_is_permutation, is_identity},
};

pub use options::SynthesisOptions;

use crate::{gt::GtGenerator, rm::RmGenerator};

/// Synthesize a scheme whose application to the identity table yields
/// `table`.
///
/// With the Reed-Muller pre-pass enabled its gates account for whatever
/// part of the table it canonicalized, and the group-theoretic pass picks
/// up the residual; the returned scheme is the composition of both.
///
/// # Errors
///
/// - [`SynthesisError::NotAPermutation`] when the table is not a
///   bijection on a power-of-two domain;
/// - [`SynthesisError::CannotCompleteToEven`] when parity correction is
///   requested but impossible;
/// - [`SynthesisError::IncompleteSynthesis`] when the enabled passes
///   cannot finish the job (e.g. Reed-Muller only with a weight bound);
/// - [`SynthesisError::InternalInvariantViolation`] for core bugs.
pub fn synthesize(table: &[Word], options: &SynthesisOptions) -> Result<Scheme, SynthesisError> {
    check_is_permutation(table)?;

    let mut working = table.to_vec();

    let rm_scheme = if options.use_rm_generator {
        let scheme = RmGenerator::new(options.rm_max_weight).generate(&mut working)?;
        debug!("spectrum pass emitted {} gates", scheme.len());
        scheme
    } else {
        Scheme::new()
    };

    let gt_scheme = if options.use_gt_generator && !is_identity(&working) {
        let scheme = GtGenerator::new(options).generate(&working)?;
        debug!("group-theoretic pass emitted {} gates", scheme.len());
        scheme
    } else {
        Scheme::new()
    };

    if !options.use_gt_generator && !is_identity(&working) {
        return Err(SynthesisError::IncompleteSynthesis);
    }

    // The group-theoretic gates realize the residual table; the spectrum
    // gates then map the residual's outputs onto the original table, so
    // they come second.
    let mut scheme = gt_scheme;
    scheme.append(rm_scheme);

    info!("synthesized {} gates for a table of size {}", scheme.len(), table.len());
    Ok(scheme)
}
