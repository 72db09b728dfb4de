//! # Imputation Module.
//!
//! Fills skipped reports with the current best guess for their decision.

use crate::{
	error::ConsensusError,
	matrix::{Matrix, ReportMatrix},
	resolver::resolve_outcomes,
	scale::ScaleSpec,
};

/// Bins a continuous estimate of a binary decision into {0, 0.5, 1}.
///
/// Values below `0.5 - tolerance / 2` are false, values above
/// `0.5 + tolerance / 2` are true, and everything in the band between is
/// ambiguous.
pub fn catch(value: f64, tolerance: f64) -> f64 {
	if value < 0.5 - tolerance / 2.0 {
		0.0
	} else if value > 0.5 + tolerance / 2.0 {
		1.0
	} else {
		0.5
	}
}

/// Result of the imputation step.
#[derive(Debug, Clone, PartialEq)]
pub struct Imputation {
	/// The report matrix with every gap filled.
	pub filled: Matrix,
	/// Preliminary per-decision outcomes, present only if a gap was filled.
	pub preliminary: Option<Vec<f64>>,
}

/// Fills every missing report with its decision's preliminary outcome.
///
/// The preliminary outcome is resolved from the reports that are present,
/// weighted by `reputation`. Imputed values of binary decisions are binned
/// with [`catch`] so that a guess cannot pass as a more informative vote than
/// the ones it was derived from; scaled decisions keep the continuous value.
/// Present reports are never binned: a binary report outside {0, 0.5, 1},
/// such as 0.3, is kept as given. A matrix without gaps is returned unchanged.
pub fn fill_missing(
	reports: &ReportMatrix, reputation: &[f64], scales: &[ScaleSpec], tolerance: f64,
) -> Result<Imputation, ConsensusError> {
	if !reports.has_missing() {
		return Ok(Imputation { filled: reports.to_dense()?, preliminary: None });
	}

	let outcomes = resolve_outcomes(reports, reputation, scales)?;
	let filled = reports.fill(|decision| {
		let guess = outcomes[decision];
		if scales[decision].scaled {
			guess
		} else {
			catch(guess, tolerance)
		}
	});

	Ok(Imputation { filled, preliminary: Some(outcomes) })
}
