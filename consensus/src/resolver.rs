//! # Resolver Module.
//!
//! Aggregates a decision column into a single outcome, using only the
//! reporters who answered it.

use crate::{
	error::ConsensusError,
	matrix::{Report, ReportMatrix},
	scale::ScaleSpec,
	weights::normalize,
};

/// Reputation-weighted median.
///
/// Values are visited in ascending order (equal values keep their reporter
/// order) while their weights accumulate. The first value at which the
/// accumulated mass reaches half of the total is the median, so when the mass
/// lands exactly on the boundary between two values the lower one is taken.
pub fn weighted_median(values: &[f64], weights: &[f64]) -> Result<f64, ConsensusError> {
	if values.len() != weights.len() {
		return Err(ConsensusError::InvalidInput(format!(
			"Weighted median of {} values with {} weights.",
			values.len(),
			weights.len()
		)));
	}

	let weights = normalize(weights)?;
	let mut pairs: Vec<(f64, f64)> = values.iter().copied().zip(weights).collect();
	pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

	let half = 0.5 * pairs.iter().map(|(_, w)| w).sum::<f64>();
	let mut mass = 0.0;
	for (value, weight) in &pairs {
		mass += weight;
		if mass >= half {
			return Ok(*value);
		}
	}

	pairs.last().map(|(value, _)| *value).ok_or_else(|| {
		ConsensusError::InsufficientData("Weighted median of an empty column.".to_string())
	})
}

/// Reputation-weighted mean.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Result<f64, ConsensusError> {
	let weights = normalize(weights)?;
	Ok(values.iter().zip(weights).map(|(x, w)| x * w).sum())
}

/// Resolves one decision from the reporters who answered it.
///
/// Their reputations are renormalized among themselves; binary decisions take
/// the weighted mean, scaled decisions the weighted median.
pub fn resolve_decision(
	reports: &ReportMatrix, decision: usize, reputation: &[f64], scale: &ScaleSpec,
) -> Result<f64, ConsensusError> {
	let (values, weights): (Vec<f64>, Vec<f64>) = reports
		.column(decision)
		.zip(reputation)
		.filter_map(|(report, rep)| match report {
			Report::Present(value) => Some((value, *rep)),
			Report::Missing => None,
		})
		.unzip();

	if values.is_empty() {
		return Err(ConsensusError::InsufficientData(format!(
			"Decision {} has no respondents.",
			decision
		)));
	}

	if scale.scaled {
		weighted_median(&values, &weights)
	} else {
		weighted_mean(&values, &weights)
	}
}

/// Resolves every decision of the matrix.
pub fn resolve_outcomes(
	reports: &ReportMatrix, reputation: &[f64], scales: &[ScaleSpec],
) -> Result<Vec<f64>, ConsensusError> {
	(0..reports.num_decisions())
		.map(|decision| resolve_decision(reports, decision, reputation, &scales[decision]))
		.collect()
}
