//! # Weights Module.
//!
//! Renormalization of reputation and bonus weighting vectors.

use crate::error::ConsensusError;

/// Rescales `weights` so that their magnitudes sum to 1.
///
/// Each entry becomes `|w_i| / Σ|w_j|`. For nonnegative input this is the
/// plain `w / sum(w)`; a nonpositive vector is normalized by magnitude, which
/// is how the sign candidates of the reputation update are weighted.
pub fn normalize(weights: &[f64]) -> Result<Vec<f64>, ConsensusError> {
	if let Some(pos) = weights.iter().position(|w| !w.is_finite()) {
		return Err(ConsensusError::InvalidInput(format!(
			"Weight at position {} is not finite.",
			pos
		)));
	}

	let total: f64 = weights.iter().map(|w| w.abs()).sum();
	if total == 0.0 {
		return Err(ConsensusError::DegenerateWeights(format!(
			"Cannot normalize a zero-sum vector of {} weights.",
			weights.len()
		)));
	}

	Ok(weights.iter().map(|w| w.abs() / total).collect())
}

/// One reporter, one vote.
pub fn uniform(len: usize) -> Vec<f64> {
	vec![1.0 / len as f64; len]
}

/// Arithmetic mean, zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
	if values.is_empty() {
		return 0.0;
	}
	values.iter().sum::<f64>() / values.len() as f64
}

/// Checks a caller-supplied reputation vector and normalizes it.
pub fn validate_reputation(reputation: &[f64], reporters: usize) -> Result<Vec<f64>, ConsensusError> {
	if reputation.len() != reporters {
		return Err(ConsensusError::InvalidInput(format!(
			"Reputation has {} entries but the report matrix has {} reporters.",
			reputation.len(),
			reporters
		)));
	}

	if let Some(pos) = reputation.iter().position(|r| !r.is_finite() || *r < 0.0) {
		return Err(ConsensusError::InvalidInput(format!(
			"Reputation of reporter {} must be a finite nonnegative number.",
			pos
		)));
	}

	normalize(reputation)
}
