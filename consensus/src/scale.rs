//! # Scale Module.
//!
//! Maps scaled decisions between their raw domain and the unit interval the
//! consensus pipeline operates on.

use crate::{error::ConsensusError, matrix::ReportMatrix};
use serde::{Deserialize, Serialize};

/// Outcome domain of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleSpec {
	/// `true` for a scaled (continuous) decision, `false` for a binary one.
	pub scaled: bool,
	/// Lower bound of the raw domain.
	pub min: f64,
	/// Upper bound of the raw domain.
	pub max: f64,
}

impl ScaleSpec {
	/// A binary decision over `[0, 1]`.
	pub fn binary() -> Self {
		Self { scaled: false, min: 0.0, max: 1.0 }
	}

	/// A scaled decision over `[min, max]`.
	pub fn scaled(min: f64, max: f64) -> Self {
		Self { scaled: true, min, max }
	}

	/// Checks that a scaled range is well formed.
	pub fn validate(&self) -> Result<(), ConsensusError> {
		if self.scaled && !(self.min.is_finite() && self.max.is_finite() && self.min < self.max) {
			return Err(ConsensusError::InvalidInput(format!(
				"Scaled decision needs min < max, got [{}, {}].",
				self.min, self.max
			)));
		}
		Ok(())
	}

	/// Raw report to its unit-interval representation.
	///
	/// Reports outside `[min, max]` are clamped to the nearest bound.
	pub fn normalize(&self, raw: f64) -> f64 {
		if self.scaled {
			((raw - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
		} else {
			raw
		}
	}

	/// Unit-interval value back to the raw domain.
	pub fn denormalize(&self, value: f64) -> f64 {
		if self.scaled {
			value * (self.max - self.min) + self.min
		} else {
			value
		}
	}
}

impl Default for ScaleSpec {
	fn default() -> Self {
		Self::binary()
	}
}

/// Resolves the per-decision scales of a round.
///
/// Without explicit scales every decision is binary.
pub fn resolve_scales(
	scales: Option<Vec<ScaleSpec>>, decisions: usize,
) -> Result<Vec<ScaleSpec>, ConsensusError> {
	let scales = scales.unwrap_or_else(|| vec![ScaleSpec::binary(); decisions]);

	if scales.len() != decisions {
		return Err(ConsensusError::InvalidInput(format!(
			"Got {} scales for {} decisions.",
			scales.len(),
			decisions
		)));
	}

	for scale in &scales {
		scale.validate()?;
	}

	Ok(scales)
}

/// Normalizes every present report of a scaled decision.
pub fn rescale(reports: &ReportMatrix, scales: &[ScaleSpec]) -> ReportMatrix {
	reports.map_present(|decision, raw| scales[decision].normalize(raw))
}
