//! # Report Module.
//!
//! The outcome of a consensus round, and its flat CSV records.

use crate::matrix::{Matrix, ReportMatrix};
use serde::{Deserialize, Serialize};

/// Outcome of a round for a single reporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReporterOutcome {
	/// Normalized reputation the round started with.
	pub old_rep: f64,
	/// Reputation implied by this round alone.
	pub new_rep: f64,
	/// Reputation to carry into the next round.
	pub smoothed_rep: f64,
	/// Number of decisions skipped.
	pub missing: usize,
	/// Share of decisions answered.
	pub participation: f64,
	/// Normalized participation.
	pub relative_participation: f64,
	/// Reporter bonus.
	pub bonus: f64,
}

/// Outcome of a round for a single decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
	/// Whether the decision is scaled.
	pub scaled: bool,
	/// Loading on the first principal component.
	pub first_loading: f64,
	/// Outcome on the unit interval, before binning and rescaling.
	pub raw_outcome: f64,
	/// Binned (binary) or rescaled (scaled) outcome.
	pub final_outcome: f64,
	/// Distance from the ambiguous midpoint, in `[0, 1]`.
	pub certainty: f64,
	/// Normalized certainty.
	pub consensus_reward: f64,
	/// Reputation-weighted turnout.
	pub participation: f64,
	/// Number of imputed reports.
	pub missing: usize,
	/// Bonus paid to the decision's author.
	pub author_bonus: f64,
}

/// Full outcome of a consensus round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
	/// The report matrix as supplied.
	pub original: ReportMatrix,
	/// The normalized, imputed matrix the reputation update ran on.
	pub filled: Matrix,
	/// One entry per reporter, in row order.
	pub reporters: Vec<ReporterOutcome>,
	/// One entry per decision, in column order.
	pub decisions: Vec<DecisionOutcome>,
	/// `1 - PercentNA`.
	pub average_participation: f64,
	/// Mean certainty over all decisions.
	pub average_certainty: f64,
}

impl ConsensusResult {
	/// Smoothed reputation to feed into the next round.
	pub fn smoothed_reputation(&self) -> Vec<f64> {
		self.reporters.iter().map(|r| r.smoothed_rep).collect()
	}

	/// Final outcome of every decision.
	pub fn outcomes(&self) -> Vec<f64> {
		self.decisions.iter().map(|d| d.final_outcome).collect()
	}

	/// Returns a copy with every computed value rounded to `digits` decimal
	/// places, ties to even. The input reports are left untouched.
	pub fn rounded(&self, digits: u32) -> Self {
		let r = |x: f64| round_half_even(x, digits);

		let reporters = self
			.reporters
			.iter()
			.map(|o| ReporterOutcome {
				old_rep: r(o.old_rep),
				new_rep: r(o.new_rep),
				smoothed_rep: r(o.smoothed_rep),
				missing: o.missing,
				participation: r(o.participation),
				relative_participation: r(o.relative_participation),
				bonus: r(o.bonus),
			})
			.collect();

		let decisions = self
			.decisions
			.iter()
			.map(|o| DecisionOutcome {
				scaled: o.scaled,
				first_loading: r(o.first_loading),
				raw_outcome: r(o.raw_outcome),
				final_outcome: r(o.final_outcome),
				certainty: r(o.certainty),
				consensus_reward: r(o.consensus_reward),
				participation: r(o.participation),
				missing: o.missing,
				author_bonus: r(o.author_bonus),
			})
			.collect();

		let mut filled = self.filled.clone();
		for i in 0..filled.rows() {
			for j in 0..filled.cols() {
				filled.set(i, j, r(filled.get(i, j)));
			}
		}

		Self {
			original: self.original.clone(),
			filled,
			reporters,
			decisions,
			average_participation: r(self.average_participation),
			average_certainty: r(self.average_certainty),
		}
	}

	/// Flattens the per-reporter outcomes into CSV records.
	pub fn reporter_records(&self) -> Vec<ReporterRecord> {
		self.reporters
			.iter()
			.enumerate()
			.map(|(reporter, o)| ReporterRecord {
				reporter,
				old_rep: o.old_rep,
				new_rep: o.new_rep,
				smoothed_rep: o.smoothed_rep,
				missing: o.missing,
				participation: o.participation,
				bonus: o.bonus,
			})
			.collect()
	}

	/// Flattens the per-decision outcomes into CSV records.
	pub fn decision_records(&self) -> Vec<DecisionRecord> {
		self.decisions
			.iter()
			.enumerate()
			.map(|(decision, o)| DecisionRecord {
				decision,
				scaled: o.scaled,
				first_loading: o.first_loading,
				raw_outcome: o.raw_outcome,
				final_outcome: o.final_outcome,
				certainty: o.certainty,
				participation: o.participation,
				missing: o.missing,
				author_bonus: o.author_bonus,
			})
			.collect()
	}
}

/// Reporter row of the CSV output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReporterRecord {
	/// Row index of the reporter.
	pub reporter: usize,
	/// Starting reputation.
	pub old_rep: f64,
	/// Reputation of this round.
	pub new_rep: f64,
	/// Smoothed reputation.
	pub smoothed_rep: f64,
	/// Skipped decisions.
	pub missing: usize,
	/// Share of decisions answered.
	pub participation: f64,
	/// Reporter bonus.
	pub bonus: f64,
}

/// Decision row of the CSV output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
	/// Column index of the decision.
	pub decision: usize,
	/// Whether the decision is scaled.
	pub scaled: bool,
	/// First principal component loading.
	pub first_loading: f64,
	/// Raw outcome.
	pub raw_outcome: f64,
	/// Final outcome.
	pub final_outcome: f64,
	/// Certainty.
	pub certainty: f64,
	/// Reputation-weighted turnout.
	pub participation: f64,
	/// Imputed reports.
	pub missing: usize,
	/// Author bonus.
	pub author_bonus: f64,
}

/// Rounds `value` to `digits` decimal places, ties to even.
pub fn round_half_even(value: f64, digits: u32) -> f64 {
	if !value.is_finite() {
		return value;
	}

	let factor = 10f64.powf(f64::from(digits));
	let scaled = value * factor;
	let floor = scaled.floor();
	let diff = scaled - floor;

	let rounded = if diff > 0.5 {
		floor + 1.0
	} else if diff < 0.5 {
		floor
	} else if floor % 2.0 == 0.0 {
		floor
	} else {
		floor + 1.0
	};

	rounded / factor
}
