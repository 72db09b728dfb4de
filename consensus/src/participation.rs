//! # Participation Module.
//!
//! Turnout accounting and the bonuses that blend it with consensus rewards.

use crate::{
	error::ConsensusError,
	matrix::ReportMatrix,
	weights::{mean, normalize},
};

/// Turnout of a round.
#[derive(Debug, Clone, PartialEq)]
pub struct Turnout {
	/// Per decision: share of (smoothed) reputation that answered.
	pub by_decision: Vec<f64>,
	/// Per reporter: share of decisions answered, every decision counting equally.
	pub by_reporter: Vec<f64>,
	/// Global missingness, `1 - mean(by_decision)`.
	pub percent_na: f64,
}

/// Bonuses of a round.
#[derive(Debug, Clone, PartialEq)]
pub struct Bonuses {
	/// Normalized per-reporter turnout.
	pub relative_participation: Vec<f64>,
	/// Normalized per-decision turnout.
	pub relative_decision_participation: Vec<f64>,
	/// Per-reporter bonus.
	pub reporter: Vec<f64>,
	/// Per-decision bonus paid to the decision's author.
	pub author: Vec<f64>,
}

/// Measures turnout against the original, unfilled reports.
///
/// Per-reporter turnout deliberately ignores reputation, so a reporter's low
/// reputation never makes them count as having participated less.
pub fn measure(reports: &ReportMatrix, smoothed_rep: &[f64]) -> Turnout {
	let decisions = reports.num_decisions();

	let by_decision: Vec<f64> = (0..decisions)
		.map(|decision| {
			let missing: f64 = reports
				.column(decision)
				.zip(smoothed_rep)
				.filter(|(report, _)| report.is_missing())
				.map(|(_, rep)| rep)
				.sum();
			1.0 - missing
		})
		.collect();

	let by_reporter: Vec<f64> = (0..reports.num_reporters())
		.map(|reporter| 1.0 - reports.missing_in_row(reporter) as f64 / decisions as f64)
		.collect();

	let percent_na = 1.0 - mean(&by_decision);

	Turnout { by_decision, by_reporter, percent_na }
}

/// Blends turnout with consensus rewards, weighted by global missingness.
///
/// The more reports are missing, the more the bonuses lean on turnout rather
/// than on agreement with the consensus.
pub fn bonuses(
	turnout: &Turnout, smoothed_rep: &[f64], consensus_reward: &[f64],
) -> Result<Bonuses, ConsensusError> {
	let na = turnout.percent_na;
	let relative_participation = normalize(&turnout.by_reporter)?;
	let relative_decision_participation = normalize(&turnout.by_decision)?;

	let reporter = relative_participation
		.iter()
		.zip(smoothed_rep)
		.map(|(part, rep)| part * na + rep * (1.0 - na))
		.collect();

	let author = relative_decision_participation
		.iter()
		.zip(consensus_reward)
		.map(|(part, reward)| part * na + reward * (1.0 - na))
		.collect();

	Ok(Bonuses { relative_participation, relative_decision_participation, reporter, author })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn reports() -> ReportMatrix {
		ReportMatrix::from_options(vec![
			vec![Some(1.0), Some(1.0), Some(0.0), None],
			vec![Some(1.0), Some(0.0), Some(0.0), Some(0.0)],
			vec![Some(1.0), Some(1.0), None, None],
			vec![Some(0.0), Some(0.0), Some(1.0), Some(1.0)],
		])
		.unwrap()
	}

	#[test]
	fn test_turnout() {
		let rep = vec![0.1, 0.2, 0.3, 0.4];
		let turnout = measure(&reports(), &rep);

		let expected_decision = [1.0, 1.0, 0.7, 0.6];
		for (got, want) in turnout.by_decision.iter().zip(expected_decision) {
			assert!((got - want).abs() < 1e-12);
		}
		assert_eq!(turnout.by_reporter, vec![0.75, 1.0, 0.5, 1.0]);
		assert!((turnout.percent_na - 0.175).abs() < 1e-12);
	}

	#[test]
	fn test_reporter_turnout_ignores_reputation() {
		let a = measure(&reports(), &[0.25; 4]);
		let b = measure(&reports(), &[0.7, 0.1, 0.1, 0.1]);
		assert_eq!(a.by_reporter, b.by_reporter);
	}

	#[test]
	fn test_full_turnout_pays_consensus() {
		let reports =
			ReportMatrix::from_options(vec![vec![Some(1.0), Some(0.0)], vec![Some(1.0), Some(1.0)]])
				.unwrap();
		let rep = vec![0.6, 0.4];
		let reward = vec![0.8, 0.2];

		let turnout = measure(&reports, &rep);
		assert_eq!(turnout.percent_na, 0.0);

		let bonuses = bonuses(&turnout, &rep, &reward).unwrap();
		assert_eq!(bonuses.reporter, rep);
		assert_eq!(bonuses.author, reward);
	}

	#[test]
	fn test_bonuses_sum_to_one() {
		let rep = vec![0.1, 0.2, 0.3, 0.4];
		let reward = vec![0.4, 0.3, 0.2, 0.1];
		let turnout = measure(&reports(), &rep);
		let bonuses = bonuses(&turnout, &rep, &reward).unwrap();

		assert!((bonuses.reporter.iter().sum::<f64>() - 1.0).abs() < 1e-12);
		assert!((bonuses.author.iter().sum::<f64>() - 1.0).abs() < 1e-12);
		assert!((bonuses.relative_participation.iter().sum::<f64>() - 1.0).abs() < 1e-12);
	}
}
