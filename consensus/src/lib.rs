//! # Truthcoin Consensus
//!
//! Reputation-weighted crowd-truth consensus for a decentralized oracle.
//!
//! Reporters submit judgements on a set of decisions, binary or scaled. A
//! consensus round fills in skipped reports, resolves every decision and
//! moves reputation towards the reporters who agree with the emerging
//! consensus.
//!
//! ## Main characteristics:
//!
//! **Reputation-weighted** - every reporter's influence is their reputation,
//! and reputation is earned by agreeing with the reputation-weighted majority
//! along the dominant axis of disagreement.
//!
//! **Additive** - splitting a stake across several identities, or merging
//! several identities, does not change its influence.
//!
//! **Stateless** - a round is a pure, deterministic function of its inputs.
//! Carrying the smoothed reputation into the next round is up to the caller.
//!
//! ## Implementation
//!
//! Reputation is updated from the first principal component of the
//! reputation-weighted report matrix, following the Truthcoin whitepaper.

// Rustc
#![warn(trivial_casts)]
#![deny(
	absolute_paths_not_starting_with_crate, deprecated, future_incompatible, missing_docs,
	nonstandard_style, unreachable_code, unreachable_patterns
)]
#![forbid(unsafe_code)]
// Clippy
#![allow(clippy::tabs_in_doc_comments, clippy::needless_range_loop, clippy::new_without_default)]
#![deny(
	// Complexity
 	clippy::unnecessary_cast,
	clippy::needless_question_mark,
	clippy::clone_on_copy,
	// Pedantic
 	clippy::cast_lossless,
 	clippy::cast_possible_wrap,
	// Perf
	clippy::redundant_clone,
	// Restriction
 	clippy::panic,
	// Style
 	clippy::let_and_return,
 	clippy::needless_borrow
)]

pub mod diagnostics;
pub mod error;
pub mod impute;
pub mod matrix;
pub mod participation;
pub mod pca;
pub mod report;
pub mod resolver;
pub mod scale;
pub mod storage;
pub mod weights;

use diagnostics::{DiagnosticSink, RoundEvent, Silent};
use error::ConsensusError;
use impute::{catch, fill_missing};
use log::{debug, info};
use matrix::ReportMatrix;
use pca::update_reputation;
use report::{ConsensusResult, DecisionOutcome, ReporterOutcome};
use resolver::weighted_median;
use scale::{rescale, resolve_scales, ScaleSpec};
use serde::{Deserialize, Serialize};
use weights::{mean, normalize, uniform, validate_reputation};

/// Default width of the ambiguous band around 0.5.
pub const DEFAULT_CATCH_TOLERANCE: f64 = 0.1;
/// Default weight of a round's reputation in the smoothed reputation.
pub const DEFAULT_SMOOTHING_RATE: f64 = 0.1;

/// Consensus round parameters.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ConsensusConfig {
	/// Width of the band around 0.5 that binary outcomes are binned to 0.5 in.
	pub catch_tolerance: f64,
	/// Weight of the round's reputation in the smoothed reputation.
	pub smoothing_rate: f64,
}

impl ConsensusConfig {
	/// Checks that both parameters are in range.
	pub fn validate(&self) -> Result<(), ConsensusError> {
		if !(0.0..=1.0).contains(&self.catch_tolerance) {
			return Err(ConsensusError::InvalidInput(format!(
				"Catch tolerance must be within [0, 1], got {}.",
				self.catch_tolerance
			)));
		}
		if !(self.smoothing_rate > 0.0 && self.smoothing_rate < 1.0) {
			return Err(ConsensusError::InvalidInput(format!(
				"Smoothing rate must be within (0, 1), got {}.",
				self.smoothing_rate
			)));
		}
		Ok(())
	}
}

impl Default for ConsensusConfig {
	fn default() -> Self {
		Self { catch_tolerance: DEFAULT_CATCH_TOLERANCE, smoothing_rate: DEFAULT_SMOOTHING_RATE }
	}
}

/// Runs consensus rounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Consensus {
	config: ConsensusConfig,
}

impl Consensus {
	/// Creates a new Consensus instance.
	pub fn new(config: ConsensusConfig) -> Self {
		Self { config }
	}

	/// Returns the round parameters.
	pub fn config(&self) -> &ConsensusConfig {
		&self.config
	}

	/// Runs a single round.
	///
	/// Without `scales` every decision is binary; without `reputation` every
	/// reporter starts with the same weight.
	pub fn resolve(
		&self, reports: &ReportMatrix, scales: Option<&[ScaleSpec]>, reputation: Option<&[f64]>,
	) -> Result<ConsensusResult, ConsensusError> {
		self.resolve_traced(reports, scales, reputation, &mut Silent)
	}

	/// Runs a single round, publishing its intermediate state to `sink`.
	pub fn resolve_traced(
		&self, reports: &ReportMatrix, scales: Option<&[ScaleSpec]>, reputation: Option<&[f64]>,
		sink: &mut dyn DiagnosticSink,
	) -> Result<ConsensusResult, ConsensusError> {
		self.config.validate()?;
		let tolerance = self.config.catch_tolerance;
		let (reporters, decisions) = (reports.num_reporters(), reports.num_decisions());

		let scales = resolve_scales(scales.map(<[ScaleSpec]>::to_vec), decisions)?;
		let reputation = match reputation {
			Some(reputation) => validate_reputation(reputation, reporters)?,
			None => uniform(reporters),
		};
		debug!("Resolving {} decisions reported by {} reporters", decisions, reporters);

		let normalized = rescale(reports, &scales);
		let imputation = fill_missing(&normalized, &reputation, &scales, tolerance)?;
		let filled = imputation.filled;
		if let Some(preliminary) = &imputation.preliminary {
			sink.event(&RoundEvent::Imputed { preliminary, filled: &filled });
		}

		let update = update_reputation(&filled, &reputation, self.config.smoothing_rate, sink)?;
		let smoothed = &update.smoothed_rep;

		// Binary decisions take the weighted mean, scaled ones the weighted median
		let mut raw = filled.weighted_column_sums(smoothed);
		for (decision, scale) in scales.iter().enumerate() {
			if scale.scaled {
				raw[decision] = weighted_median(&filled.column(decision), smoothed)?;
			}
		}

		let certainty: Vec<f64> = raw.iter().map(|r| (2.0 * (r - 0.5)).abs()).collect();
		let consensus_reward = if certainty.iter().all(|c| *c == 0.0) {
			// Every decision is ambiguous, nothing to tell authors apart
			uniform(decisions)
		} else {
			normalize(&certainty)?
		};
		sink.event(&RoundEvent::Outcomes {
			raw: &raw,
			certainty: &certainty,
			consensus_reward: &consensus_reward,
		});

		let final_outcomes: Vec<f64> = raw
			.iter()
			.zip(&scales)
			.map(|(r, scale)| if scale.scaled { scale.denormalize(*r) } else { catch(*r, tolerance) })
			.collect();

		let turnout = participation::measure(reports, smoothed);
		sink.event(&RoundEvent::Participation {
			by_decision: &turnout.by_decision,
			by_reporter: &turnout.by_reporter,
		});
		let bonuses = participation::bonuses(&turnout, smoothed, &consensus_reward)?;

		let reporter_outcomes = (0..reporters)
			.map(|i| ReporterOutcome {
				old_rep: update.old_rep[i],
				new_rep: update.new_rep[i],
				smoothed_rep: update.smoothed_rep[i],
				missing: reports.missing_in_row(i),
				participation: turnout.by_reporter[i],
				relative_participation: bonuses.relative_participation[i],
				bonus: bonuses.reporter[i],
			})
			.collect();

		let decision_outcomes = (0..decisions)
			.map(|j| DecisionOutcome {
				scaled: scales[j].scaled,
				first_loading: update.first_loading[j],
				raw_outcome: raw[j],
				final_outcome: final_outcomes[j],
				certainty: certainty[j],
				consensus_reward: consensus_reward[j],
				participation: turnout.by_decision[j],
				missing: reports.missing_in_column(j),
				author_bonus: bonuses.author[j],
			})
			.collect();

		let average_certainty = mean(&certainty);
		debug!("Round resolved with average certainty {}", average_certainty);

		Ok(ConsensusResult {
			original: reports.clone(),
			filled,
			reporters: reporter_outcomes,
			decisions: decision_outcomes,
			average_participation: 1.0 - turnout.percent_na,
			average_certainty,
		})
	}

	/// Runs `rounds` successive rounds over the same reports.
	///
	/// Each round starts from the smoothed reputation of the one before it.
	/// Returns the result of every round, oldest first.
	pub fn evolve(
		&self, reports: &ReportMatrix, scales: Option<&[ScaleSpec]>, reputation: Option<&[f64]>,
		rounds: usize,
	) -> Result<Vec<ConsensusResult>, ConsensusError> {
		self.evolve_traced(reports, scales, reputation, rounds, &mut Silent)
	}

	/// Runs `rounds` successive rounds, publishing every round to `sink`.
	pub fn evolve_traced(
		&self, reports: &ReportMatrix, scales: Option<&[ScaleSpec]>, reputation: Option<&[f64]>,
		rounds: usize, sink: &mut dyn DiagnosticSink,
	) -> Result<Vec<ConsensusResult>, ConsensusError> {
		if rounds == 0 {
			return Err(ConsensusError::InvalidInput(
				"At least one round is required.".to_string(),
			));
		}

		let mut results: Vec<ConsensusResult> = Vec::with_capacity(rounds);
		for round in 0..rounds {
			let carried = results.last().map(ConsensusResult::smoothed_reputation);
			let reputation = carried.as_deref().or(reputation);

			let result = self.resolve_traced(reports, scales, reputation, sink)?;
			info!("Round {}: average certainty {}", round + 1, result.average_certainty);
			results.push(result);
		}

		Ok(results)
	}
}

#[cfg(test)]
mod lib_tests {
	use crate::{
		diagnostics::Recorder,
		error::ConsensusError,
		matrix::ReportMatrix,
		scale::ScaleSpec,
		Consensus, ConsensusConfig,
	};
	use rand::{rngs::StdRng, Rng, SeedableRng};

	fn fixture() -> ReportMatrix {
		ReportMatrix::from_options(vec![
			vec![Some(1.0), Some(1.0), Some(0.0), None],
			vec![Some(1.0), Some(0.0), Some(0.0), Some(0.0)],
			vec![Some(1.0), Some(1.0), Some(0.0), Some(0.0)],
			vec![Some(1.0), Some(1.0), Some(1.0), Some(0.0)],
			vec![Some(0.0), Some(0.0), Some(1.0), Some(1.0)],
			vec![Some(0.0), Some(0.0), Some(1.0), Some(1.0)],
		])
		.unwrap()
	}

	fn scaled_fixture() -> Vec<ScaleSpec> {
		vec![
			ScaleSpec::scaled(0.1, 0.5),
			ScaleSpec::scaled(0.2, 0.7),
			ScaleSpec::binary(),
			ScaleSpec::binary(),
		]
	}

	fn assert_close(got: &[f64], want: &[f64]) {
		assert_eq!(got.len(), want.len());
		for (g, w) in got.iter().zip(want) {
			assert!((g - w).abs() < 1e-9, "{} != {}", g, w);
		}
	}

	#[test]
	fn test_binary_round() {
		let consensus = Consensus::default();
		let result = consensus.resolve(&fixture(), None, None).unwrap();

		assert!((result.average_certainty - 0.228237569613).abs() < 1e-11);

		let raw: Vec<f64> = result.decisions.iter().map(|d| d.raw_outcome).collect();
		assert_close(&raw, &[0.7, 0.5282375696127679, 0.4717624303872321, 0.3]);
		assert_eq!(result.outcomes(), vec![1.0, 0.5, 0.5, 0.0]);
		assert_close(
			&result.smoothed_reputation(),
			&[
				0.17823756961276788,
				0.1717624303872321,
				0.17823756961276788,
				0.1717624303872321,
				0.15,
				0.15,
			],
		);

		// The single gap was filled with the binned column mean
		assert_eq!(result.filled.get(0, 3), 0.0);
		assert_eq!(result.decisions[3].missing, 1);
		assert_eq!(result.reporters[0].missing, 1);
		assert_eq!(result.reporters[0].participation, 0.75);
	}

	#[test]
	fn test_binary_round_bonuses() {
		let result = Consensus::default().resolve(&fixture(), None, None).unwrap();

		let reporter_bonus: f64 = result.reporters.iter().map(|r| r.bonus).sum();
		let author_bonus: f64 = result.decisions.iter().map(|d| d.author_bonus).sum();
		let reward: f64 = result.decisions.iter().map(|d| d.consensus_reward).sum();
		assert!((reporter_bonus - 1.0).abs() < 1e-12);
		assert!((author_bonus - 1.0).abs() < 1e-12);
		assert!((reward - 1.0).abs() < 1e-12);

		let expected = 1.0 - 0.17823756961276788 / 4.0;
		assert!((result.average_participation - expected).abs() < 1e-12);
	}

	#[test]
	fn test_events_in_order() {
		let mut recorder = Recorder::default();
		Consensus::default().resolve_traced(&fixture(), None, None, &mut recorder).unwrap();

		assert_eq!(
			recorder.stages,
			vec![
				"imputed",
				"component",
				"sign-resolved",
				"reputation-updated",
				"outcomes",
				"participation"
			]
		);
	}

	#[test]
	fn test_scaled_round() {
		let reports = ReportMatrix::from_options(vec![
			vec![Some(0.3), Some(0.65), Some(0.0), None],
			vec![Some(0.1), Some(0.2), Some(0.0), Some(0.0)],
			vec![Some(0.45), Some(0.4), Some(0.0), Some(0.0)],
			vec![Some(0.5), Some(0.7), Some(1.0), Some(0.0)],
			vec![Some(0.2), None, Some(1.0), Some(1.0)],
			vec![Some(0.15), Some(0.25), Some(1.0), Some(1.0)],
		])
		.unwrap();
		let scales = scaled_fixture();

		let result = Consensus::default().resolve(&reports, Some(&scales), None).unwrap();

		for (decision, scale) in result.decisions.iter().zip(&scales) {
			assert_eq!(decision.scaled, scale.scaled);
			assert!(decision.final_outcome >= scale.min - 1e-12);
			assert!(decision.final_outcome <= scale.max + 1e-12);
			assert!(decision.certainty >= 0.0 && decision.certainty <= 1.0);
		}

		// Scaled outcomes are reported values, never binned
		for j in 0..2 {
			let outcome = result.decisions[j].final_outcome;
			assert!(reports.column(j).any(|r| r.value().map_or(false, |v| (v - outcome).abs() < 1e-12)));
		}
	}

	#[test]
	fn test_fixture_redeclared_as_scaled() {
		let scales = scaled_fixture();
		let result = Consensus::default().resolve(&fixture(), Some(&scales), None).unwrap();

		assert!(result.decisions[0].scaled);
		assert!(result.decisions[1].scaled);
		for decision in &result.decisions[2..] {
			assert!(!decision.scaled);
			assert!([0.0, 0.5, 1.0].contains(&decision.final_outcome));
		}

		// Reports of 0 and 1 fall outside both scaled ranges and are clamped
		for (decision, scale) in result.decisions.iter().zip(&scales) {
			assert!(decision.certainty >= 0.0 && decision.certainty <= 1.0);
			assert!(decision.final_outcome >= scale.min - 1e-12);
			assert!(decision.final_outcome <= scale.max + 1e-12);
		}
		assert!(result.average_certainty >= 0.0 && result.average_certainty <= 1.0);
		for i in 0..6 {
			for j in 0..2 {
				let value = result.filled.get(i, j);
				assert!((0.0..=1.0).contains(&value));
			}
		}
	}

	#[test]
	fn test_out_of_range_scaled_report() {
		let reports = ReportMatrix::from_options(vec![
			vec![Some(250.0), Some(1.0)],
			vec![Some(250.0), Some(1.0)],
			vec![Some(150.0), Some(0.0)],
		])
		.unwrap();
		let scales = vec![ScaleSpec::scaled(100.0, 200.0), ScaleSpec::binary()];

		let result = Consensus::default().resolve(&reports, Some(&scales), None).unwrap();

		assert_eq!(result.filled.get(0, 0), 1.0);
		assert_eq!(result.decisions[0].raw_outcome, 1.0);
		assert_eq!(result.decisions[0].final_outcome, 200.0);
		assert_eq!(result.decisions[0].certainty, 1.0);
	}

	#[test]
	fn test_certainty_bounds() {
		let rng = &mut StdRng::seed_from_u64(7);
		let consensus = Consensus::default();

		for _ in 0..30 {
			let reporters = rng.gen_range(3..10);
			let decisions = rng.gen_range(2..6);
			let rows: Vec<Vec<Option<f64>>> = (0..reporters)
				.map(|i| {
					(0..decisions)
						.map(|_| {
							// First reporter answers everything so no column is empty
							if i > 0 && rng.gen_bool(0.15) {
								None
							} else {
								Some(if rng.gen_bool(0.5) { 1.0 } else { 0.0 })
							}
						})
						.collect()
				})
				.collect();
			let reports = ReportMatrix::from_options(rows).unwrap();

			let result = consensus.resolve(&reports, None, None).unwrap();
			for decision in &result.decisions {
				assert!(decision.certainty >= 0.0 && decision.certainty <= 1.0 + 1e-12);
				assert!([0.0, 0.5, 1.0].contains(&decision.final_outcome));
			}
			let total: f64 = result.smoothed_reputation().iter().sum();
			assert!((total - 1.0).abs() < 1e-9);
		}
	}

	#[test]
	fn test_certainty_extremes() {
		let reports = ReportMatrix::from_options(vec![
			vec![Some(1.0), Some(0.0), Some(1.0)],
			vec![Some(1.0), Some(1.0), Some(1.0)],
		])
		.unwrap();
		let result = Consensus::default().resolve(&reports, None, None).unwrap();

		assert!((result.decisions[0].certainty - 1.0).abs() < 1e-12);
		assert!((result.decisions[2].certainty - 1.0).abs() < 1e-12);
		assert!(result.decisions[1].certainty < 1.0 - 1e-3);
	}

	#[test]
	fn test_all_ambiguous_rewards_uniformly() {
		let reports = ReportMatrix::from_options(vec![vec![Some(0.5), Some(0.5)]; 2]).unwrap();

		let mut recorder = Recorder::default();
		let result =
			Consensus::default().resolve_traced(&reports, None, None, &mut recorder).unwrap();

		assert!(recorder.stages.contains(&"unanimous"));
		for decision in &result.decisions {
			assert!(decision.certainty.abs() < 1e-12);
			assert_eq!(decision.final_outcome, 0.5);
			assert!((decision.consensus_reward - 0.5).abs() < 1e-12);
		}
	}

	#[test]
	fn test_deterministic() {
		let consensus = Consensus::default();
		let scales = scaled_fixture();
		let reputation = vec![0.3, 0.1, 0.2, 0.1, 0.2, 0.1];

		let a = consensus.resolve(&fixture(), Some(&scales), Some(&reputation)).unwrap();
		let b = consensus.resolve(&fixture(), Some(&scales), Some(&reputation)).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn test_dimension_mismatch() {
		let consensus = Consensus::default();

		let res = consensus.resolve(&fixture(), None, Some(&[0.5, 0.5]));
		assert!(matches!(res, Err(ConsensusError::InvalidInput(_))));

		let res = consensus.resolve(&fixture(), Some(&[ScaleSpec::binary()]), None);
		assert!(matches!(res, Err(ConsensusError::InvalidInput(_))));

		let bad_scale = vec![ScaleSpec::scaled(1.0, 0.0); 4];
		let res = consensus.resolve(&fixture(), Some(&bad_scale), None);
		assert!(matches!(res, Err(ConsensusError::InvalidInput(_))));
	}

	#[test]
	fn test_degenerate_reputation() {
		let res = Consensus::default().resolve(&fixture(), None, Some(&[0.0; 6]));
		assert!(matches!(res, Err(ConsensusError::DegenerateWeights(_))));
	}

	#[test]
	fn test_invalid_config() {
		let consensus = Consensus::new(ConsensusConfig { catch_tolerance: 0.1, smoothing_rate: 1.0 });
		let res = consensus.resolve(&fixture(), None, None);
		assert!(matches!(res, Err(ConsensusError::InvalidInput(_))));

		let config = ConsensusConfig { catch_tolerance: -0.1, smoothing_rate: 0.1 };
		assert!(config.validate().is_err());
		assert!(ConsensusConfig::default().validate().is_ok());
	}

	#[test]
	fn test_evolve() {
		let consensus = Consensus::default();
		let results = consensus.evolve(&fixture(), None, None, 5).unwrap();
		assert_eq!(results.len(), 5);

		// Each round starts where the previous one left off
		for pair in results.windows(2) {
			let carried = pair[0].smoothed_reputation();
			let started: Vec<f64> = pair[1].reporters.iter().map(|r| r.old_rep).collect();
			for (c, s) in carried.iter().zip(&started) {
				assert!((c - s).abs() < 1e-12);
			}
		}

		// The dissenting pair keeps losing ground
		let first: f64 = results[0].reporters[4..].iter().map(|r| r.smoothed_rep).sum();
		let last: f64 = results[4].reporters[4..].iter().map(|r| r.smoothed_rep).sum();
		assert!(last < first);

		let first_round = consensus.resolve(&fixture(), None, None).unwrap();
		assert_eq!(results[0], first_round);
	}

	#[test]
	fn test_evolve_zero_rounds() {
		let res = Consensus::default().evolve(&fixture(), None, None, 0);
		assert!(matches!(res, Err(ConsensusError::InvalidInput(_))));
	}
}
