//! # Diagnostics Module.
//!
//! Callers observe the intermediate state of a round through a
//! [`DiagnosticSink`]. Sinks only watch: nothing they do feeds back into the
//! computation.

use crate::matrix::Matrix;
use log::debug;

/// Intermediate state published while a round is computed.
#[derive(Debug, Clone, Copy)]
pub enum RoundEvent<'a> {
	/// Gaps were filled with the preliminary outcomes.
	Imputed {
		/// Preliminary per-decision outcomes.
		preliminary: &'a [f64],
		/// The filled, normalized report matrix.
		filled: &'a Matrix,
	},
	/// First principal component of the filled matrix.
	Component {
		/// Per-decision loading.
		loading: &'a [f64],
		/// Per-reporter scores.
		scores: &'a [f64],
	},
	/// Polarity of the principal axis was anchored to the status quo.
	SignResolved {
		/// Outcomes implied by the previous reputation.
		status_quo: &'a [f64],
		/// Outcomes implied by the nonnegative shift.
		first: &'a [f64],
		/// Outcomes implied by the nonpositive shift.
		second: &'a [f64],
		/// Whether the nonnegative shift was chosen.
		chose_first: bool,
	},
	/// No discriminating axis; the previous reputation is carried over.
	Unanimous,
	/// Reputation of this round and its smoothed blend.
	ReputationUpdated {
		/// Reputation implied by this round alone.
		new_rep: &'a [f64],
		/// Smoothed reputation.
		smoothed_rep: &'a [f64],
	},
	/// Final decision outcomes.
	Outcomes {
		/// Outcomes before binning and rescaling.
		raw: &'a [f64],
		/// Distance of each outcome from the ambiguous midpoint.
		certainty: &'a [f64],
		/// Normalized certainty.
		consensus_reward: &'a [f64],
	},
	/// Turnout per decision and per reporter.
	Participation {
		/// Reputation-weighted turnout of every decision.
		by_decision: &'a [f64],
		/// Share of decisions every reporter answered.
		by_reporter: &'a [f64],
	},
}

impl RoundEvent<'_> {
	/// Short name of the pipeline stage that published the event.
	pub fn stage(&self) -> &'static str {
		match self {
			RoundEvent::Imputed { .. } => "imputed",
			RoundEvent::Component { .. } => "component",
			RoundEvent::SignResolved { .. } => "sign-resolved",
			RoundEvent::Unanimous => "unanimous",
			RoundEvent::ReputationUpdated { .. } => "reputation-updated",
			RoundEvent::Outcomes { .. } => "outcomes",
			RoundEvent::Participation { .. } => "participation",
		}
	}
}

/// Receiver of round events.
pub trait DiagnosticSink {
	/// Called once per published event, in pipeline order.
	fn event(&mut self, event: &RoundEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl DiagnosticSink for Silent {
	fn event(&mut self, _event: &RoundEvent<'_>) {}
}

/// Forwards every event to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
	fn event(&mut self, event: &RoundEvent<'_>) {
		match event {
			RoundEvent::Imputed { preliminary, filled } => {
				debug!("Missing values detected, preliminary outcomes: {:?}", preliminary);
				debug!("Filled matrix: {:?}", filled);
			},
			RoundEvent::Component { loading, scores } => {
				debug!("First loading: {:?}", loading);
				debug!("First score: {:?}", scores);
			},
			RoundEvent::SignResolved { status_quo, first, second, chose_first } => {
				debug!("Outcomes under previous reputation: {:?}", status_quo);
				debug!("Outcomes under option 1: {:?}", first);
				debug!("Outcomes under option 2: {:?}", second);
				debug!("Selected option {}", if *chose_first { 1 } else { 2 });
			},
			RoundEvent::Unanimous => {
				debug!("No disagreement among reporters, reputation carried over");
			},
			RoundEvent::ReputationUpdated { new_rep, smoothed_rep } => {
				debug!("Reputation corrected for additivity: {:?}", new_rep);
				debug!("Smoothed reputation: {:?}", smoothed_rep);
			},
			RoundEvent::Outcomes { raw, certainty, consensus_reward } => {
				debug!("Raw outcomes: {:?}", raw);
				debug!("Certainty: {:?}", certainty);
				debug!("Author payout factor: {:?}", consensus_reward);
			},
			RoundEvent::Participation { by_decision, by_reporter } => {
				debug!("Turnout by decision: {:?}", by_decision);
				debug!("Turnout by reporter: {:?}", by_reporter);
			},
		}
	}
}

impl<F> DiagnosticSink for F
where
	F: FnMut(&RoundEvent<'_>),
{
	fn event(&mut self, event: &RoundEvent<'_>) {
		self(event)
	}
}

/// Records the stage of every event it sees.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct Recorder {
	pub(crate) stages: Vec<&'static str>,
}

#[cfg(test)]
impl DiagnosticSink for Recorder {
	fn event(&mut self, event: &RoundEvent<'_>) {
		self.stages.push(event.stage());
	}
}
