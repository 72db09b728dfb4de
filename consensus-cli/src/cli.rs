//! # CLI Module.
//!
//! This module contains all CLI related data handling and conversions.

use crate::fs::{load_reports, load_reputation, load_scales, save_config, save_result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use truthcoin_consensus::{
	diagnostics::{DiagnosticSink, LogSink, Silent},
	error::ConsensusError,
	matrix::ReportMatrix,
	scale::ScaleSpec,
	Consensus, ConsensusConfig,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub mode: Mode,
	/// Log the intermediate state of every round.
	#[clap(long = "verbose", global = true)]
	pub verbose: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Mode {
	/// Run several rounds over the same reports. Requires 'EvolveData'.
	Evolve(EvolveData),
	/// Run a single consensus round. Requires 'RoundData'.
	Resolve(RoundData),
	/// Display the current configuration.
	Show,
	/// Update the configuration. Requires 'UpdateData'.
	Update(UpdateData),
}

/// Consensus round input.
#[derive(Args, Debug)]
pub struct RoundData {
	/// Report matrix CSV file, defaults to the one in the assets directory.
	#[clap(long = "reports")]
	reports: Option<PathBuf>,
	/// Decision scales JSON file. Every decision is binary without it.
	#[clap(long = "scales")]
	scales: Option<PathBuf>,
	/// Reputation JSON file. Every reporter starts equal without it.
	#[clap(long = "reputation")]
	reputation: Option<PathBuf>,
	/// Decimal places of the saved results.
	#[clap(long = "precision")]
	precision: Option<u32>,
}

/// Multi-round input.
#[derive(Args, Debug)]
pub struct EvolveData {
	#[command(flatten)]
	round: RoundData,
	/// Number of rounds.
	#[clap(long = "rounds")]
	rounds: usize,
}

/// Configuration update subcommand input.
#[derive(Args, Debug)]
pub struct UpdateData {
	/// Width of the ambiguous band around 0.5, within [0, 1].
	#[clap(long = "catch-tolerance")]
	catch_tolerance: Option<f64>,
	/// Weight of each round's reputation in the smoothed reputation, within (0, 1).
	#[clap(long = "smoothing-rate")]
	smoothing_rate: Option<f64>,
}

/// Loaded round inputs.
pub struct RoundInputs {
	reports: ReportMatrix,
	scales: Option<Vec<ScaleSpec>>,
	reputation: Option<Vec<f64>>,
}

impl RoundData {
	/// Loads the files the round refers to.
	pub fn load(&self) -> Result<RoundInputs, ConsensusError> {
		let reports = load_reports(self.reports.as_deref())?;
		let scales = self.scales.as_deref().map(load_scales).transpose()?;
		let reputation = self.reputation.as_deref().map(load_reputation).transpose()?;

		info!(
			"Loaded {} reporters and {} decisions.",
			reports.num_reporters(),
			reports.num_decisions()
		);

		Ok(RoundInputs { reports, scales, reputation })
	}
}

fn sink(verbose: bool) -> Box<dyn DiagnosticSink> {
	if verbose {
		Box::new(LogSink)
	} else {
		Box::new(Silent)
	}
}

/// Handles the `resolve` command.
pub fn handle_resolve(
	config: ConsensusConfig, data: RoundData, verbose: bool,
) -> Result<(), ConsensusError> {
	let inputs = data.load()?;
	let consensus = Consensus::new(config);

	let result = consensus.resolve_traced(
		&inputs.reports,
		inputs.scales.as_deref(),
		inputs.reputation.as_deref(),
		sink(verbose).as_mut(),
	)?;

	info!("Outcomes: {:?}", result.outcomes());
	info!("Average certainty: {}", result.average_certainty);

	save_result(&result, data.precision)
}

/// Handles the `evolve` command.
pub fn handle_evolve(
	config: ConsensusConfig, data: EvolveData, verbose: bool,
) -> Result<(), ConsensusError> {
	let inputs = data.round.load()?;
	let consensus = Consensus::new(config);

	let results = consensus.evolve_traced(
		&inputs.reports,
		inputs.scales.as_deref(),
		inputs.reputation.as_deref(),
		data.rounds,
		sink(verbose).as_mut(),
	)?;

	let last = results.last().ok_or_else(|| {
		ConsensusError::InvalidInput("Evolution produced no rounds.".to_string())
	})?;
	info!("Outcomes after {} rounds: {:?}", results.len(), last.outcomes());

	save_result(last, data.round.precision)
}

/// Applies a configuration update. Nothing changes unless the result is valid.
pub fn apply_update(
	config: &ConsensusConfig, data: &UpdateData,
) -> Result<ConsensusConfig, ConsensusError> {
	let mut updated = *config;

	if let Some(catch_tolerance) = data.catch_tolerance {
		updated.catch_tolerance = catch_tolerance;
	}

	if let Some(smoothing_rate) = data.smoothing_rate {
		updated.smoothing_rate = smoothing_rate;
	}

	updated.validate()?;
	Ok(updated)
}

/// Handles the CLI project configuration update.
pub fn handle_update(config: &mut ConsensusConfig, data: UpdateData) -> Result<(), ConsensusError> {
	*config = apply_update(config, &data)?;
	save_config(*config)
}

#[cfg(test)]
mod tests {
	use crate::cli::{apply_update, Cli, RoundData, UpdateData};
	use clap::CommandFactory;
	use std::{env::temp_dir, fs};
	use truthcoin_consensus::{error::ConsensusError, ConsensusConfig};

	#[test]
	fn test_cli() {
		Cli::command().debug_assert()
	}

	#[test]
	fn test_apply_update() {
		let config = ConsensusConfig::default();
		let data = UpdateData { catch_tolerance: Some(0.2), smoothing_rate: None };

		let updated = apply_update(&config, &data).unwrap();
		assert_eq!(updated.catch_tolerance, 0.2);
		assert_eq!(updated.smoothing_rate, config.smoothing_rate);
	}

	#[test]
	fn test_apply_invalid_update() {
		let config = ConsensusConfig::default();
		let data = UpdateData { catch_tolerance: None, smoothing_rate: Some(1.5) };

		let res = apply_update(&config, &data);
		assert!(matches!(res, Err(ConsensusError::InvalidInput(_))));
	}

	#[test]
	fn test_round_data_load() {
		let reports = temp_dir().join("consensus_cli_reports.csv");
		let scales = temp_dir().join("consensus_cli_scales.json");
		fs::write(&reports, "d1,d2\n0.3,1\n0.5,NA\n").unwrap();
		fs::write(&scales, r#"[{"scaled":true,"min":0.0,"max":1.0},{"scaled":false,"min":0.0,"max":1.0}]"#)
			.unwrap();

		let data = RoundData {
			reports: Some(reports.clone()),
			scales: Some(scales.clone()),
			reputation: None,
			precision: None,
		};
		let inputs = data.load().unwrap();

		assert_eq!(inputs.reports.num_reporters(), 2);
		assert_eq!(inputs.reports.missing_in_column(1), 1);
		assert!(inputs.scales.unwrap()[0].scaled);
		assert!(inputs.reputation.is_none());

		fs::remove_file(reports).unwrap();
		fs::remove_file(scales).unwrap();
	}
}
