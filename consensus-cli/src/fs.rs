//! # Filesystem Actions Module.
//!
//! This module provides functionalities for filesystem actions.

use log::info;
use std::{
	env::current_dir,
	path::{Path, PathBuf},
};
use truthcoin_consensus::{
	error::ConsensusError,
	matrix::ReportMatrix,
	report::{ConsensusResult, DecisionRecord, ReporterRecord},
	scale::ScaleSpec,
	storage::{CSVFileStorage, JSONFileStorage, ReportsFileStorage, Storage},
	ConsensusConfig,
};

/// Library configuration file name.
pub const CONFIG_FILENAME: &str = "config";
/// Default report matrix file name.
pub const REPORTS_FILENAME: &str = "reports";
/// Round result file name.
pub const RESULT_FILENAME: &str = "result";
/// Per-reporter result table file name.
pub const REPORTERS_FILENAME: &str = "reporters";
/// Per-decision result table file name.
pub const DECISIONS_FILENAME: &str = "decisions";
/// Smoothed reputation file name.
pub const REPUTATION_FILENAME: &str = "reputation";

/// Enum representing the possible file extensions.
pub enum FileType {
	/// CSV file.
	Csv,
	/// JSON file.
	Json,
}

impl FileType {
	/// Converts the enum variant into its corresponding file extension.
	fn as_str(&self) -> &'static str {
		match self {
			FileType::Csv => "csv",
			FileType::Json => "json",
		}
	}
}

/// Retrieves the path to the `assets` directory.
pub fn get_assets_path() -> Result<PathBuf, ConsensusError> {
	current_dir().map_err(ConsensusError::IOError).map(|current_dir| {
		// Workaround for the tests running in the `consensus-cli` directory.
		#[cfg(test)]
		{
			current_dir.join("assets")
		}

		#[cfg(not(test))]
		{
			current_dir.join("consensus-cli/assets")
		}
	})
}

/// Helper function to get the path of a file in the `assets` directory.
pub fn get_file_path(file_name: &str, file_type: FileType) -> Result<PathBuf, ConsensusError> {
	let assets_path = get_assets_path()?;
	Ok(assets_path.join(format!("{}.{}", file_name, file_type.as_str())))
}

/// Loads the configuration file.
pub fn load_config() -> Result<ConsensusConfig, ConsensusError> {
	let filepath = get_file_path(CONFIG_FILENAME, FileType::Json)?;
	JSONFileStorage::<ConsensusConfig>::new(filepath).load()
}

/// Saves the configuration file.
pub fn save_config(config: ConsensusConfig) -> Result<(), ConsensusError> {
	let filepath = get_file_path(CONFIG_FILENAME, FileType::Json)?;
	JSONFileStorage::<ConsensusConfig>::new(filepath).save(config)
}

/// Loads a report matrix, from the assets directory unless a path is given.
pub fn load_reports(path: Option<&Path>) -> Result<ReportMatrix, ConsensusError> {
	let filepath = match path {
		Some(path) => path.to_path_buf(),
		None => get_file_path(REPORTS_FILENAME, FileType::Csv)?,
	};
	ReportsFileStorage::new(filepath).load()
}

/// Loads per-decision scales.
pub fn load_scales(path: &Path) -> Result<Vec<ScaleSpec>, ConsensusError> {
	JSONFileStorage::<Vec<ScaleSpec>>::new(path.to_path_buf()).load()
}

/// Loads a reputation vector.
pub fn load_reputation(path: &Path) -> Result<Vec<f64>, ConsensusError> {
	JSONFileStorage::<Vec<f64>>::new(path.to_path_buf()).load()
}

/// Saves a round's result into the assets directory.
///
/// The reputation file always carries full precision, so that it can be fed
/// into the next round unchanged.
pub fn save_result(result: &ConsensusResult, precision: Option<u32>) -> Result<(), ConsensusError> {
	let reputation = result.smoothed_reputation();
	let rounded = precision.map(|digits| result.rounded(digits));
	let result = rounded.as_ref().unwrap_or(result);

	let mut result_storage =
		JSONFileStorage::<ConsensusResult>::new(get_file_path(RESULT_FILENAME, FileType::Json)?);
	result_storage.save(result.clone())?;

	let mut reporters_storage =
		CSVFileStorage::<ReporterRecord>::new(get_file_path(REPORTERS_FILENAME, FileType::Csv)?);
	reporters_storage.save(result.reporter_records())?;

	let mut decisions_storage =
		CSVFileStorage::<DecisionRecord>::new(get_file_path(DECISIONS_FILENAME, FileType::Csv)?);
	decisions_storage.save(result.decision_records())?;

	let mut reputation_storage =
		JSONFileStorage::<Vec<f64>>::new(get_file_path(REPUTATION_FILENAME, FileType::Json)?);
	reputation_storage.save(reputation)?;

	info!(
		"Results saved at \"{}\".",
		result_storage.filepath().display()
	);

	Ok(())
}
