//! # Storage Module.
//!
//! This module contains generic storage traits and implementations.

use crate::{
	error::ConsensusError,
	matrix::{Report, ReportMatrix},
};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{from_reader, to_string_pretty};
use std::fs::File;
use std::io::{BufReader, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

/// Cell text read back as a missing report, compared case-insensitively.
/// The first token is the one written.
const MISSING_TOKENS: [&str; 4] = ["NA", "", "NaN", "-"];

/// The main trait to be implemented by different storage types.
pub trait Storage<T> {
	/// The error type.
	type Err;

	/// Loads data from storage.
	fn load(&self) -> Result<T, Self::Err>;
	/// Saves data to storage.
	fn save(&mut self, data: T) -> Result<(), Self::Err>;
}

/// The `CSVFileStorage` struct provides a mechanism for persisting
/// and retrieving structured data to and from CSV files.
///
/// # Examples
///
/// ```no_run
/// use serde::{Serialize, Deserialize};
/// use std::path::PathBuf;
/// use truthcoin_consensus::storage::{CSVFileStorage, Storage};
///
/// #[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
/// struct Record {
///    reporter: usize,
///    bonus: f64,
/// }
///
/// let filepath = PathBuf::from("/path/to/your/file.csv");
/// let mut storage = CSVFileStorage::<Record>::new(filepath);
///
/// let data = vec![Record { reporter: 0, bonus: 0.25 }];
///
/// // Save the data to the CSV file.
/// storage.save(data.clone()).unwrap();
///
/// // Load the data from the CSV file.
/// let loaded_data = storage.load().unwrap();
/// assert_eq!(data, loaded_data);
/// ```
pub struct CSVFileStorage<T> {
	filepath: PathBuf,
	phantom: PhantomData<T>,
}

impl<T> CSVFileStorage<T> {
	/// Creates a new CSVFileStorage.
	pub fn new(filepath: PathBuf) -> Self {
		Self { filepath, phantom: PhantomData }
	}

	/// Returns the path to the file.
	pub fn filepath(&self) -> &PathBuf {
		&self.filepath
	}
}

impl<T: Serialize + DeserializeOwned + Clone> Storage<Vec<T>> for CSVFileStorage<T> {
	type Err = ConsensusError;

	fn load(&self) -> Result<Vec<T>, ConsensusError> {
		let file = File::open(&self.filepath).map_err(ConsensusError::IOError)?;
		let mut reader = ReaderBuilder::new().from_reader(BufReader::new(file));

		reader
			.deserialize()
			.map(|result| result.map_err(|e| ConsensusError::FileIOError(e.to_string())))
			.collect()
	}

	fn save(&mut self, data: Vec<T>) -> Result<(), ConsensusError> {
		let mut writer = WriterBuilder::new()
			.from_path(&self.filepath)
			.map_err(|e| ConsensusError::FileIOError(e.to_string()))?;

		for record in &data {
			writer.serialize(record).map_err(|e| ConsensusError::FileIOError(e.to_string()))?;
		}

		writer.flush().map_err(|e| ConsensusError::FileIOError(e.to_string()))?;

		Ok(())
	}
}

/// The `JSONFileStorage` struct provides a mechanism for persisting
/// and retrieving structured data to and from JSON files.
pub struct JSONFileStorage<T> {
	filepath: PathBuf,
	phantom: PhantomData<T>,
}

impl<T> JSONFileStorage<T> {
	/// Creates a new JSONFileStorage.
	pub fn new(filepath: PathBuf) -> Self {
		Self { filepath, phantom: PhantomData }
	}

	/// Returns the path to the file.
	pub fn filepath(&self) -> &PathBuf {
		&self.filepath
	}
}

impl<T: Serialize + DeserializeOwned + Clone> Storage<T> for JSONFileStorage<T> {
	type Err = ConsensusError;

	fn load(&self) -> Result<T, Self::Err> {
		let file = File::open(&self.filepath).map_err(ConsensusError::IOError)?;
		let reader = BufReader::new(file);
		from_reader(reader).map_err(|e| ConsensusError::ParsingError(e.to_string()))
	}

	fn save(&mut self, data: T) -> Result<(), Self::Err> {
		let json_str =
			to_string_pretty(&data).map_err(|e| ConsensusError::ParsingError(e.to_string()))?;

		let mut file = File::create(&self.filepath).map_err(ConsensusError::IOError)?;
		file.write_all(json_str.as_bytes()).map_err(ConsensusError::IOError)
	}
}

/// The `ReportsFileStorage` struct persists report matrices as CSV tables.
///
/// The first row names the decisions, every following row holds one
/// reporter's reports. Empty cells and the tokens `NA`, `NaN` and `-` are
/// missing reports.
pub struct ReportsFileStorage {
	filepath: PathBuf,
}

impl ReportsFileStorage {
	/// Creates a new ReportsFileStorage.
	pub fn new(filepath: PathBuf) -> Self {
		Self { filepath }
	}

	/// Returns the path to the file.
	pub fn filepath(&self) -> &PathBuf {
		&self.filepath
	}
}

impl Storage<ReportMatrix> for ReportsFileStorage {
	type Err = ConsensusError;

	fn load(&self) -> Result<ReportMatrix, Self::Err> {
		let file = File::open(&self.filepath).map_err(ConsensusError::IOError)?;
		let mut reader =
			ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(BufReader::new(file));

		let decisions =
			reader.headers().map_err(|e| ConsensusError::FileIOError(e.to_string()))?.len();

		let mut rows = Vec::new();
		for (line, record) in reader.records().enumerate() {
			let record = record.map_err(|e| ConsensusError::FileIOError(e.to_string()))?;
			if record.len() != decisions {
				return Err(ConsensusError::InvalidInput(format!(
					"Reporter {} submitted {} reports, header names {} decisions.",
					line,
					record.len(),
					decisions
				)));
			}
			rows.push(parse_row(&record, line)?);
		}

		ReportMatrix::new(rows)
	}

	fn save(&mut self, data: ReportMatrix) -> Result<(), Self::Err> {
		let mut writer = WriterBuilder::new()
			.from_path(&self.filepath)
			.map_err(|e| ConsensusError::FileIOError(e.to_string()))?;

		let header: Vec<String> = (1..=data.num_decisions()).map(|j| format!("d{}", j)).collect();
		writer.write_record(&header).map_err(|e| ConsensusError::FileIOError(e.to_string()))?;

		for reporter in 0..data.num_reporters() {
			let row: Vec<String> = data
				.row(reporter)
				.iter()
				.map(|report| match report {
					Report::Present(value) => value.to_string(),
					Report::Missing => MISSING_TOKENS[0].to_string(),
				})
				.collect();
			writer.write_record(&row).map_err(|e| ConsensusError::FileIOError(e.to_string()))?;
		}

		writer.flush().map_err(|e| ConsensusError::FileIOError(e.to_string()))?;

		Ok(())
	}
}

/// Parses one reporter's row of a reports table.
fn parse_row(record: &StringRecord, line: usize) -> Result<Vec<Report>, ConsensusError> {
	record
		.iter()
		.enumerate()
		.map(|(column, cell)| {
			if MISSING_TOKENS.iter().any(|token| cell.eq_ignore_ascii_case(token)) {
				return Ok(Report::Missing);
			}

			cell.parse::<f64>()
				.ok()
				.filter(|value| value.is_finite())
				.map(Report::Present)
				.ok_or_else(|| {
					ConsensusError::ParsingError(format!(
						"Reporter {} decision {}: '{}' is not a number.",
						line, column, cell
					))
				})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use crate::storage::*;
	use serde::{Deserialize, Serialize};
	use std::{env::temp_dir, fs};

	#[derive(Debug, Deserialize, PartialEq, Clone, Serialize)]
	struct Record {
		reporter: usize,
		bonus: f64,
	}

	#[test]
	fn test_csv_file_storage() {
		let filepath = temp_dir().join("consensus_test_records.csv");
		let mut csv_storage = CSVFileStorage::<Record>::new(filepath.clone());

		let content = vec![Record { reporter: 0, bonus: 0.25 }, Record { reporter: 1, bonus: 0.75 }];

		assert!(csv_storage.save(content.clone()).is_ok());

		let records: Vec<Record> = csv_storage.load().unwrap();
		assert_eq!(records, content);

		fs::remove_file(filepath).unwrap();
	}

	#[test]
	fn test_json_file_storage() {
		let filepath = temp_dir().join("consensus_test_record.json");
		let mut json_storage = JSONFileStorage::<Vec<f64>>::new(filepath.clone());

		let content = vec![0.1, 0.2, 0.7];

		assert!(json_storage.save(content.clone()).is_ok());
		assert_eq!(json_storage.load().unwrap(), content);

		fs::remove_file(filepath).unwrap();
	}

	#[test]
	fn test_reports_file_storage() {
		let filepath = temp_dir().join("consensus_test_reports.csv");
		let mut storage = ReportsFileStorage::new(filepath.clone());

		let reports = ReportMatrix::from_options(vec![
			vec![Some(1.0), None, Some(0.25)],
			vec![Some(0.0), Some(1.0), None],
		])
		.unwrap();

		storage.save(reports.clone()).unwrap();
		assert_eq!(storage.load().unwrap(), reports);

		fs::remove_file(filepath).unwrap();
	}

	#[test]
	fn test_reports_missing_tokens() {
		let filepath = temp_dir().join("consensus_test_reports_tokens.csv");
		fs::write(&filepath, "a,b,c,d,e\n1,,na,NaN,-\n0, 1 ,0,1,0.5\n").unwrap();

		let reports = ReportsFileStorage::new(filepath.clone()).load().unwrap();
		assert_eq!(reports.num_reporters(), 2);
		assert_eq!(reports.missing_in_row(0), 4);
		assert_eq!(reports.get(1, 1), Report::Present(1.0));

		fs::remove_file(filepath).unwrap();
	}

	#[test]
	fn test_reports_bad_cell() {
		let filepath = temp_dir().join("consensus_test_reports_bad.csv");
		fs::write(&filepath, "a,b\n1,yes\n").unwrap();

		let res = ReportsFileStorage::new(filepath.clone()).load();
		assert!(matches!(res, Err(ConsensusError::ParsingError(_))));

		fs::remove_file(filepath).unwrap();
	}

	#[test]
	fn test_reports_header_width() {
		let filepath = temp_dir().join("consensus_test_reports_header.csv");
		fs::write(&filepath, "a,b,c\n1,0\n0,1\n").unwrap();

		let res = ReportsFileStorage::new(filepath.clone()).load();
		assert!(matches!(res, Err(ConsensusError::InvalidInput(_))));

		fs::remove_file(filepath).unwrap();
	}

	#[test]
	fn test_reports_ragged() {
		let filepath = temp_dir().join("consensus_test_reports_ragged.csv");
		fs::write(&filepath, "a,b\n1,0\n1\n").unwrap();

		let res = ReportsFileStorage::new(filepath.clone()).load();
		assert!(matches!(res, Err(ConsensusError::InvalidInput(_))));

		fs::remove_file(filepath).unwrap();
	}
}
