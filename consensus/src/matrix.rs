//! # Matrix Module.
//!
//! Report matrices with explicit missing cells, and the dense matrix the
//! consensus pipeline works on once every gap has been imputed.

use crate::error::ConsensusError;
use serde::{Deserialize, Serialize};

/// A single reporter's judgement on a single decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Report {
	/// The reporter answered with this value.
	Present(f64),
	/// The reporter skipped the decision.
	Missing,
}

impl Report {
	/// Returns the reported value, if any.
	pub fn value(&self) -> Option<f64> {
		match self {
			Report::Present(value) => Some(*value),
			Report::Missing => None,
		}
	}

	/// Whether the cell was skipped.
	pub fn is_missing(&self) -> bool {
		matches!(self, Report::Missing)
	}
}

impl From<Option<f64>> for Report {
	fn from(value: Option<f64>) -> Self {
		value.map_or(Report::Missing, Report::Present)
	}
}

impl From<Report> for Option<f64> {
	fn from(report: Report) -> Self {
		report.value()
	}
}

/// Reporter judgements: rows are reporters, columns are decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Report>>", into = "Vec<Vec<Report>>")]
pub struct ReportMatrix {
	reporters: usize,
	decisions: usize,
	cells: Vec<Report>,
}

impl ReportMatrix {
	/// Builds a report matrix from its rows.
	///
	/// The matrix must be non-empty and rectangular, and every present value
	/// must be finite.
	pub fn new(rows: Vec<Vec<Report>>) -> Result<Self, ConsensusError> {
		let reporters = rows.len();
		let decisions = rows.first().map_or(0, |row| row.len());
		if reporters == 0 || decisions == 0 {
			return Err(ConsensusError::InvalidInput(
				"Report matrix must have at least one reporter and one decision.".to_string(),
			));
		}

		let mut cells = Vec::with_capacity(reporters * decisions);
		for (i, row) in rows.into_iter().enumerate() {
			if row.len() != decisions {
				return Err(ConsensusError::InvalidInput(format!(
					"Reporter {} submitted {} reports, expected {}.",
					i,
					row.len(),
					decisions
				)));
			}

			for (j, report) in row.into_iter().enumerate() {
				if let Report::Present(value) = report {
					if !value.is_finite() {
						return Err(ConsensusError::InvalidInput(format!(
							"Report of reporter {} on decision {} is not finite.",
							i, j
						)));
					}
				}
				cells.push(report);
			}
		}

		Ok(Self { reporters, decisions, cells })
	}

	/// Builds a report matrix from optional values, `None` being a missing report.
	pub fn from_options(rows: Vec<Vec<Option<f64>>>) -> Result<Self, ConsensusError> {
		Self::new(rows.into_iter().map(|row| row.into_iter().map(Report::from).collect()).collect())
	}

	/// Number of reporters (rows).
	pub fn num_reporters(&self) -> usize {
		self.reporters
	}

	/// Number of decisions (columns).
	pub fn num_decisions(&self) -> usize {
		self.decisions
	}

	/// The report of `reporter` on `decision`.
	pub fn get(&self, reporter: usize, decision: usize) -> Report {
		self.cells[reporter * self.decisions + decision]
	}

	/// All reports of a single reporter.
	pub fn row(&self, reporter: usize) -> &[Report] {
		let start = reporter * self.decisions;
		&self.cells[start..start + self.decisions]
	}

	/// All reports on a single decision, in reporter order.
	pub fn column(&self, decision: usize) -> impl Iterator<Item = Report> + '_ {
		self.cells.iter().skip(decision).step_by(self.decisions).copied()
	}

	/// Whether any report is missing.
	pub fn has_missing(&self) -> bool {
		self.cells.iter().any(Report::is_missing)
	}

	/// Number of decisions `reporter` skipped.
	pub fn missing_in_row(&self, reporter: usize) -> usize {
		self.row(reporter).iter().filter(|r| r.is_missing()).count()
	}

	/// Number of reporters who skipped `decision`.
	pub fn missing_in_column(&self, decision: usize) -> usize {
		self.column(decision).filter(Report::is_missing).count()
	}

	/// Applies `f(decision, value)` to every present report, leaving gaps untouched.
	pub fn map_present<F: Fn(usize, f64) -> f64>(&self, f: F) -> Self {
		let cells = self
			.cells
			.iter()
			.enumerate()
			.map(|(k, report)| match report {
				Report::Present(value) => Report::Present(f(k % self.decisions, *value)),
				Report::Missing => Report::Missing,
			})
			.collect();

		Self { reporters: self.reporters, decisions: self.decisions, cells }
	}

	/// Fills every missing cell with `fill(decision)` and returns the dense result.
	pub fn fill<F: Fn(usize) -> f64>(&self, fill: F) -> Matrix {
		let data = self
			.cells
			.iter()
			.enumerate()
			.map(|(k, report)| match report {
				Report::Present(value) => *value,
				Report::Missing => fill(k % self.decisions),
			})
			.collect();

		Matrix { rows: self.reporters, cols: self.decisions, data }
	}

	/// Converts a gap-free report matrix into a dense matrix.
	pub fn to_dense(&self) -> Result<Matrix, ConsensusError> {
		if self.has_missing() {
			return Err(ConsensusError::InvalidInput(
				"Report matrix still has missing reports.".to_string(),
			));
		}
		Ok(self.fill(|_| 0.0))
	}
}

impl TryFrom<Vec<Vec<Report>>> for ReportMatrix {
	type Error = ConsensusError;

	fn try_from(rows: Vec<Vec<Report>>) -> Result<Self, Self::Error> {
		Self::new(rows)
	}
}

impl From<ReportMatrix> for Vec<Vec<Report>> {
	fn from(matrix: ReportMatrix) -> Self {
		matrix.cells.chunks(matrix.decisions).map(|row| row.to_vec()).collect()
	}
}

/// Dense row-major matrix of reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Matrix {
	rows: usize,
	cols: usize,
	data: Vec<f64>,
}

impl Matrix {
	/// Builds a dense matrix from its rows.
	pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ConsensusError> {
		let cols = rows.first().map_or(0, |row| row.len());
		if rows.is_empty() || cols == 0 || rows.iter().any(|row| row.len() != cols) {
			return Err(ConsensusError::InvalidInput(
				"Matrix must be non-empty and rectangular.".to_string(),
			));
		}

		Ok(Self { rows: rows.len(), cols, data: rows.concat() })
	}

	/// Number of rows.
	pub fn rows(&self) -> usize {
		self.rows
	}

	/// Number of columns.
	pub fn cols(&self) -> usize {
		self.cols
	}

	/// Element at `(i, j)`.
	pub fn get(&self, i: usize, j: usize) -> f64 {
		self.data[i * self.cols + j]
	}

	/// Overwrites the element at `(i, j)`.
	pub fn set(&mut self, i: usize, j: usize, value: f64) {
		self.data[i * self.cols + j] = value;
	}

	/// Row `i`.
	pub fn row(&self, i: usize) -> &[f64] {
		&self.data[i * self.cols..(i + 1) * self.cols]
	}

	/// Column `j`, copied out.
	pub fn column(&self, j: usize) -> Vec<f64> {
		self.data.iter().skip(j).step_by(self.cols).copied().collect()
	}

	/// Row-weighted column sums, `wᵀ M`.
	pub fn weighted_column_sums(&self, weights: &[f64]) -> Vec<f64> {
		let mut sums = vec![0.0; self.cols];
		for (i, w) in weights.iter().enumerate().take(self.rows) {
			for (sum, x) in sums.iter_mut().zip(self.row(i)) {
				*sum += w * x;
			}
		}
		sums
	}
}

impl TryFrom<Vec<Vec<f64>>> for Matrix {
	type Error = ConsensusError;

	fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
		Self::from_rows(rows)
	}
}

impl From<Matrix> for Vec<Vec<f64>> {
	fn from(matrix: Matrix) -> Self {
		matrix.data.chunks(matrix.cols).map(|row| row.to_vec()).collect()
	}
}
