//! # Error Module.
//!
//! This module features the `ConsensusError` enum for error handling throughout the project.

use thiserror::Error;

/// The crate-wide error variants.
///
/// Every variant is terminal for the round that raised it. A round is a pure
/// function of its inputs, so resubmitting the same input fails the same way.
#[derive(Debug, Error)]
pub enum ConsensusError {
	/// Shape or dimension mismatch, malformed scale range or out-of-range parameter
	#[error("InvalidInput: {0}")]
	InvalidInput(String),

	/// Zero-sum weighting vector presented where normalization is required
	#[error("DegenerateWeights: {0}")]
	DegenerateWeights(String),

	/// A decision column without a single respondent
	#[error("InsufficientData: {0}")]
	InsufficientData(String),

	/// The principal component could not be extracted
	#[error("NumericalFailure: {0}")]
	NumericalFailure(String),

	/// File read/write error
	#[error("FileIOError: {0}")]
	FileIOError(String),

	/// Input/output error
	#[error("IOError: {0}")]
	IOError(std::io::Error),

	/// Parsing error
	#[error("ParsingError: {0}")]
	ParsingError(String),
}
