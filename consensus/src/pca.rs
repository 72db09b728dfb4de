//! # Reputation PCA Module.
//!
//! Derives updated reputations from the dominant axis of disagreement in the
//! report matrix.
//!
//! The reports are centred and weighted by reputation, and the first principal
//! component of their covariance is extracted. Each reporter's score on that
//! component measures how far they sit from the reputation-weighted consensus
//! along the direction that splits reporters the most. The score vector is
//! shifted to one sign, anchored to the status quo, corrected for additivity
//! and blended into the previous reputation.

use crate::{
	diagnostics::{DiagnosticSink, RoundEvent},
	error::ConsensusError,
	matrix::Matrix,
	weights::{mean, normalize},
};
use serde::{Deserialize, Serialize};

/// Upper bound on Jacobi sweeps before giving up.
const MAX_SWEEPS: usize = 64;
/// Sweeps after which negligible off-diagonal elements are zeroed outright.
const ZEROING_SWEEP: usize = 4;

/// First principal component of a weighted report matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalComponent {
	/// Per-decision loading; magnitude shows how strongly the decision divides reporters.
	pub loading: Vec<f64>,
	/// Per-reporter signed projection onto the loading.
	pub scores: Vec<f64>,
}

/// Reputation update of a single round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationUpdate {
	/// Loading of the first principal component.
	pub first_loading: Vec<f64>,
	/// Normalized reputation the round started with.
	pub old_rep: Vec<f64>,
	/// Reputation implied by this round alone.
	pub new_rep: Vec<f64>,
	/// Exponentially smoothed blend of `new_rep` and `old_rep`.
	pub smoothed_rep: Vec<f64>,
}

/// Computes the reputation-weighted first principal component of `matrix`.
///
/// `weights` must already be normalized.
pub fn weighted_principal_component(
	matrix: &Matrix, weights: &[f64],
) -> Result<PrincipalComponent, ConsensusError> {
	let (n, m) = (matrix.rows(), matrix.cols());
	if weights.len() != n {
		return Err(ConsensusError::InvalidInput(format!(
			"Got {} weights for {} reporters.",
			weights.len(),
			n
		)));
	}

	let center = matrix.weighted_column_sums(weights);
	let centered: Vec<Vec<f64>> = (0..n)
		.map(|i| matrix.row(i).iter().zip(&center).map(|(x, mu)| x - mu).collect())
		.collect();

	let mut covariance = vec![vec![0.0; m]; m];
	for (row, w) in centered.iter().zip(weights) {
		for a in 0..m {
			for b in a..m {
				covariance[a][b] += w * row[a] * row[b];
			}
		}
	}
	for a in 0..m {
		for b in 0..a {
			covariance[a][b] = covariance[b][a];
		}
	}

	if covariance.iter().flatten().any(|x| !x.is_finite()) {
		return Err(ConsensusError::NumericalFailure(
			"Weighted covariance has non-finite entries.".to_string(),
		));
	}

	let loading = leading_eigenvector(covariance)?;
	let scores = centered
		.iter()
		.map(|row| row.iter().zip(&loading).map(|(x, l)| x * l).sum())
		.collect();

	Ok(PrincipalComponent { loading, scores })
}

/// Eigenvector of the largest eigenvalue of a symmetric matrix.
///
/// Cyclic Jacobi rotations diagonalize the matrix while the rotations are
/// accumulated into the eigenvector basis.
fn leading_eigenvector(mut a: Vec<Vec<f64>>) -> Result<Vec<f64>, ConsensusError> {
	let n = a.len();
	let mut v: Vec<Vec<f64>> =
		(0..n).map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect()).collect();

	let total: f64 = a.iter().flatten().map(|x| x * x).sum();
	let tolerance = (n as f64 * f64::EPSILON).powi(2) * total;

	let mut converged = false;
	for sweep in 0..MAX_SWEEPS {
		let mut off = 0.0;
		for p in 0..n {
			for q in 0..n {
				if p != q {
					off += a[p][q] * a[p][q];
				}
			}
		}
		if off == 0.0 || off <= tolerance {
			converged = true;
			break;
		}

		for p in 0..n {
			for q in p + 1..n {
				let apq = a[p][q];
				if apq == 0.0 {
					continue;
				}

				// Rotation would be lost below the precision of both diagonal entries
				let g = 100.0 * apq.abs();
				if sweep > ZEROING_SWEEP
					&& a[p][p].abs() + g == a[p][p].abs()
					&& a[q][q].abs() + g == a[q][q].abs()
				{
					a[p][q] = 0.0;
					a[q][p] = 0.0;
					continue;
				}

				let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
				let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
				let c = 1.0 / (t * t + 1.0).sqrt();
				let s = t * c;

				for k in 0..n {
					let (akp, akq) = (a[k][p], a[k][q]);
					a[k][p] = c * akp - s * akq;
					a[k][q] = s * akp + c * akq;
				}
				for k in 0..n {
					let (apk, aqk) = (a[p][k], a[q][k]);
					a[p][k] = c * apk - s * aqk;
					a[q][k] = s * apk + c * aqk;
				}
				for k in 0..n {
					let (vkp, vkq) = (v[k][p], v[k][q]);
					v[k][p] = c * vkp - s * vkq;
					v[k][q] = s * vkp + c * vkq;
				}
			}
		}
	}

	if !converged {
		return Err(ConsensusError::NumericalFailure(format!(
			"Eigen decomposition did not converge within {} sweeps.",
			MAX_SWEEPS
		)));
	}

	let mut lead = 0;
	for i in 1..n {
		if a[i][i] > a[lead][lead] {
			lead = i;
		}
	}

	let vector: Vec<f64> = v.iter().map(|row| row[lead]).collect();
	if vector.iter().any(|x| !x.is_finite()) {
		return Err(ConsensusError::NumericalFailure(
			"Principal component has non-finite entries.".to_string(),
		));
	}

	Ok(vector)
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
	a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Computes the reputation update for a complete report matrix.
///
/// The principal axis has no inherent polarity, so two candidates are built
/// by shifting the scores to be entirely nonnegative (`scores + |min|`) or
/// entirely nonpositive (`scores - max`). The candidate whose implied outcomes
/// stay closest, in squared error, to the outcomes implied by the previous
/// reputation wins; ties go to the nonnegative shift. The winner is multiplied
/// by `rep / mean(rep)`, which makes reputation additive: splitting a stake
/// across identities or merging identities does not change its influence.
///
/// When the scores carry no disagreement at all (unanimous reports) the
/// previous reputation is kept as the new one.
pub fn update_reputation(
	matrix: &Matrix, reputation: &[f64], smoothing_rate: f64, sink: &mut dyn DiagnosticSink,
) -> Result<ReputationUpdate, ConsensusError> {
	let old_rep = normalize(reputation)?;
	let component = weighted_principal_component(matrix, &old_rep)?;
	sink.event(&RoundEvent::Component {
		loading: &component.loading,
		scores: &component.scores,
	});

	let scores = &component.scores;
	let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
	let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
	let nonnegative: Vec<f64> = scores.iter().map(|s| s + min.abs()).collect();
	let nonpositive: Vec<f64> = scores.iter().map(|s| s - max).collect();

	let new_rep = if nonpositive.iter().all(|s| *s == 0.0) || nonnegative.iter().all(|s| *s == 0.0)
	{
		sink.event(&RoundEvent::Unanimous);
		old_rep.clone()
	} else {
		let status_quo = matrix.weighted_column_sums(&old_rep);
		let first = matrix.weighted_column_sums(&normalize(&nonnegative)?);
		let second = matrix.weighted_column_sums(&normalize(&nonpositive)?);

		let chose_first =
			squared_distance(&first, &status_quo) <= squared_distance(&second, &status_quo);
		sink.event(&RoundEvent::SignResolved {
			status_quo: &status_quo,
			first: &first,
			second: &second,
			chose_first,
		});

		let chosen = if chose_first { nonnegative } else { nonpositive };
		let mean_rep = mean(&old_rep);
		let additive: Vec<f64> =
			chosen.iter().zip(&old_rep).map(|(c, r)| c * r / mean_rep).collect();

		if additive.iter().all(|x| *x == 0.0) {
			// Only reporters without reputation disagree
			sink.event(&RoundEvent::Unanimous);
			old_rep.clone()
		} else {
			normalize(&additive)?
		}
	};

	let smoothed_rep: Vec<f64> = new_rep
		.iter()
		.zip(&old_rep)
		.map(|(new, old)| smoothing_rate * new + (1.0 - smoothing_rate) * old)
		.collect();
	sink.event(&RoundEvent::ReputationUpdated { new_rep: &new_rep, smoothed_rep: &smoothed_rep });

	Ok(ReputationUpdate { first_loading: component.loading, old_rep, new_rep, smoothed_rep })
}
