//! Top-N truncated categorical sampling

use rand::Rng;
use thiserror::Error;

/// Number of candidates kept when the caller does not choose one
pub const DEFAULT_TOP_N: usize = 10;

/// Errors that can occur while sampling
#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("degenerate distribution: surviving mass {mass} cannot be renormalized")]
    DegenerateDistribution { mass: f64 },
}

/// Keep the `top_n` largest masses of `probs` and renormalize them
///
/// Every entry equal to the `top_n`-th largest value survives, so ties at the
/// cutoff can keep more than `top_n` indices. When `top_n` exceeds the length
/// of `probs` nothing is truncated.
///
/// # Errors
/// * [`SampleError::InvalidArgument`] if `top_n` is 0, `probs` is empty, or an
///   entry is negative or not finite
/// * [`SampleError::DegenerateDistribution`] if the surviving mass is not positive
pub fn truncate_top_n(probs: &[f32], top_n: usize) -> Result<Vec<f64>, SampleError> {
    if top_n == 0 {
        return Err(SampleError::InvalidArgument(
            "top_n must be at least 1".to_string(),
        ));
    }
    if probs.is_empty() {
        return Err(SampleError::InvalidArgument(
            "probability vector is empty".to_string(),
        ));
    }
    if let Some((index, &p)) = probs
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p < 0.0)
    {
        return Err(SampleError::InvalidArgument(format!(
            "probability at index {index} is {p}"
        )));
    }

    let mut sorted: Vec<f32> = probs.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let cutoff = sorted[top_n.min(sorted.len()) - 1];

    let kept: Vec<f64> = probs
        .iter()
        .map(|&p| if p >= cutoff { f64::from(p) } else { 0.0 })
        .collect();

    let mass: f64 = kept.iter().sum();
    if mass <= 0.0 {
        return Err(SampleError::DegenerateDistribution { mass });
    }

    Ok(kept.into_iter().map(|p| p / mass).collect())
}

/// Index of the first entry whose cumulative mass exceeds `u`
///
/// `normalized` must sum to 1. Rounding can leave the total a hair under `u`;
/// the last entry with mass is returned then.
pub fn select_index(normalized: &[f64], u: f64) -> usize {
    let mut cumulative = 0.0;
    let mut last_with_mass = 0;
    for (i, &p) in normalized.iter().enumerate() {
        if p > 0.0 {
            last_with_mass = i;
        }
        cumulative += p;
        if cumulative > u {
            return i;
        }
    }
    last_with_mass
}

/// Draw one index from `probs` restricted to its `top_n` largest masses
///
/// # Arguments
/// * `probs` - Non-negative, not necessarily normalized, masses
/// * `top_n` - Number of largest masses to keep
/// * `rng` - Source of the uniform draw in `[0, 1)`
///
/// # Returns
/// An index into `probs`
pub fn sample_from_probs<R: Rng>(
    probs: &[f32],
    top_n: usize,
    rng: &mut R,
) -> Result<usize, SampleError> {
    let normalized = truncate_top_n(probs, top_n)?;
    let u: f64 = rng.gen();
    Ok(select_index(&normalized, u))
}
