mod min_max;
mod standard;

pub use min_max::MinMaxScaler;
use serde::{Deserialize, Serialize};
pub use standard::StandardScaler;
use tracing::debug;

use crate::{
    error::ScalingError,
    pre_processor::{NormalizedVector, RawVector},
};

/// A fitted, deterministic per-feature transform.
///
/// Implementations must preserve vector length and order.
pub trait Scaler: Send + Sync {
    /// Dimensionality the scaler was fitted on.
    fn n_features(&self) -> usize;

    fn transform(&self, vector: &RawVector) -> Result<NormalizedVector, ScalingError>;
}

/// Scaling stage: checks the vector against the scaler's fitted
/// dimensionality, then applies it.
pub fn normalize<S: Scaler + ?Sized>(
    vector: &RawVector,
    scaler: &S,
) -> Result<NormalizedVector, ScalingError> {
    check_dimensions(scaler.n_features(), vector.len())?;

    let normalized = scaler.transform(vector)?;
    check_dimensions(vector.len(), normalized.len())?;

    debug!(num_features = normalized.len(), "Normalized feature vector");
    Ok(normalized)
}

pub(crate) fn check_dimensions(expected: usize, actual: usize) -> Result<(), ScalingError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ScalingError::DimensionMismatch { expected, actual })
    }
}

/// Any scaler that can be stored as a bundle artifact.
///
/// Externally tagged so the same representation works for JSON and bincode:
/// `{"standard": {"mean": [...], "scale": [...]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FittedScaler {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

impl Scaler for FittedScaler {
    fn n_features(&self) -> usize {
        match self {
            Self::Standard(scaler) => scaler.n_features(),
            Self::MinMax(scaler) => scaler.n_features(),
        }
    }

    fn transform(&self, vector: &RawVector) -> Result<NormalizedVector, ScalingError> {
        match self {
            Self::Standard(scaler) => scaler.transform(vector),
            Self::MinMax(scaler) => scaler.transform(vector),
        }
    }
}

impl From<StandardScaler> for FittedScaler {
    fn from(scaler: StandardScaler) -> Self {
        Self::Standard(scaler)
    }
}

impl From<MinMaxScaler> for FittedScaler {
    fn from(scaler: MinMaxScaler) -> Self {
        Self::MinMax(scaler)
    }
}

/// Shared validation for fitted parameter pairs.
fn validate_params(
    first: (&str, &[f64]),
    second: (&str, &[f64]),
) -> Result<(), ScalingError> {
    let (first_name, first_values) = first;
    let (second_name, second_values) = second;

    if first_values.is_empty() {
        return Err(ScalingError::InvalidParameters(format!(
            "`{first_name}` is empty"
        )));
    }
    if first_values.len() != second_values.len() {
        return Err(ScalingError::InvalidParameters(format!(
            "`{first_name}` has {} entries but `{second_name}` has {}",
            first_values.len(),
            second_values.len()
        )));
    }
    for (name, values) in [first, second] {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ScalingError::InvalidParameters(format!(
                "`{name}[{index}]` is not finite"
            )));
        }
    }
    Ok(())
}
