//! Errors raised while assembling and scaling feature vectors.

use thiserror::Error;

/// The reading did not carry every feature named by the feature order.
///
/// Lists all absent names, in feature order. No partially filled vector is
/// ever produced alongside this error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("weather reading is missing required feature(s): {}", .missing.join(", "))]
pub struct MissingFeatureError {
    missing: Vec<String>,
}

impl MissingFeatureError {
    pub(crate) fn new(missing: Vec<String>) -> Self {
        debug_assert!(!missing.is_empty(), "at least one feature must be missing");
        Self { missing }
    }

    /// Names of the absent features.
    #[must_use]
    pub fn missing(&self) -> &[String] {
        &self.missing
    }
}

/// A feature was present but carried NaN or an infinity.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("feature `{feature}` has non-finite value {value}")]
pub struct NonFiniteFeatureError {
    feature: String,
    value: f64,
}

impl NonFiniteFeatureError {
    pub(crate) fn new(feature: impl Into<String>, value: f64) -> Self {
        Self {
            feature: feature.into(),
            value,
        }
    }

    #[must_use]
    pub fn feature(&self) -> &str {
        &self.feature
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Why a reading could not be assembled into a raw vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Missing(#[from] MissingFeatureError),

    #[error(transparent)]
    NonFinite(#[from] NonFiniteFeatureError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScalingError {
    /// The vector length differs from the dimensionality the scaler was fitted on.
    #[error("scaler was fitted on {expected} features but received a vector of {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The fitted parameters themselves are unusable.
    #[error("invalid scaler parameters: {0}")]
    InvalidParameters(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureOrderError {
    #[error("feature order is empty")]
    Empty,

    #[error("feature `{0}` appears more than once in the feature order")]
    Duplicate(String),
}
