//! Error taxonomy for loading a bundle and running a prediction.
//!
//! [`ArtifactLoadError`] is fatal at start-up. Everything else is a
//! per-request failure, surfaced through [`PredictError`].

use std::{io, path::PathBuf};

use thiserror::Error;
pub use will_it_rain_preprocessing::{
    AssemblyError, FeatureOrderError, MissingFeatureError, NonFiniteFeatureError, ScalingError,
};

use crate::model::ArtifactKind;

/// The bundle could not be loaded; no prediction may be served.
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("{kind} artifact not found at {}", .path.display())]
    Missing { kind: ArtifactKind, path: PathBuf },

    #[error("failed to read {kind} artifact {}", .path.display())]
    Io {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {kind} artifact {} as JSON", .path.display())]
    Json {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode {kind} artifact {} as bincode", .path.display())]
    Bincode {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: bincode::error::DecodeError,
    },

    #[error("unsupported format `{extension}` for {kind} artifact {}", .path.display())]
    UnsupportedFormat {
        kind: ArtifactKind,
        path: PathBuf,
        extension: String,
    },

    #[cfg(feature = "onnx")]
    #[error("failed to load ONNX {kind} artifact {}", .path.display())]
    Onnx {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: ort::Error,
    },
}

impl ArtifactLoadError {
    /// Which artifact of the bundle failed.
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Missing { kind, .. }
            | Self::Io { kind, .. }
            | Self::Json { kind, .. }
            | Self::Bincode { kind, .. }
            | Self::UnsupportedFormat { kind, .. } => *kind,
            #[cfg(feature = "onnx")]
            Self::Onnx { kind, .. } => *kind,
        }
    }
}

/// Fitted parameters that cannot describe a working model or decoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvalidArtifactError(pub(crate) String);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("classifier expects {expected} features but received {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("classifier returned no class probabilities")]
    EmptyProbabilities,

    #[error("classifier returned invalid probability {value} for class {class_id}")]
    InvalidProbability { class_id: usize, value: f64 },

    #[error("class probabilities sum to {sum}, not 1")]
    ProbabilitySum { sum: f64 },

    #[error("predicted class {class_id} is outside the {n_classes} scored classes")]
    ClassOutOfRange { class_id: usize, n_classes: usize },

    #[error("predicted class {class_id} is less probable than class {argmax}")]
    Inconsistent { class_id: usize, argmax: usize },

    #[error("model failure: {0}")]
    Model(String),
}

/// The label decoder cannot turn the predicted class into a rainfall label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownClassError {
    #[error("label decoder has no class {class_id} (fitted on {n_classes})")]
    OutOfRange { class_id: usize, n_classes: usize },

    #[error("label decoder was fitted on {decoder} classes but the classifier scored {classifier}")]
    CardinalityMismatch { decoder: usize, classifier: usize },

    #[error("class {class_id} decodes to `{name}`, which is not a rainfall label")]
    Unrecognized { class_id: usize, name: String },
}

/// A single request failed; the bundle is still usable for other requests.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error(transparent)]
    MissingFeature(#[from] MissingFeatureError),

    #[error(transparent)]
    NonFiniteFeature(#[from] NonFiniteFeatureError),

    #[error(transparent)]
    Scaling(#[from] ScalingError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    UnknownClass(#[from] UnknownClassError),
}

impl From<AssemblyError> for PredictError {
    fn from(err: AssemblyError) -> Self {
        match err {
            AssemblyError::Missing(err) => Self::MissingFeature(err),
            AssemblyError::NonFinite(err) => Self::NonFiniteFeature(err),
        }
    }
}
