mod forest;
mod logistic;
#[cfg(feature = "onnx")]
mod onnx;

pub use forest::{ForestTree, RandomForest, TreeNode};
pub use logistic::LogisticRegression;
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
use serde::{Deserialize, Serialize};
use will_it_rain_preprocessing::NormalizedVector;

use crate::error::InferenceError;

/// A trained model over the normalized feature space.
///
/// `predict` must return the index of the most probable class reported by
/// `predict_probability`.
pub trait Classifier: Send + Sync {
    /// Input dimensionality, when the model declares one.
    fn n_features(&self) -> Option<usize>;

    fn predict(&self, vector: &NormalizedVector) -> Result<usize, InferenceError>;

    /// Probability per class id; sums to 1.
    fn predict_probability(&self, vector: &NormalizedVector) -> Result<Vec<f64>, InferenceError>;

    /// Both outputs for one input. Models that produce them in a single run
    /// override this.
    fn score(&self, vector: &NormalizedVector) -> Result<(usize, Vec<f64>), InferenceError> {
        Ok((self.predict(vector)?, self.predict_probability(vector)?))
    }
}

/// Serde-backed classifier artifacts, tagged by model family:
/// `{"logistic_regression": {...}}` or `{"random_forest": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierArtifact {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

impl ClassifierArtifact {
    fn inner(&self) -> &dyn Classifier {
        match self {
            Self::LogisticRegression(model) => model,
            Self::RandomForest(model) => model,
        }
    }
}

impl Classifier for ClassifierArtifact {
    fn n_features(&self) -> Option<usize> {
        self.inner().n_features()
    }

    fn predict(&self, vector: &NormalizedVector) -> Result<usize, InferenceError> {
        self.inner().predict(vector)
    }

    fn predict_probability(&self, vector: &NormalizedVector) -> Result<Vec<f64>, InferenceError> {
        self.inner().predict_probability(vector)
    }

    fn score(&self, vector: &NormalizedVector) -> Result<(usize, Vec<f64>), InferenceError> {
        self.inner().score(vector)
    }
}

impl From<LogisticRegression> for ClassifierArtifact {
    fn from(model: LogisticRegression) -> Self {
        Self::LogisticRegression(model)
    }
}

impl From<RandomForest> for ClassifierArtifact {
    fn from(model: RandomForest) -> Self {
        Self::RandomForest(model)
    }
}

/// Index of the first maximum. `None` for an empty slice.
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (index, &value)| match best {
            Some((_, best_value)) if best_value >= value => best,
            _ => Some((index, value)),
        })
        .map(|(index, _)| index)
}

fn check_dimensions(expected: usize, vector: &NormalizedVector) -> Result<(), InferenceError> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(InferenceError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}
