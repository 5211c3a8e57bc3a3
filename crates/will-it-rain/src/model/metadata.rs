use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Descriptive information shipped alongside a bundle. Not used for scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMetadata {
    pub model_name: String,
    pub version: String,
    pub trained_on: Option<String>,
    /// Evaluation metrics recorded at training time, e.g. `accuracy`.
    pub metrics: BTreeMap<String, f64>,
}

impl fmt::Display for ModelMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.model_name.is_empty() {
            "unnamed model"
        } else {
            &self.model_name
        };
        write!(f, "{name}")?;
        if !self.version.is_empty() {
            write!(f, " v{}", self.version)?;
        }
        if let Some(trained_on) = &self.trained_on {
            write!(f, " (trained on {trained_on})")?;
        }
        for (metric, value) in &self.metrics {
            write!(f, ", {metric}={value:.3}")?;
        }
        Ok(())
    }
}
