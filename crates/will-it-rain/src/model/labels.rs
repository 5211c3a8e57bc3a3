use std::fmt;

use ahash::HashSet;
use serde::{Deserialize, Serialize};

use crate::error::InvalidArtifactError;

/// Maps class ids produced by the classifier back to class names.
pub trait LabelDecoder: Send + Sync {
    /// Number of classes the decoder was fitted on.
    fn n_classes(&self) -> usize;

    fn class_name(&self, class_id: usize) -> Option<&str>;
}

/// Fitted label encoder: `classes[i]` is the name of class id `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LabelParams", into = "LabelParams")]
pub struct LabelEncoder {
    classes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct LabelParams {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new<I, S>(classes: I) -> Result<Self, InvalidArtifactError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes = classes.into_iter().map(Into::into).collect::<Vec<String>>();
        if classes.is_empty() {
            return Err(InvalidArtifactError("label encoder has no classes".into()));
        }
        let mut seen = HashSet::default();
        for class in &classes {
            if class.is_empty() {
                return Err(InvalidArtifactError("label encoder has an empty class name".into()));
            }
            if !seen.insert(class.as_str()) {
                return Err(InvalidArtifactError(format!(
                    "label encoder lists class `{class}` more than once"
                )));
            }
        }
        Ok(Self { classes })
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

impl LabelDecoder for LabelEncoder {
    fn n_classes(&self) -> usize {
        self.classes.len()
    }

    fn class_name(&self, class_id: usize) -> Option<&str> {
        self.classes.get(class_id).map(String::as_str)
    }
}

impl TryFrom<LabelParams> for LabelEncoder {
    type Error = InvalidArtifactError;

    fn try_from(params: LabelParams) -> Result<Self, Self::Error> {
        Self::new(params.classes)
    }
}

impl From<LabelEncoder> for LabelParams {
    fn from(encoder: LabelEncoder) -> Self {
        Self {
            classes: encoder.classes,
        }
    }
}

/// The semantic outcome of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RainfallLabel {
    Rain,
    NoRain,
}

impl RainfallLabel {
    /// Interprets a decoder class name, ignoring case and surrounding
    /// whitespace.
    #[must_use]
    pub fn from_class_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "yes" | "rain" | "1" | "true" => Some(Self::Rain),
            "no" | "no_rain" | "0" | "false" => Some(Self::NoRain),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rain => "rain",
            Self::NoRain => "no_rain",
        }
    }

    #[must_use]
    pub fn is_rain(self) -> bool {
        self == Self::Rain
    }
}

impl fmt::Display for RainfallLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
