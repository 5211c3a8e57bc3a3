use std::fmt;

use ahash::HashSet;
use serde::{Deserialize, Serialize};

use crate::error::FeatureOrderError;

/// Canonical ordering of model input features.
///
/// Validated on construction (and on deserialization): at least one name and
/// no duplicates. The scaler and classifier are positional, so this is the
/// only place feature names carry meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureOrder {
    names: Vec<String>,
}

impl FeatureOrder {
    pub fn new<I, S>(names: I) -> Result<Self, FeatureOrderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect::<Vec<String>>();
        if names.is_empty() {
            return Err(FeatureOrderError::Empty);
        }

        let mut seen = HashSet::default();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(FeatureOrderError::Duplicate(name.clone()));
            }
        }
        Ok(Self { names })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a validated order; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Index of `name` in the model input, if the model uses it at all.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl TryFrom<Vec<String>> for FeatureOrder {
    type Error = FeatureOrderError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<FeatureOrder> for Vec<String> {
    fn from(order: FeatureOrder) -> Self {
        order.names
    }
}

impl fmt::Display for FeatureOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}
