use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{Scaler, check_dimensions, validate_params};
use crate::{
    error::ScalingError,
    pre_processor::{NormalizedVector, RawVector},
};

/// Standardization with fitted statistics: `(x - mean) / scale`.
///
/// Zero entries in `scale` are treated as 1, so constant training features pass
/// through centred but unscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StandardParams", into = "StandardParams")]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

/// On-disk layout, named after the fitted attributes (`mean_`, `scale_`).
#[derive(Serialize, Deserialize)]
struct StandardParams {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ScalingError> {
        validate_params(("mean", mean.as_slice()), ("scale", scale.as_slice()))?;

        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect::<Array1<f64>>();
        Ok(Self {
            mean: Array1::from(mean),
            scale,
        })
    }

    #[must_use]
    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    #[must_use]
    pub fn scale(&self) -> ArrayView1<'_, f64> {
        self.scale.view()
    }
}

impl Scaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, vector: &RawVector) -> Result<NormalizedVector, ScalingError> {
        check_dimensions(self.n_features(), vector.len())?;
        let scaled = (&vector.view() - &self.mean) / &self.scale;
        Ok(NormalizedVector::from_scaled(scaled))
    }
}

impl TryFrom<StandardParams> for StandardScaler {
    type Error = ScalingError;

    fn try_from(params: StandardParams) -> Result<Self, Self::Error> {
        Self::new(params.mean, params.scale)
    }
}

impl From<StandardScaler> for StandardParams {
    fn from(scaler: StandardScaler) -> Self {
        Self {
            mean: scaler.mean.to_vec(),
            scale: scaler.scale.to_vec(),
        }
    }
}
