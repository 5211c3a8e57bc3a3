use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{Scaler, check_dimensions, validate_params};
use crate::{
    error::ScalingError,
    pre_processor::{NormalizedVector, RawVector},
};

/// Range scaling with fitted parameters: `x * scale + min`.
///
/// `min` and `scale` are the already-derived offsets, not the observed data
/// minimum and range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MinMaxParams", into = "MinMaxParams")]
pub struct MinMaxScaler {
    min: Array1<f64>,
    scale: Array1<f64>,
}

#[derive(Serialize, Deserialize)]
struct MinMaxParams {
    min: Vec<f64>,
    scale: Vec<f64>,
}

impl MinMaxScaler {
    pub fn new(min: Vec<f64>, scale: Vec<f64>) -> Result<Self, ScalingError> {
        validate_params(("min", min.as_slice()), ("scale", scale.as_slice()))?;
        Ok(Self {
            min: Array1::from(min),
            scale: Array1::from(scale),
        })
    }

    #[must_use]
    pub fn min(&self) -> ArrayView1<'_, f64> {
        self.min.view()
    }

    #[must_use]
    pub fn scale(&self) -> ArrayView1<'_, f64> {
        self.scale.view()
    }
}

impl Scaler for MinMaxScaler {
    fn n_features(&self) -> usize {
        self.min.len()
    }

    fn transform(&self, vector: &RawVector) -> Result<NormalizedVector, ScalingError> {
        check_dimensions(self.n_features(), vector.len())?;
        let scaled = &vector.view() * &self.scale + &self.min;
        Ok(NormalizedVector::from_scaled(scaled))
    }
}

impl TryFrom<MinMaxParams> for MinMaxScaler {
    type Error = ScalingError;

    fn try_from(params: MinMaxParams) -> Result<Self, Self::Error> {
        Self::new(params.min, params.scale)
    }
}

impl From<MinMaxScaler> for MinMaxParams {
    fn from(scaler: MinMaxScaler) -> Self {
        Self {
            min: scaler.min.to_vec(),
            scale: scaler.scale.to_vec(),
        }
    }
}
