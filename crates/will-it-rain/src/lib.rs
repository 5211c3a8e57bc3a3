//! # will-it-rain
//!
//! Rainfall prediction from a single day's weather readings.
//!
//! A pre-trained artifact bundle (feature order, scaler, classifier and label
//! decoder) is loaded once; every request then runs the same fixed pipeline:
//! assemble the reading into the model's feature order, scale it, score it,
//! and decode the winning class into a [`RainfallLabel`] with a confidence.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use will_it_rain::{ArtifactLayout, Predictor, WeatherReading};
//!
//! let predictor = Predictor::load(&ArtifactLayout::new("models"))?;
//!
//! let reading = WeatherReading::new()
//!     .with("pressure", 1015.0)
//!     .with("maxtemp", 22.0)
//!     .with("temparature", 18.0)
//!     .with("mintemp", 15.0)
//!     .with("dewpoint", 12.0)
//!     .with("humidity", 70.0)
//!     .with("cloud", 50.0)
//!     .with("sunshine", 5.0)
//!     .with("winddirection", 180.0)
//!     .with("windspeed", 20.0);
//!
//! let result = predictor.predict(&reading)?;
//! println!("{}: {:.2}%", result.label(), result.confidence_percent());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Versioned Artifacts
//!
//! ```rust,no_run
//! use will_it_rain::{ArtifactKind, ArtifactLayout, Predictor};
//!
//! // Reads models/2024-06/{classifier.onnx, scaler.json, ...}
//! let layout = ArtifactLayout::new("models")
//!     .with_version("2024-06")
//!     .with_file_name(ArtifactKind::Classifier, "classifier.onnx");
//! let predictor = Predictor::load(&layout)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Batch Processing
//!
//! ```rust,no_run
//! use will_it_rain::{Predictor, WeatherReading};
//!
//! let predictor = Predictor::load_from_dir("models")?;
//! let readings: Vec<WeatherReading> = serde_json::from_str(&std::fs::read_to_string("readings.json")?)?;
//! for result in predictor.predict_batch(&readings) {
//!     match result {
//!         Ok(result) => println!("{result}"),
//!         Err(err) => eprintln!("rejected: {err}"),
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[cfg(feature = "cli")]
pub mod cli;

pub mod error;
pub mod model;
pub mod pipeline;

#[cfg(test)]
mod test_support;

use std::{path::Path, sync::Arc};

pub use error::{
    ArtifactLoadError, InferenceError, InvalidArtifactError, MissingFeatureError,
    NonFiniteFeatureError, PredictError, ScalingError, UnknownClassError,
};
pub use model::{
    ArtifactBundle, ArtifactKind, ArtifactLayout, Classifier, LabelDecoder, ModelMetadata,
    RainfallLabel,
};
pub use pipeline::{PROBABILITY_TOLERANCE, PredictionResult};
use rayon::prelude::*;
pub use will_it_rain_preprocessing::{FeatureOrder, Scaler, WEATHER_FEATURES, WeatherReading};

/// Entry point for predictions against a loaded bundle.
///
/// Cloning is cheap: clones share the same bundle.
///
/// # Examples
///
/// ```rust,no_run
/// use will_it_rain::{Predictor, WeatherReading};
///
/// let predictor = Predictor::load_from_dir("models")?;
/// let reading: WeatherReading = serde_json::from_str(r#"{"pressure": 1015.0, "cloud": 80}"#)?;
///
/// // Fails: the reading is missing most features.
/// assert!(predictor.predict(&reading).is_err());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Predictor {
    bundle: Arc<ArtifactBundle>,
}

impl Predictor {
    /// Create a predictor around an already loaded bundle.
    #[must_use]
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self {
            bundle: Arc::new(bundle),
        }
    }

    /// Load the bundle described by `layout`.
    pub fn load(layout: &ArtifactLayout) -> Result<Self, ArtifactLoadError> {
        ArtifactBundle::load(layout).map(Self::new)
    }

    /// Load a bundle with the default file names from `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        ArtifactBundle::load_from_dir(dir).map(Self::new)
    }

    #[must_use]
    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    /// Predict rainfall for a single reading.
    pub fn predict(&self, reading: &WeatherReading) -> Result<PredictionResult, PredictError> {
        pipeline::run(&self.bundle, reading)
    }

    /// Predict rainfall for many readings in parallel.
    ///
    /// Returns one result per reading, in input order. A failing reading does
    /// not affect the others.
    pub fn predict_batch(
        &self,
        readings: &[WeatherReading],
    ) -> Vec<Result<PredictionResult, PredictError>> {
        readings
            .par_iter()
            .map(|reading| self.predict(reading))
            .collect()
    }
}

impl From<ArtifactBundle> for Predictor {
    fn from(bundle: ArtifactBundle) -> Self {
        Self::new(bundle)
    }
}
