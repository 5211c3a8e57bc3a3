//! Pre-processing for will-it-rain.
//!
//! Turns a name-keyed [`WeatherReading`] into the fixed-order vector the
//! classifier was trained on, then applies the fitted scaler to it.
//!
//! ```rust
//! use will_it_rain_preprocessing::{FeatureOrder, StandardScaler, WeatherReading, assemble, normalize};
//!
//! let order = FeatureOrder::new(["humidity", "cloud"])?;
//! let reading = WeatherReading::new().with("cloud", 50.0).with("humidity", 70.0);
//!
//! let raw = assemble(&reading, &order)?;
//! assert_eq!(raw.to_vec(), vec![70.0, 50.0]);
//!
//! let scaler = StandardScaler::new(vec![80.0, 70.0], vec![10.0, 20.0])?;
//! let normalized = normalize(&raw, &scaler)?;
//! assert_eq!(normalized.to_vec(), vec![-1.0, -1.0]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod pre_processor;

pub use error::{
    AssemblyError, FeatureOrderError, MissingFeatureError, NonFiniteFeatureError, ScalingError,
};
pub use pre_processor::{
    FeatureOrder, FeatureVector, FittedScaler, MinMaxScaler, Normalized, NormalizedVector, Raw,
    RawVector, Scaler, StandardScaler, WEATHER_FEATURES, WeatherReading, assemble, normalize,
};
