//! Pre-processing module for will-it-rain
//!
//! Feature assembly (name-keyed reading → ordered raw vector) and scaling
//! (raw vector → normalized vector).

mod features;
mod scaler;

pub use features::{
    FeatureOrder, FeatureVector, Normalized, NormalizedVector, Raw, RawVector, WEATHER_FEATURES,
    WeatherReading, assemble,
};
pub use scaler::{FittedScaler, MinMaxScaler, Scaler, StandardScaler, normalize};
