//! Shared fixture bundle for unit tests.

use will_it_rain_preprocessing::{FeatureOrder, StandardScaler, WEATHER_FEATURES, WeatherReading};

use crate::model::{ArtifactBundle, LabelEncoder, LogisticRegression};

pub(crate) const MEAN: [f64; 10] = [1013.6, 26.2, 23.7, 22.1, 19.9, 80.2, 71.1, 4.4, 101.0, 21.5];
pub(crate) const SCALE: [f64; 10] = [5.65, 5.9, 5.6, 5.6, 5.9, 7.1, 21.6, 3.9, 81.8, 10.0];
pub(crate) const COEF: [f64; 10] = [-0.15, -0.10, 0.05, 0.08, 0.30, 0.55, 1.10, -0.85, 0.02, 0.12];
pub(crate) const INTERCEPT: f64 = 1.05;

/// Confidence for [`default_reading`] against [`fixture_bundle`] (`no_rain`).
pub(crate) const DEFAULT_CONFIDENCE: f64 = 81.216_349_743_847_74;
/// Confidence for [`overcast_reading`] (`rain`).
pub(crate) const OVERCAST_CONFIDENCE: f64 = 98.896_791_227_132_83;

pub(crate) fn fixture_bundle() -> ArtifactBundle {
    ArtifactBundle::new(
        LogisticRegression::new(vec![COEF.to_vec()], vec![INTERCEPT]).unwrap(),
        StandardScaler::new(MEAN.to_vec(), SCALE.to_vec()).unwrap(),
        LabelEncoder::new(["no", "yes"]).unwrap(),
        FeatureOrder::new(WEATHER_FEATURES).unwrap(),
    )
}

/// The documented form defaults.
pub(crate) fn default_reading() -> WeatherReading {
    WeatherReading::new()
        .with("pressure", 1015.0)
        .with("maxtemp", 22.0)
        .with("temparature", 18.0)
        .with("mintemp", 15.0)
        .with("dewpoint", 12.0)
        .with("humidity", 70.0)
        .with("cloud", 50.0)
        .with("sunshine", 5.0)
        .with("winddirection", 180.0)
        .with("windspeed", 20.0)
}

pub(crate) fn overcast_reading() -> WeatherReading {
    default_reading()
        .with("cloud", 100.0)
        .with("sunshine", 0.0)
        .with("humidity", 100.0)
}
