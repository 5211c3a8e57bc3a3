mod assembler;
mod order;
mod reading;
mod vector;

pub use assembler::assemble;
pub use order::FeatureOrder;
pub use reading::WeatherReading;
pub use vector::{FeatureVector, Normalized, NormalizedVector, Raw, RawVector};

/// Names of the weather measurements a prediction request carries.
///
/// This is the request shape, not the model's input order: positional order
/// always comes from the bundle's [`FeatureOrder`].
pub const WEATHER_FEATURES: [&str; 10] = [
    "pressure",
    "maxtemp",
    "temparature",
    "mintemp",
    "dewpoint",
    "humidity",
    "cloud",
    "sunshine",
    "winddirection",
    "windspeed",
];
