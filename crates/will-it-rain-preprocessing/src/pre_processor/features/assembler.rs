use tracing::debug;

use super::{FeatureOrder, RawVector, WeatherReading};
use crate::error::{AssemblyError, MissingFeatureError, NonFiniteFeatureError};

/// Reorders a reading into the model's positional input.
///
/// `vector[i]` is `reading[order[i]]`. Every name in `order` must be present;
/// a missing value is never defaulted. Values must be finite; missing names
/// are reported ahead of non-finite values. Keys the model does not use are
/// ignored.
pub fn assemble(reading: &WeatherReading, order: &FeatureOrder) -> Result<RawVector, AssemblyError> {
    let mut values = Vec::with_capacity(order.len());
    let mut missing = Vec::new();
    let mut non_finite = None;

    for name in order.iter() {
        match reading.get(name) {
            Some(value) => {
                if !value.is_finite() && non_finite.is_none() {
                    non_finite = Some(NonFiniteFeatureError::new(name, value));
                }
                values.push(value);
            }
            None => missing.push(name.to_owned()),
        }
    }

    if !missing.is_empty() {
        debug!(?missing, "Rejecting reading with missing features");
        return Err(MissingFeatureError::new(missing).into());
    }
    if let Some(err) = non_finite {
        debug!(feature = err.feature(), "Rejecting reading with a non-finite value");
        return Err(err.into());
    }

    let ignored = reading.len() - values.len();
    if ignored > 0 {
        debug!(ignored, "Reading carries features the model does not use");
    }

    debug!(num_features = values.len(), "Assembled raw feature vector");
    Ok(RawVector::new(values))
}
