use std::{marker::PhantomData, ops::Index};

use ndarray::{Array1, ArrayView1};

/// Stage marker: values exactly as assembled from the reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Raw;

/// Stage marker: values after the fitted scaler has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalized;

/// Ordered model input. The stage parameter keeps raw and normalized vectors
/// from being passed where the other is expected.
///
/// Raw vectors come from [`RawVector::new`]; normalized vectors only from
/// [`NormalizedVector::from_scaled`], which scalers call on their output.
///
/// ```compile_fail
/// use will_it_rain_preprocessing::NormalizedVector;
///
/// let normalized = NormalizedVector::new(vec![1.0, 2.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector<S> {
    values: Array1<f64>,
    stage: PhantomData<S>,
}

pub type RawVector = FeatureVector<Raw>;
pub type NormalizedVector = FeatureVector<Normalized>;

impl FeatureVector<Raw> {
    pub fn new(values: impl Into<Array1<f64>>) -> Self {
        Self::with_values(values.into())
    }
}

impl FeatureVector<Normalized> {
    /// Wraps values a [`Scaler`](crate::Scaler) has already transformed.
    ///
    /// Meant for `Scaler` implementations; pipeline code gets normalized
    /// vectors from [`normalize`](crate::normalize).
    pub fn from_scaled(values: impl Into<Array1<f64>>) -> Self {
        Self::with_values(values.into())
    }
}

impl<S> FeatureVector<S> {
    fn with_values(values: Array1<f64>) -> Self {
        Self {
            values,
            stage: PhantomData,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    #[must_use]
    pub fn view(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.to_vec()
    }

    #[must_use]
    pub fn into_inner(self) -> Array1<f64> {
        self.values
    }
}

impl<S> Index<usize> for FeatureVector<S> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}
