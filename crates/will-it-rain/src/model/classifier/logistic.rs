use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use will_it_rain_preprocessing::NormalizedVector;

use super::{Classifier, argmax, check_dimensions};
use crate::error::{InferenceError, InvalidArtifactError};

/// Linear model with a logistic link.
///
/// A single coefficient row is the binary case, where the row scores class 1.
/// With one row per class, probabilities come from a softmax over the
/// decision values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LogisticParams", into = "LogisticParams")]
pub struct LogisticRegression {
    coef: Array2<f64>,
    intercept: Array1<f64>,
}

#[derive(Serialize, Deserialize)]
struct LogisticParams {
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

impl LogisticRegression {
    pub fn new(coef: Vec<Vec<f64>>, intercept: Vec<f64>) -> Result<Self, InvalidArtifactError> {
        let n_rows = coef.len();
        let n_features = coef.first().map_or(0, Vec::len);

        if n_rows == 0 || n_features == 0 {
            return Err(InvalidArtifactError("logistic regression has no coefficients".into()));
        }
        if let Some(row) = coef.iter().position(|row| row.len() != n_features) {
            return Err(InvalidArtifactError(format!(
                "coefficient row {row} has {} entries, expected {n_features}",
                coef[row].len()
            )));
        }
        if intercept.len() != n_rows {
            return Err(InvalidArtifactError(format!(
                "{} intercepts for {n_rows} coefficient rows",
                intercept.len()
            )));
        }
        if coef.iter().flatten().chain(&intercept).any(|v| !v.is_finite()) {
            return Err(InvalidArtifactError(
                "logistic regression parameters must be finite".into(),
            ));
        }

        let flat = coef.into_iter().flatten().collect::<Vec<_>>();
        let coef = Array2::from_shape_vec((n_rows, n_features), flat)
            .map_err(|err| InvalidArtifactError(err.to_string()))?;
        Ok(Self {
            coef,
            intercept: Array1::from(intercept),
        })
    }

    /// Number of classes scored; a single coefficient row scores two.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        match self.coef.nrows() {
            1 => 2,
            n => n,
        }
    }

    /// Raw linear scores, one per coefficient row.
    pub fn decision_function(&self, vector: &NormalizedVector) -> Result<Array1<f64>, InferenceError> {
        check_dimensions(self.coef.ncols(), vector)?;
        Ok(self.coef.dot(&vector.view()) + &self.intercept)
    }
}

impl Classifier for LogisticRegression {
    fn n_features(&self) -> Option<usize> {
        Some(self.coef.ncols())
    }

    fn predict(&self, vector: &NormalizedVector) -> Result<usize, InferenceError> {
        let probabilities = self.predict_probability(vector)?;
        argmax(&probabilities).ok_or(InferenceError::EmptyProbabilities)
    }

    fn predict_probability(&self, vector: &NormalizedVector) -> Result<Vec<f64>, InferenceError> {
        let decision = self.decision_function(vector)?;
        if decision.len() == 1 {
            let p = sigmoid(decision[0]);
            return Ok(vec![1.0 - p, p]);
        }
        Ok(softmax(&decision.to_vec()))
    }
}

impl TryFrom<LogisticParams> for LogisticRegression {
    type Error = InvalidArtifactError;

    fn try_from(params: LogisticParams) -> Result<Self, Self::Error> {
        Self::new(params.coef, params.intercept)
    }
}

impl From<LogisticRegression> for LogisticParams {
    fn from(model: LogisticRegression) -> Self {
        Self {
            coef: model.coef.rows().into_iter().map(|row| row.to_vec()).collect(),
            intercept: model.intercept.to_vec(),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = values.iter().map(|v| (v - max).exp()).collect::<Vec<_>>();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary() -> LogisticRegression {
        LogisticRegression::new(vec![vec![2.0, -1.0]], vec![0.5]).unwrap()
    }

    #[test]
    fn test_binary_probabilities_follow_sigmoid() {
        let model = binary();
        let vector = NormalizedVector::from_scaled(vec![1.0, 1.0]);

        let probabilities = model.predict_probability(&vector).unwrap();
        let expected = 1.0 / (1.0 + (-1.5_f64).exp());
        assert!((probabilities[1] - expected).abs() < 1e-12);
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(model.predict(&vector).unwrap(), 1);
    }

    #[test]
    fn test_sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert!((sigmoid(0.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_multiclass_uses_softmax() {
        let model = LogisticRegression::new(
            vec![vec![1.0], vec![0.0], vec![-1.0]],
            vec![0.0, 0.0, 0.0],
        )
        .unwrap();
        assert_eq!(model.n_classes(), 3);

        let probabilities = model
            .predict_probability(&NormalizedVector::from_scaled(vec![2.0]))
            .unwrap();
        assert_eq!(probabilities.len(), 3);
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probabilities[0] > probabilities[1] && probabilities[1] > probabilities[2]);
    }

    #[test]
    fn test_rejects_mismatched_parameters() {
        assert!(LogisticRegression::new(vec![], vec![]).is_err());
        assert!(LogisticRegression::new(vec![vec![1.0], vec![1.0, 2.0]], vec![0.0, 0.0]).is_err());
        assert!(LogisticRegression::new(vec![vec![1.0]], vec![0.0, 1.0]).is_err());
        assert!(LogisticRegression::new(vec![vec![f64::INFINITY]], vec![0.0]).is_err());
    }

    #[test]
    fn test_wrong_dimension_is_an_inference_error() {
        let err = binary()
            .predict_probability(&NormalizedVector::from_scaled(vec![1.0]))
            .unwrap_err();
        assert_eq!(
            err,
            InferenceError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_serde_layout_round_trips() {
        let json = serde_json::to_string(&binary()).unwrap();
        assert_eq!(json, r#"{"coef":[[2.0,-1.0]],"intercept":[0.5]}"#);
        assert_eq!(serde_json::from_str::<LogisticRegression>(&json).unwrap(), binary());
    }
}
