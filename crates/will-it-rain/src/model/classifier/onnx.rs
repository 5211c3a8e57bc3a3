use std::{path::Path, sync::Mutex};

use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::Tensor,
};
use will_it_rain_preprocessing::NormalizedVector;

use super::Classifier;
use crate::error::InferenceError;

/// A classifier exported to ONNX, with a label output followed by a
/// `[batch, n_classes]` probability output.
///
/// The session needs exclusive access to run, so concurrent predictions
/// serialize on it.
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl OnnxClassifier {
    pub fn from_file(path: impl AsRef<Path>) -> ort::Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    fn run(&self, vector: &NormalizedVector) -> Result<(usize, Vec<f64>), InferenceError> {
        // ONNX models exported from sklearn take f32 input.
        #[allow(clippy::cast_possible_truncation)]
        let data = vector.iter().map(|x| x as f32).collect::<Box<[f32]>>();
        let input = Tensor::from_array((vec![1, vector.len()], data)).map_err(model_error)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Model("ONNX session lock poisoned".into()))?;
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| InferenceError::Model("ONNX model declares no inputs".into()))?;
        let outputs = session
            .run(ort::inputs![input_name.as_str() => &input])
            .map_err(model_error)?;
        if outputs.len() < 2 {
            return Err(InferenceError::Model(format!(
                "ONNX model produced {} outputs, expected label and probabilities",
                outputs.len()
            )));
        }

        let label = outputs[0]
            .try_extract_array::<i64>()
            .map_err(model_error)?
            .iter()
            .next()
            .copied()
            .ok_or(InferenceError::EmptyProbabilities)?;
        let class_id = usize::try_from(label)
            .map_err(|_| InferenceError::Model(format!("negative class label {label}")))?;

        let probabilities = outputs[1]
            .try_extract_array::<f32>()
            .map_err(model_error)?
            .iter()
            .map(|p| f64::from(*p))
            .collect();
        Ok((class_id, probabilities))
    }
}

impl Classifier for OnnxClassifier {
    fn n_features(&self) -> Option<usize> {
        None
    }

    fn predict(&self, vector: &NormalizedVector) -> Result<usize, InferenceError> {
        self.run(vector).map(|(class_id, _)| class_id)
    }

    fn predict_probability(&self, vector: &NormalizedVector) -> Result<Vec<f64>, InferenceError> {
        self.run(vector).map(|(_, probabilities)| probabilities)
    }

    fn score(&self, vector: &NormalizedVector) -> Result<(usize, Vec<f64>), InferenceError> {
        self.run(vector)
    }
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier").finish_non_exhaustive()
    }
}

#[allow(clippy::needless_pass_by_value)]
fn model_error(err: ort::Error) -> InferenceError {
    InferenceError::Model(err.to_string())
}
