use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use will_it_rain_preprocessing::{NormalizedVector, WeatherReading, assemble, normalize};

use crate::{
    error::{InferenceError, PredictError, UnknownClassError},
    model::{ArtifactBundle, Classifier, LabelDecoder, RainfallLabel, argmax},
};

/// Allowed deviation of the class probabilities' sum from 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Outcome of the classifier stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Scores {
    pub class_id: usize,
    /// `class_probabilities[i]` is the probability of class `i`.
    pub class_probabilities: Vec<f64>,
}

/// The answer to one prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    label: RainfallLabel,
    confidence_percent: f64,
}

impl PredictionResult {
    #[must_use]
    pub fn label(&self) -> RainfallLabel {
        self.label
    }

    /// Probability of the predicted class, in percent.
    #[must_use]
    pub fn confidence_percent(&self) -> f64 {
        self.confidence_percent
    }

    #[must_use]
    pub fn is_rain(&self) -> bool {
        self.label.is_rain()
    }
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2}%)", self.label, self.confidence_percent)
    }
}

/// Classifier stage.
///
/// Checks the model's outputs before they leave the stage: every probability
/// lies in `[0, 1]`, they sum to 1 within [`PROBABILITY_TOLERANCE`], and the
/// predicted class is a most probable one.
pub fn score<C: Classifier + ?Sized>(
    vector: &NormalizedVector,
    classifier: &C,
) -> Result<Scores, InferenceError> {
    if let Some(expected) = classifier.n_features() {
        if expected != vector.len() {
            return Err(InferenceError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
    }

    let (class_id, mut class_probabilities) = classifier.score(vector)?;
    check_scores(class_id, &class_probabilities)?;
    // Values within tolerance of the bounds are pulled back into [0, 1].
    for probability in &mut class_probabilities {
        *probability = probability.clamp(0.0, 1.0);
    }

    debug!(class_id, ?class_probabilities, "Scored feature vector");
    Ok(Scores {
        class_id,
        class_probabilities,
    })
}

fn check_scores(class_id: usize, probabilities: &[f64]) -> Result<(), InferenceError> {
    if probabilities.is_empty() {
        return Err(InferenceError::EmptyProbabilities);
    }
    let range = -PROBABILITY_TOLERANCE..=1.0 + PROBABILITY_TOLERANCE;
    if let Some((index, &value)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || !range.contains(*p))
    {
        return Err(InferenceError::InvalidProbability {
            class_id: index,
            value,
        });
    }

    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(InferenceError::ProbabilitySum { sum });
    }

    let Some(&predicted) = probabilities.get(class_id) else {
        return Err(InferenceError::ClassOutOfRange {
            class_id,
            n_classes: probabilities.len(),
        });
    };
    // Ties are fine: any most probable class is a valid prediction.
    if let Some(best) = argmax(probabilities) {
        if predicted < probabilities[best] {
            return Err(InferenceError::Inconsistent {
                class_id,
                argmax: best,
            });
        }
    }
    Ok(())
}

/// Result decoder stage.
///
/// The decoder must have been fitted on exactly as many classes as were
/// scored. Confidence is the predicted class's probability in percent.
pub fn decode<D: LabelDecoder + ?Sized>(
    class_id: usize,
    class_probabilities: &[f64],
    decoder: &D,
) -> Result<PredictionResult, UnknownClassError> {
    if decoder.n_classes() != class_probabilities.len() {
        return Err(UnknownClassError::CardinalityMismatch {
            decoder: decoder.n_classes(),
            classifier: class_probabilities.len(),
        });
    }
    let out_of_range = || UnknownClassError::OutOfRange {
        class_id,
        n_classes: decoder.n_classes(),
    };
    let name = decoder.class_name(class_id).ok_or_else(out_of_range)?;
    let probability = class_probabilities.get(class_id).ok_or_else(out_of_range)?;

    let label = RainfallLabel::from_class_name(name).ok_or_else(|| UnknownClassError::Unrecognized {
        class_id,
        name: name.to_owned(),
    })?;

    Ok(PredictionResult {
        label,
        confidence_percent: probability.clamp(0.0, 1.0) * 100.0,
    })
}

/// Runs one reading through every stage, stopping at the first failure.
pub fn run(bundle: &ArtifactBundle, reading: &WeatherReading) -> Result<PredictionResult, PredictError> {
    let raw = assemble(reading, bundle.feature_order())?;
    let normalized = normalize(&raw, bundle.scaler())?;
    let scores = score(&normalized, bundle.classifier())?;
    let result = decode(scores.class_id, &scores.class_probabilities, bundle.label_decoder())?;

    debug!(label = %result.label, confidence = result.confidence_percent, "Prediction complete");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use proptest::prelude::*;
    use will_it_rain_preprocessing::{
        FeatureOrder, RawVector, Scaler, ScalingError, StandardScaler,
        WEATHER_FEATURES,
    };

    use super::*;
    use crate::{
        model::{LabelEncoder, LogisticRegression},
        test_support::{
            COEF, DEFAULT_CONFIDENCE, INTERCEPT, MEAN, OVERCAST_CONFIDENCE, SCALE, default_reading,
            fixture_bundle, overcast_reading,
        },
    };

    /// Returns fixed outputs, for exercising the stage checks.
    struct Fixed(usize, Vec<f64>);

    impl Classifier for Fixed {
        fn n_features(&self) -> Option<usize> {
            None
        }

        fn predict(&self, _: &NormalizedVector) -> Result<usize, InferenceError> {
            Ok(self.0)
        }

        fn predict_probability(&self, _: &NormalizedVector) -> Result<Vec<f64>, InferenceError> {
            Ok(self.1.clone())
        }
    }

    struct CountingScaler {
        inner: StandardScaler,
        calls: Arc<AtomicUsize>,
    }

    impl Scaler for CountingScaler {
        fn n_features(&self) -> usize {
            self.inner.n_features()
        }

        fn transform(&self, vector: &RawVector) -> Result<NormalizedVector, ScalingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.transform(vector)
        }
    }

    struct CountingClassifier {
        inner: LogisticRegression,
        calls: Arc<AtomicUsize>,
    }

    impl Classifier for CountingClassifier {
        fn n_features(&self) -> Option<usize> {
            self.inner.n_features()
        }

        fn predict(&self, vector: &NormalizedVector) -> Result<usize, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.predict(vector)
        }

        fn predict_probability(&self, vector: &NormalizedVector) -> Result<Vec<f64>, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.predict_probability(vector)
        }
    }

    fn vector() -> NormalizedVector {
        NormalizedVector::from_scaled(vec![0.0])
    }

    #[test]
    fn test_default_reading_matches_golden_result() {
        let result = run(&fixture_bundle(), &default_reading()).unwrap();

        assert_eq!(result.label(), RainfallLabel::NoRain);
        assert!((result.confidence_percent() - DEFAULT_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn test_overcast_humid_reading_predicts_rain() {
        let result = run(&fixture_bundle(), &overcast_reading()).unwrap();

        assert!(result.is_rain());
        assert!((result.confidence_percent() - OVERCAST_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn test_missing_feature_stops_before_scaling_and_scoring() {
        let scaler_calls = Arc::new(AtomicUsize::new(0));
        let classifier_calls = Arc::new(AtomicUsize::new(0));
        let bundle = ArtifactBundle::new(
            CountingClassifier {
                inner: LogisticRegression::new(vec![COEF.to_vec()], vec![INTERCEPT]).unwrap(),
                calls: Arc::clone(&classifier_calls),
            },
            CountingScaler {
                inner: StandardScaler::new(MEAN.to_vec(), SCALE.to_vec()).unwrap(),
                calls: Arc::clone(&scaler_calls),
            },
            LabelEncoder::new(["no", "yes"]).unwrap(),
            FeatureOrder::new(WEATHER_FEATURES).unwrap(),
        );

        let mut reading = default_reading();
        reading.remove("dewpoint");
        let err = run(&bundle, &reading).unwrap_err();

        assert!(matches!(&err, PredictError::MissingFeature(e) if e.missing().len() == 1 && e.missing()[0] == "dewpoint"));
        assert_eq!(scaler_calls.load(Ordering::SeqCst), 0);
        assert_eq!(classifier_calls.load(Ordering::SeqCst), 0);

        run(&bundle, &default_reading()).unwrap();
        assert_eq!(scaler_calls.load(Ordering::SeqCst), 1);
        assert!(classifier_calls.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_missing_feature_error_type() {
        match run(&fixture_bundle(), &WeatherReading::new()) {
            Err(PredictError::MissingFeature(err)) => {
                assert_eq!(err.missing().to_vec(), WEATHER_FEATURES.map(String::from).to_vec());
            }
            other => panic!("expected a missing-feature error, got {other:?}"),
        }
    }

    #[test]
    fn test_scaler_dimension_mismatch_is_a_scaling_error() {
        let bundle = ArtifactBundle::new(
            LogisticRegression::new(vec![vec![1.0]], vec![0.0]).unwrap(),
            StandardScaler::new(vec![0.0], vec![1.0]).unwrap(),
            LabelEncoder::new(["no", "yes"]).unwrap(),
            FeatureOrder::new(["cloud", "humidity"]).unwrap(),
        );
        let reading = WeatherReading::new().with("cloud", 1.0).with("humidity", 2.0);

        let err = run(&bundle, &reading).unwrap_err();
        assert!(matches!(err, PredictError::Scaling(ScalingError::DimensionMismatch { expected: 1, actual: 2 })));
    }

    #[test]
    fn test_classifier_dimension_mismatch_is_an_inference_error() {
        let classifier = LogisticRegression::new(vec![vec![1.0, 1.0]], vec![0.0]).unwrap();
        let err = score(&vector(), &classifier).unwrap_err();
        assert_eq!(
            err,
            InferenceError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_score_rejects_bad_probabilities() {
        let cases = [
            (Fixed(0, vec![]), InferenceError::EmptyProbabilities),
            (
                Fixed(0, vec![1.2, -0.2]),
                InferenceError::InvalidProbability {
                    class_id: 0,
                    value: 1.2,
                },
            ),
            (Fixed(0, vec![0.5, 0.6]), InferenceError::ProbabilitySum { sum: 1.1 }),
            (
                Fixed(2, vec![0.5, 0.5]),
                InferenceError::ClassOutOfRange {
                    class_id: 2,
                    n_classes: 2,
                },
            ),
            (
                Fixed(0, vec![0.3, 0.7]),
                InferenceError::Inconsistent {
                    class_id: 0,
                    argmax: 1,
                },
            ),
        ];

        for (classifier, expected) in cases {
            let err = score(&vector(), &classifier).unwrap_err();
            match (&err, &expected) {
                (InferenceError::ProbabilitySum { sum }, InferenceError::ProbabilitySum { sum: want }) => {
                    assert!((sum - want).abs() < 1e-12);
                }
                _ => assert_eq!(err, expected),
            }
        }

        let err = score(&vector(), &Fixed(0, vec![f64::NAN, 1.0])).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidProbability { class_id: 0, .. }));
    }

    #[test]
    fn test_probabilities_within_tolerance_are_clamped() {
        let bundle = ArtifactBundle::new(
            Fixed(0, vec![1.0 + 5e-7, 0.0]),
            StandardScaler::new(vec![0.0], vec![1.0]).unwrap(),
            LabelEncoder::new(["no", "yes"]).unwrap(),
            FeatureOrder::new(["cloud"]).unwrap(),
        );

        let scores = score(&vector(), bundle.classifier()).unwrap();
        assert_eq!(scores.class_probabilities, vec![1.0, 0.0]);

        let result = run(&bundle, &WeatherReading::new().with("cloud", 1.0)).unwrap();
        assert_eq!(result.label(), RainfallLabel::NoRain);
        assert!((0.0..=100.0).contains(&result.confidence_percent()));
        assert!((result.confidence_percent() - 100.0).abs() < f64::EPSILON);

        let scores = score(&vector(), &Fixed(1, vec![-5e-7, 1.0])).unwrap();
        assert_eq!(scores.class_probabilities, vec![0.0, 1.0]);
    }

    #[test]
    fn test_decode_clamps_confidence() {
        let decoder = LabelEncoder::new(["no", "yes"]).unwrap();
        let result = decode(1, &[-5e-7, 1.0 + 5e-7], &decoder).unwrap();
        assert!((result.confidence_percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_finite_reading_is_rejected_before_scoring() {
        let classifier_calls = Arc::new(AtomicUsize::new(0));
        let bundle = ArtifactBundle::new(
            CountingClassifier {
                inner: LogisticRegression::new(vec![COEF.to_vec()], vec![INTERCEPT]).unwrap(),
                calls: Arc::clone(&classifier_calls),
            },
            StandardScaler::new(MEAN.to_vec(), SCALE.to_vec()).unwrap(),
            LabelEncoder::new(["no", "yes"]).unwrap(),
            FeatureOrder::new(WEATHER_FEATURES).unwrap(),
        );

        let err = run(&bundle, &default_reading().with("cloud", f64::NAN)).unwrap_err();

        assert!(matches!(&err, PredictError::NonFiniteFeature(e) if e.feature() == "cloud"));
        assert_eq!(classifier_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_score_accepts_ties() {
        let scores = score(&vector(), &Fixed(1, vec![0.5, 0.5])).unwrap();
        assert_eq!(scores.class_id, 1);
    }

    #[test]
    fn test_decode_uses_decoder_order() {
        let probabilities = [0.2, 0.8];
        let forward = LabelEncoder::new(["no", "yes"]).unwrap();
        let reversed = LabelEncoder::new(["yes", "no"]).unwrap();

        let result = decode(1, &probabilities, &forward).unwrap();
        assert_eq!(result.label(), RainfallLabel::Rain);
        assert!((result.confidence_percent() - 80.0).abs() < 1e-12);

        let result = decode(1, &probabilities, &reversed).unwrap();
        assert_eq!(result.label(), RainfallLabel::NoRain);
    }

    #[test]
    fn test_decode_rejects_unresolvable_classes() {
        let decoder = LabelEncoder::new(["no", "yes"]).unwrap();
        assert_eq!(
            decode(0, &[0.2, 0.3, 0.5], &decoder).unwrap_err(),
            UnknownClassError::CardinalityMismatch {
                decoder: 2,
                classifier: 3
            }
        );
        assert_eq!(
            decode(5, &[0.5, 0.5], &decoder).unwrap_err(),
            UnknownClassError::OutOfRange {
                class_id: 5,
                n_classes: 2
            }
        );

        let decoder = LabelEncoder::new(["sunny", "yes"]).unwrap();
        assert!(matches!(
            decode(0, &[0.9, 0.1], &decoder).unwrap_err(),
            UnknownClassError::Unrecognized { class_id: 0, name } if name == "sunny"
        ));
    }

    #[test]
    fn test_result_display_and_json() {
        let result = run(&fixture_bundle(), &overcast_reading()).unwrap();
        assert_eq!(result.to_string(), "rain (98.90%)");

        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["label"], "rain");
        assert!(json["confidence_percent"].as_f64().unwrap() > 98.0);
    }

    fn arb_reading() -> impl Strategy<Value = WeatherReading> {
        (
            995.0..1040.0f64,
            5.0..40.0f64,
            4.0..35.0f64,
            2.0..32.0f64,
            -2.0..28.0f64,
            30u8..=100,
            0u8..=100,
            0.0..13.0f64,
            0u16..=360,
            0.0..70.0f64,
        )
            .prop_map(
                |(pressure, maxtemp, temp, mintemp, dewpoint, humidity, cloud, sunshine, dir, speed)| {
                    WeatherReading::new()
                        .with("pressure", pressure)
                        .with("maxtemp", maxtemp)
                        .with("temparature", temp)
                        .with("mintemp", mintemp)
                        .with("dewpoint", dewpoint)
                        .with("humidity", f64::from(humidity))
                        .with("cloud", f64::from(cloud))
                        .with("sunshine", sunshine)
                        .with("winddirection", f64::from(dir))
                        .with("windspeed", speed)
                },
            )
    }

    proptest! {
        #[test]
        fn prop_scores_are_a_consistent_distribution(reading in arb_reading()) {
            let bundle = fixture_bundle();
            let raw = assemble(&reading, bundle.feature_order()).unwrap();
            let normalized = normalize(&raw, bundle.scaler()).unwrap();
            let scores = score(&normalized, bundle.classifier()).unwrap();

            let sum: f64 = scores.class_probabilities.iter().sum();
            prop_assert!((sum - 1.0).abs() <= PROBABILITY_TOLERANCE);
            let best = scores.class_probabilities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(scores.class_probabilities[scores.class_id], best);
        }

        #[test]
        fn prop_confidence_is_predicted_class_probability(reading in arb_reading()) {
            let bundle = fixture_bundle();
            let raw = assemble(&reading, bundle.feature_order()).unwrap();
            let normalized = normalize(&raw, bundle.scaler()).unwrap();
            let scores = score(&normalized, bundle.classifier()).unwrap();
            let result = decode(scores.class_id, &scores.class_probabilities, bundle.label_decoder()).unwrap();

            let expected = scores.class_probabilities[scores.class_id] * 100.0;
            prop_assert_eq!(result.confidence_percent(), expected);
            prop_assert!((50.0..=100.0).contains(&result.confidence_percent()));
        }

        #[test]
        fn prop_prediction_is_deterministic(reading in arb_reading()) {
            let bundle = fixture_bundle();
            let first = run(&bundle, &reading).unwrap();
            let second = run(&bundle, &reading).unwrap();

            prop_assert_eq!(first.label(), second.label());
            prop_assert_eq!(first.confidence_percent().to_bits(), second.confidence_percent().to_bits());
        }
    }
}
