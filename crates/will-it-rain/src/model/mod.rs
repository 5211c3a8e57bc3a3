//! The artifact bundle: everything a prediction needs, loaded once.

mod classifier;
mod codec;
mod labels;
mod layout;
mod metadata;

use std::{fmt, path::Path};

#[cfg(feature = "onnx")]
pub use classifier::OnnxClassifier;
pub use classifier::{
    Classifier, ClassifierArtifact, ForestTree, LogisticRegression, RandomForest, TreeNode,
};
pub(crate) use classifier::argmax;
use codec::{ArtifactFormat, read_artifact};
pub use labels::{LabelDecoder, LabelEncoder, RainfallLabel};
pub use layout::{ArtifactKind, ArtifactLayout, DEFAULT_ARTIFACTS_DIR};
pub use metadata::ModelMetadata;
use tracing::{debug, info, warn};
use will_it_rain_preprocessing::{FeatureOrder, FittedScaler, Scaler};

use crate::error::ArtifactLoadError;

/// The four fitted artifacts, plus optional metadata.
///
/// Immutable once built. Share it behind an `Arc` rather than reloading it.
pub struct ArtifactBundle {
    classifier: Box<dyn Classifier>,
    scaler: Box<dyn Scaler>,
    label_decoder: Box<dyn LabelDecoder>,
    feature_order: FeatureOrder,
    metadata: Option<ModelMetadata>,
}

impl ArtifactBundle {
    /// Builds a bundle from in-memory components.
    pub fn new(
        classifier: impl Classifier + 'static,
        scaler: impl Scaler + 'static,
        label_decoder: impl LabelDecoder + 'static,
        feature_order: FeatureOrder,
    ) -> Self {
        let bundle = Self {
            classifier: Box::new(classifier),
            scaler: Box::new(scaler),
            label_decoder: Box::new(label_decoder),
            feature_order,
            metadata: None,
        };
        bundle.check_consistency();
        bundle
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: ModelMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Loads every artifact described by `layout`.
    ///
    /// Fails on the first required artifact that is missing, unreadable, or
    /// invalid. Metadata is optional; a corrupt metadata file is logged and
    /// skipped.
    pub fn load(layout: &ArtifactLayout) -> Result<Self, ArtifactLoadError> {
        let dir = layout.dir();
        debug!(dir = %dir.display(), "Loading artifact bundle");

        let feature_order: FeatureOrder =
            read_artifact(ArtifactKind::FeatureOrder, &layout.path(ArtifactKind::FeatureOrder))?;
        let scaler: FittedScaler =
            read_artifact(ArtifactKind::Scaler, &layout.path(ArtifactKind::Scaler))?;
        let label_decoder: LabelEncoder =
            read_artifact(ArtifactKind::LabelDecoder, &layout.path(ArtifactKind::LabelDecoder))?;
        let classifier = load_classifier(&layout.path(ArtifactKind::Classifier))?;

        let bundle = Self {
            classifier,
            scaler: Box::new(scaler),
            label_decoder: Box::new(label_decoder),
            feature_order,
            metadata: load_metadata(&layout.path(ArtifactKind::Metadata)),
        };
        bundle.check_consistency();

        info!(
            dir = %dir.display(),
            num_features = bundle.feature_order.len(),
            num_classes = bundle.label_decoder.n_classes(),
            model = bundle.metadata.as_ref().map_or("unnamed", |m| m.model_name.as_str()),
            "Loaded artifact bundle"
        );
        Ok(bundle)
    }

    /// Loads a bundle with the default file names from `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        Self::load(&ArtifactLayout::new(dir.as_ref()))
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn scaler(&self) -> &dyn Scaler {
        self.scaler.as_ref()
    }

    pub fn label_decoder(&self) -> &dyn LabelDecoder {
        self.label_decoder.as_ref()
    }

    #[must_use]
    pub fn feature_order(&self) -> &FeatureOrder {
        &self.feature_order
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_ref()
    }

    /// Logs disagreements between artifacts. Requests against such a bundle
    /// fail at the stage boundary where the disagreement shows up.
    fn check_consistency(&self) {
        let n_features = self.feature_order.len();
        if self.scaler.n_features() != n_features {
            warn!(
                feature_order = n_features,
                scaler = self.scaler.n_features(),
                "Scaler was fitted on a different number of features than the feature order lists"
            );
        }
        if let Some(expected) = self.classifier.n_features() {
            if expected != self.scaler.n_features() {
                warn!(
                    classifier = expected,
                    scaler = self.scaler.n_features(),
                    "Classifier and scaler disagree on the number of features"
                );
            }
        }
        for class_id in 0..self.label_decoder.n_classes() {
            if let Some(name) = self.label_decoder.class_name(class_id) {
                if RainfallLabel::from_class_name(name).is_none() {
                    warn!(class_id, name, "Label decoder class is not a rainfall label");
                }
            }
        }
    }
}

impl fmt::Debug for ArtifactBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactBundle")
            .field("feature_order", &self.feature_order)
            .field("num_features", &self.scaler.n_features())
            .field("num_classes", &self.label_decoder.n_classes())
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

fn load_classifier(path: &Path) -> Result<Box<dyn Classifier>, ArtifactLoadError> {
    let kind = ArtifactKind::Classifier;
    match ArtifactFormat::of(kind, path)? {
        ArtifactFormat::Onnx => load_onnx(path),
        ArtifactFormat::Json | ArtifactFormat::Bincode => {
            let classifier: ClassifierArtifact = read_artifact(kind, path)?;
            Ok(Box::new(classifier))
        }
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path) -> Result<Box<dyn Classifier>, ArtifactLoadError> {
    let kind = ArtifactKind::Classifier;
    if !path.exists() {
        return Err(ArtifactLoadError::Missing {
            kind,
            path: path.to_path_buf(),
        });
    }
    let classifier = OnnxClassifier::from_file(path).map_err(|source| ArtifactLoadError::Onnx {
        kind,
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(classifier))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path) -> Result<Box<dyn Classifier>, ArtifactLoadError> {
    Err(ArtifactLoadError::UnsupportedFormat {
        kind: ArtifactKind::Classifier,
        path: path.to_path_buf(),
        extension: "onnx".to_string(),
    })
}

fn load_metadata(path: &Path) -> Option<ModelMetadata> {
    if !path.exists() {
        debug!(path = %path.display(), "No model metadata");
        return None;
    }
    match read_artifact(ArtifactKind::Metadata, path) {
        Ok(metadata) => Some(metadata),
        Err(err) => {
            warn!(error = %err, "Ignoring unreadable model metadata");
            None
        }
    }
}
