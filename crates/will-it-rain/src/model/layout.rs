use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Default artifact directory, relative to the working directory.
pub const DEFAULT_ARTIFACTS_DIR: &str = "models";

/// The artifacts that make up a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Classifier,
    Scaler,
    LabelDecoder,
    FeatureOrder,
    /// Optional; the bundle loads without it.
    Metadata,
}

impl ArtifactKind {
    /// Artifacts without which no prediction may be served.
    pub const REQUIRED: [Self; 4] = [
        Self::Classifier,
        Self::Scaler,
        Self::LabelDecoder,
        Self::FeatureOrder,
    ];

    #[must_use]
    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Classifier => "classifier.json",
            Self::Scaler => "scaler.json",
            Self::LabelDecoder => "label_encoder.json",
            Self::FeatureOrder => "feature_names.json",
            Self::Metadata => "model_metadata.json",
        }
    }

    #[must_use]
    pub fn is_required(self) -> bool {
        !matches!(self, Self::Metadata)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classifier => "classifier",
            Self::Scaler => "scaler",
            Self::LabelDecoder => "label decoder",
            Self::FeatureOrder => "feature order",
            Self::Metadata => "metadata",
        };
        f.write_str(name)
    }
}

/// Where a bundle lives on disk.
///
/// Artifacts are versioned together: with a version set, every file is read
/// from `<root>/<version>/`. The file extension selects the codec (`.json`,
/// `.bin`, or `.onnx` for the classifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
    version: Option<String>,
    classifier: String,
    scaler: String,
    label_decoder: String,
    feature_order: String,
    metadata: String,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            version: None,
            classifier: ArtifactKind::Classifier.default_file_name().to_string(),
            scaler: ArtifactKind::Scaler.default_file_name().to_string(),
            label_decoder: ArtifactKind::LabelDecoder.default_file_name().to_string(),
            feature_order: ArtifactKind::FeatureOrder.default_file_name().to_string(),
            metadata: ArtifactKind::Metadata.default_file_name().to_string(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Overrides the file name of one artifact within the bundle directory.
    #[must_use]
    pub fn with_file_name(mut self, kind: ArtifactKind, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        match kind {
            ArtifactKind::Classifier => self.classifier = file_name,
            ArtifactKind::Scaler => self.scaler = file_name,
            ArtifactKind::LabelDecoder => self.label_decoder = file_name,
            ArtifactKind::FeatureOrder => self.feature_order = file_name,
            ArtifactKind::Metadata => self.metadata = file_name,
        }
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Directory the artifacts are read from.
    #[must_use]
    pub fn dir(&self) -> PathBuf {
        match &self.version {
            Some(version) => self.root.join(version),
            None => self.root.clone(),
        }
    }

    #[must_use]
    pub fn file_name(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Classifier => &self.classifier,
            ArtifactKind::Scaler => &self.scaler,
            ArtifactKind::LabelDecoder => &self.label_decoder,
            ArtifactKind::FeatureOrder => &self.feature_order,
            ArtifactKind::Metadata => &self.metadata,
        }
    }

    #[must_use]
    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        self.dir().join(self.file_name(kind))
    }

    /// Required artifacts with no file at their expected path.
    #[must_use]
    pub fn missing_required(&self) -> Vec<ArtifactKind> {
        ArtifactKind::REQUIRED
            .into_iter()
            .filter(|&kind| !self.path(kind).exists())
            .collect()
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new(DEFAULT_ARTIFACTS_DIR)
    }
}
