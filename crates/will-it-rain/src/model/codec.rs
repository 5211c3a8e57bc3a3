use std::{fs, io, path::Path};

use serde::de::DeserializeOwned;
use tracing::debug;

use super::ArtifactKind;
use crate::error::ArtifactLoadError;

/// On-disk encoding of an artifact, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArtifactFormat {
    Json,
    Bincode,
    Onnx,
}

impl ArtifactFormat {
    pub(crate) fn of(kind: ArtifactKind, path: &Path) -> Result<Self, ArtifactLoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Ok(Self::Json),
            "bin" | "bincode" => Ok(Self::Bincode),
            "onnx" if kind == ArtifactKind::Classifier => Ok(Self::Onnx),
            _ => Err(ArtifactLoadError::UnsupportedFormat {
                kind,
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

/// Reads the artifact's bytes, reporting a missing file distinctly from other
/// I/O failures.
pub(crate) fn read_bytes(kind: ArtifactKind, path: &Path) -> Result<Vec<u8>, ArtifactLoadError> {
    fs::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ArtifactLoadError::Missing {
                kind,
                path: path.to_path_buf(),
            }
        } else {
            ArtifactLoadError::Io {
                kind,
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Reads and decodes a serde-backed artifact (`.json` or `.bin`).
pub(crate) fn read_artifact<T: DeserializeOwned>(
    kind: ArtifactKind,
    path: &Path,
) -> Result<T, ArtifactLoadError> {
    let format = ArtifactFormat::of(kind, path)?;
    let bytes = read_bytes(kind, path)?;
    debug!(%kind, path = %path.display(), num_bytes = bytes.len(), ?format, "Decoding artifact");
    decode(kind, path, format, &bytes)
}

fn decode<T: DeserializeOwned>(
    kind: ArtifactKind,
    path: &Path,
    format: ArtifactFormat,
    bytes: &[u8],
) -> Result<T, ArtifactLoadError> {
    match format {
        ArtifactFormat::Json => {
            serde_json::from_slice(bytes).map_err(|source| ArtifactLoadError::Json {
                kind,
                path: path.to_path_buf(),
                source,
            })
        }
        ArtifactFormat::Bincode => {
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map(|(value, _)| value)
                .map_err(|source| ArtifactLoadError::Bincode {
                    kind,
                    path: path.to_path_buf(),
                    source,
                })
        }
        ArtifactFormat::Onnx => Err(ArtifactLoadError::UnsupportedFormat {
            kind,
            path: path.to_path_buf(),
            extension: "onnx".to_string(),
        }),
    }
}
