//! Bundle file format.
//!
//! ```json
//! { "format_version": 1, "checksum": "<sha256 hex>", "bundle": { ... } }
//! ```
//!
//! The checksum covers the exact bytes of `bundle` as written. Saves go to
//! a temp file first and are renamed over the target, so a reader never
//! observes a half-written bundle.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sha2::{Digest as _, Sha256};

use crate::{ArtifactError, TrainedArtifacts};

/// Envelope format version written and accepted by this build.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    format_version: u32,
    checksum: String,
    bundle: &'a RawValue,
}

#[derive(Deserialize)]
struct EnvelopeIn<'a> {
    format_version: u32,
    checksum: String,
    #[serde(borrow)]
    bundle: &'a RawValue,
}

fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn json_error(path: &Path) -> impl FnOnce(serde_json::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Json {
        path: path.display().to_string(),
        source,
    }
}

/// Validates and writes `artifacts` to `path` atomically.
///
/// Parent directories are created as needed. Returns the checksum written.
///
/// # Errors
///
/// Returns [`ArtifactError::Inconsistent`] if the bundle fails
/// [`TrainedArtifacts::validate`], or an I/O / JSON error if it cannot be
/// written.
pub fn save(artifacts: &TrainedArtifacts, path: &Path) -> Result<String, ArtifactError> {
    artifacts.validate()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let bundle_json = serde_json::to_string(artifacts).map_err(json_error(path))?;
    let checksum = checksum(bundle_json.as_bytes());
    let bundle = RawValue::from_string(bundle_json).map_err(json_error(path))?;

    let envelope = EnvelopeOut {
        format_version: FORMAT_VERSION,
        checksum: checksum.clone(),
        bundle: &bundle,
    };
    let bytes = serde_json::to_vec(&envelope).map_err(json_error(path))?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &bytes).map_err(io_error(&tmp_path))?;
    std::fs::rename(&tmp_path, path).map_err(io_error(path))?;

    log::info!(
        "Saved bundle {} to {} ({} bytes, sha256 {checksum})",
        artifacts.version,
        path.display(),
        bytes.len()
    );

    Ok(checksum)
}

/// Reads a bundle from `path`, verifying format version, checksum, and
/// internal consistency.
///
/// # Errors
///
/// Returns [`ArtifactError`] if the file cannot be read or parsed, was
/// written by another format version, fails its checksum, or is
/// internally inconsistent.
pub fn load(path: &Path) -> Result<TrainedArtifacts, ArtifactError> {
    let text = std::fs::read_to_string(path).map_err(io_error(path))?;
    let envelope: EnvelopeIn<'_> = serde_json::from_str(&text).map_err(json_error(path))?;

    if envelope.format_version != FORMAT_VERSION {
        return Err(ArtifactError::UnsupportedFormat {
            found: envelope.format_version,
            supported: FORMAT_VERSION,
        });
    }

    let actual = checksum(envelope.bundle.get().as_bytes());
    if !actual.eq_ignore_ascii_case(&envelope.checksum) {
        return Err(ArtifactError::ChecksumMismatch {
            path: path.display().to_string(),
            expected: envelope.checksum,
            actual,
        });
    }

    let artifacts: TrainedArtifacts =
        serde_json::from_str(envelope.bundle.get()).map_err(json_error(path))?;
    artifacts.validate()?;

    log::info!(
        "Loaded bundle {} (schema {}, {} centers) from {}",
        artifacts.version,
        artifacts.schema.version,
        artifacts.hotspots.centers.len(),
        path.display()
    );

    Ok(artifacts)
}
