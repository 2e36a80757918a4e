//! Reading and writing the per-component bundle manifest.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::{BundleError, BundleResult};
use crate::models::BundleManifest;

/// Serialise `manifest` as two-space indented JSON into `path`, replacing any previous file.
pub fn write_manifest(path: &Path, manifest: &BundleManifest) -> BundleResult<()> {
  let json = serde_json::to_string_pretty(manifest).map_err(|err| BundleError::Manifest {
    path: path.to_path_buf(),
    source: err,
  })?;
  fs::write(path, json).map_err(|err| BundleError::Write {
    path: path.to_path_buf(),
    source: err,
  })
}

/// Load a previously written manifest from disk.
pub fn load_manifest(path: &Path) -> Result<BundleManifest> {
  let content = fs::read_to_string(path)
    .with_context(|| format!("manifest not found at {}", path.display()))?;
  let manifest: BundleManifest =
    serde_json::from_str(&content).context("failed to parse bundle manifest JSON")?;
  Ok(manifest)
}
