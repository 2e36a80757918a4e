//! Naming of component output directories and paths inside them.

use std::path::{Path, PathBuf};

/// Output root plus the naming scheme for per-component directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
  /// Root directory shared by every component build.
  pub target_dir: PathBuf,
  /// Prefix of each component directory name.
  pub prefix: String,
}

impl BundleLayout {
  /// Create a layout rooted at `target_dir`.
  pub fn new(target_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
    Self {
      target_dir: target_dir.into(),
      prefix: prefix.into(),
    }
  }

  /// Directory name used for a component, which is also the manifest `name`.
  ///
  /// Dots in the component name are replaced so dotted package names map onto a single
  /// directory level.
  pub fn component_dir_name(&self, component: &str) -> String {
    format!("{}_{}", self.prefix, component.replace('.', "_"))
  }

  /// Absolute output directory for a component.
  pub fn component_dir(&self, component: &str) -> PathBuf {
    self.target_dir.join(self.component_dir_name(component))
  }
}

/// Relative manifest path for a copied resource, always using forward slashes.
pub fn copied_resource_path(package: &str, file_name: &str) -> String {
  format!("{package}/{file_name}").replace('\\', "/")
}

/// Base filename of `path` as a string, if it has one.
pub fn base_name(path: &Path) -> Option<String> {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
}
