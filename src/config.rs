//! Bundler configuration describing the output layout and which resource types are handled.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::install::InstallRequest;
use crate::layout::BundleLayout;

const DEFAULT_CONFIG_FILE: &str = "bundler.config.json";

/// Prefix of every component output directory.
pub const DEFAULT_BUNDLE_DIR_PREFIX: &str = "bowerstatic_bundle";

/// Discoverable configuration for a bundler run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
  /// Root directory receiving one subdirectory per component.
  pub target_dir: PathBuf,
  /// Prefix of each component output directory name.
  pub bundle_dir_prefix: String,
  /// Name of the manifest written into each component directory.
  pub manifest_file: String,
  /// Extensions concatenated into bundles, in the order bundles are written.
  pub bundle_extensions: Vec<String>,
  /// Extension whose content goes through the stylesheet reference rewriter.
  pub stylesheet_extension: String,
  /// Extensions copied verbatim into package subdirectories, in copy order.
  pub resource_extensions: Vec<String>,
  /// Whether bundled content is minified.
  pub minify: bool,
  /// Packages handed to the installer before the registry is loaded.
  pub packages: Vec<String>,
  /// Candidate source locations for the installer.
  pub find_links: Vec<PathBuf>,
  /// Optional package index for downloading installers; the directory installer ignores it.
  pub index: Option<String>,
  /// Prefer the newest available version of each package.
  pub newest: bool,
}

impl Default for BundlerConfig {
  fn default() -> Self {
    Self {
      target_dir: PathBuf::from("bundles"),
      bundle_dir_prefix: DEFAULT_BUNDLE_DIR_PREFIX.into(),
      manifest_file: ".bower.json".into(),
      bundle_extensions: vec![".js".into(), ".css".into()],
      stylesheet_extension: ".css".into(),
      resource_extensions: vec![
        ".pt".into(),
        ".ico".into(),
        ".gif".into(),
        ".png".into(),
        ".jpg".into(),
      ],
      minify: true,
      packages: Vec::new(),
      find_links: Vec::new(),
      index: None,
      newest: false,
    }
  }
}

impl BundlerConfig {
  /// Attempt to load configuration from the provided directory.
  ///
  /// A missing or unparsable configuration file falls back to the defaults.
  pub fn discover(dir: &Path) -> Self {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    Self::from_path(&candidate).unwrap_or_default()
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Option<Self> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
  }

  /// Output layout derived from the target directory and prefix.
  pub fn layout(&self) -> BundleLayout {
    BundleLayout::new(&self.target_dir, &self.bundle_dir_prefix)
  }

  /// Installer request for the configured packages.
  pub fn install_request(&self) -> InstallRequest {
    InstallRequest {
      packages: self.packages.clone(),
      find_links: self.find_links.clone(),
      index: self.index.clone(),
      newest: self.newest,
    }
  }
}
