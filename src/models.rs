//! Data structures produced and consumed while building a component bundle.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity of a declared resource: owning package plus relative file path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct ResourceId {
  /// Package (component) the resource belongs to.
  pub package: String,
  /// Path of the resource relative to the package root.
  pub path: String,
}

impl ResourceId {
  /// Build an identifier from its parts.
  pub fn new(package: impl Into<String>, path: impl Into<String>) -> Self {
    Self {
      package: package.into(),
      path: path.into(),
    }
  }

  /// Parse the `package/relative/path` form used in registry declarations.
  pub fn parse(value: &str) -> Option<Self> {
    let (package, path) = value.trim().split_once('/')?;
    if package.is_empty() || path.is_empty() {
      return None;
    }
    Some(Self::new(package, path))
  }
}

impl fmt::Display for ResourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.package, self.path)
  }
}

/// A declared static asset as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
  /// Collection the owning package was registered in.
  pub collection: String,
  /// Owning package name.
  pub package: String,
  /// Owning package version.
  pub version: String,
  /// Declared type tag, including the leading dot (e.g. `.js`).
  pub extension: String,
  /// File path relative to the package root.
  pub file_path: String,
}

impl Resource {
  /// Identifier used for dependency edges.
  pub fn id(&self) -> ResourceId {
    ResourceId::new(&self.package, &self.file_path)
  }
}

/// One requested use of a resource within a component build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inclusion {
  /// Wrapped resource.
  pub resource: Resource,
  /// Direct dependencies, in declaration order.
  pub dependencies: Vec<ResourceId>,
}

/// Immutable result of including a component: every inclusion it pulls in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InclusionSet {
  inclusions: Vec<Inclusion>,
}

impl InclusionSet {
  /// Wrap inclusions in registry encounter order.
  pub fn new(inclusions: Vec<Inclusion>) -> Self {
    Self { inclusions }
  }

  /// Inclusions in registry encounter order.
  pub fn inclusions(&self) -> &[Inclusion] {
    &self.inclusions
  }

  /// Look up an inclusion by resource identifier.
  pub fn get(&self, id: &ResourceId) -> Option<&Inclusion> {
    self.inclusions.iter().find(|inclusion| {
      inclusion.resource.package == id.package && inclusion.resource.file_path == id.path
    })
  }

  /// Returns `true` when the component declared nothing.
  pub fn is_empty(&self) -> bool {
    self.inclusions.is_empty()
  }

  /// Number of inclusions.
  pub fn len(&self) -> usize {
    self.inclusions.len()
  }
}

/// A resource resolved to an absolute path on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedResource {
  /// Owning package name, used to namespace copied resources.
  pub package: String,
  /// Absolute filesystem path of the resource.
  pub path: PathBuf,
}

/// Resolved resources grouped by extension, each list in dependency order.
pub type ResourcesByType = BTreeMap<String, Vec<ResolvedResource>>;

/// Manifest written into every component output directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BundleManifest {
  /// Output directory name of the component.
  pub name: String,
  /// Copied resource paths followed by bundle filenames.
  pub main: Vec<String>,
  /// Hex digest over every bundled byte.
  pub version: String,
}

/// A component enumerated by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ComponentRef {
  /// Collection the component is registered in.
  pub collection: String,
  /// Component name.
  pub name: String,
}

/// Summary of a finished component build.
#[derive(Debug, Clone)]
pub struct ComponentBuild {
  /// Component name as enumerated by the registry.
  pub component: String,
  /// Output directory of the component.
  pub directory: PathBuf,
  /// Manifest that was written.
  pub manifest: BundleManifest,
}
