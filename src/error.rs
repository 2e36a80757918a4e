//! Error type shared by every stage of a bundle build.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed collaborator failure kept as an error source.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the crate.
pub type BundleResult<T> = Result<T, BundleError>;

/// Stages a single component build passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
  /// Nothing has happened yet.
  Pending,
  /// The component output directory exists.
  DirectoryEnsured,
  /// Inclusions were ordered and grouped by extension.
  Classified,
  /// Bundle files were written and the version computed.
  Bundled,
  /// Auxiliary resources were copied.
  ResourcesCopied,
  /// The manifest was written; the build is complete.
  ManifestWritten,
}

impl fmt::Display for BuildStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      Self::Pending => "pending",
      Self::DirectoryEnsured => "directory ensured",
      Self::Classified => "classified",
      Self::Bundled => "bundled",
      Self::ResourcesCopied => "resources copied",
      Self::ManifestWritten => "manifest written",
    };
    f.write_str(label)
  }
}

/// Errors raised while installing packages or building component bundles.
#[derive(Debug, Error)]
pub enum BundleError {
  /// The dependency relation between inclusions is cyclic.
  #[error("dependency cycle detected: {}", cycle.join(" -> "))]
  Cycle {
    /// Nodes along the detected cycle, first node repeated at the end.
    cycle: Vec<String>,
  },
  /// A resolved resource could not be read.
  #[error("failed to read resource {}", path.display())]
  ResourceRead {
    /// Absolute path of the resource.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// An output directory could not be created.
  #[error("failed to create directory {}", path.display())]
  DirectoryCreation {
    /// Directory that could not be created.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// The package installer could not satisfy the requested packages.
  #[error("failed to install packages [{}]", packages.join(", "))]
  Installation {
    /// Packages that were requested.
    packages: Vec<String>,
    /// Installer failure.
    #[source]
    source: SourceError,
  },
  /// Writing a bundle, copied resource or manifest failed.
  #[error("failed to write {}", path.display())]
  Write {
    /// Destination that could not be written.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// A file referenced from a stylesheet could not be staged.
  #[error("failed to stage {} at {}", source_path.display(), target.display())]
  Stage {
    /// File referenced by the stylesheet.
    source_path: PathBuf,
    /// Staged location inside the output directory.
    target: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// A minifier rejected the content of a resource.
  #[error("failed to minify {}: {message}", path.display())]
  Minify {
    /// Resource whose content was rejected.
    path: PathBuf,
    /// Minifier diagnostic.
    message: String,
  },
  /// An inclusion depends on a resource that is not part of the included set.
  #[error("{dependent} depends on {dependency}, which was not included")]
  UnknownDependency {
    /// Inclusion declaring the dependency.
    dependent: String,
    /// Missing dependency.
    dependency: String,
  },
  /// The resource registry failed.
  #[error("registry failed to {operation}")]
  Registry {
    /// Operation that failed.
    operation: String,
    /// Registry failure.
    #[source]
    source: SourceError,
  },
  /// The manifest could not be serialised.
  #[error("failed to serialise manifest {}", path.display())]
  Manifest {
    /// Manifest destination.
    path: PathBuf,
    /// Serialisation error.
    #[source]
    source: serde_json::Error,
  },
  /// A component build failed; wraps the underlying error.
  #[error("building component {component} failed after stage '{stage}'")]
  Component {
    /// Component being built.
    component: String,
    /// Last stage reached before the failure.
    stage: BuildStage,
    /// Underlying failure.
    #[source]
    source: Box<BundleError>,
  },
}

impl BundleError {
  /// Wrap a collaborator failure raised by the registry.
  pub fn registry(operation: impl Into<String>, source: anyhow::Error) -> Self {
    Self::Registry {
      operation: operation.into(),
      source: source.into(),
    }
  }

  /// Unwrap [`BundleError::Component`] layers, returning the innermost error.
  pub fn root(&self) -> &BundleError {
    match self {
      Self::Component { source, .. } => source.root(),
      other => other,
    }
  }
}
