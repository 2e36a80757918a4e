//! Resource registry seam plus a declarative in-memory implementation.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::models::{ComponentRef, Inclusion, InclusionSet, Resource, ResourceId};

/// Collaborator that knows which resources exist and how they depend on each other.
pub trait Registry {
  /// Components of every local collection, in registration order.
  fn local_components(&self) -> Result<Vec<ComponentRef>>;

  /// Include a component, returning every inclusion it transitively pulls in.
  fn include(&self, component: &str) -> Result<InclusionSet>;

  /// Absolute path of a registered resource.
  fn resolve_path(
    &self,
    collection: &str,
    package: &str,
    version: &str,
    relative_path: &str,
  ) -> Result<PathBuf>;
}

/// Registry described up front, typically loaded from a JSON document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticRegistry {
  /// Registered collections.
  #[serde(default)]
  pub collections: Vec<CollectionDecl>,
}

/// A named group of packages.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionDecl {
  /// Collection name.
  pub name: String,
  /// Local collections hold the components that get bundled.
  #[serde(default)]
  pub local: bool,
  /// Packages registered in the collection.
  #[serde(default)]
  pub packages: Vec<PackageDecl>,
}

/// A package (component) and the resources it declares.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageDecl {
  /// Package name.
  pub name: String,
  /// Package version.
  pub version: String,
  /// Directory holding the package files; looked up among installed locations when absent.
  #[serde(default)]
  pub root: Option<PathBuf>,
  /// Resources included when the package itself is included.
  #[serde(default)]
  pub main: Vec<String>,
  /// Resources with extra metadata such as dependencies.
  #[serde(default)]
  pub resources: Vec<ResourceDecl>,
}

/// Declaration of a single resource file.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDecl {
  /// Path relative to the package root.
  pub path: String,
  /// Explicit type tag; defaults to the path's extension.
  #[serde(default)]
  pub ext: Option<String>,
  /// Dependencies in `package/relative/path` form.
  #[serde(default)]
  pub dependencies: Vec<String>,
}

impl StaticRegistry {
  /// Load a registry description, anchoring relative package roots at the file's directory.
  ///
  /// Packages without a root are matched against `lookup_paths` by directory name, either
  /// `<name>` or `<name>-<version>`. Every root ends up absolute, even when `path` is
  /// relative to the working directory.
  pub fn load(path: &Path, lookup_paths: &[PathBuf]) -> Result<Self> {
    let content =
      fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut registry: Self = serde_json::from_str(&content)
      .with_context(|| format!("failed to parse registry {}", path.display()))?;

    let path = absolute_path(path)?;
    let base = path.parent().unwrap_or(Path::new("/"));
    registry.anchor_roots(base, lookup_paths)?;
    Ok(registry)
  }

  /// Resolve missing or relative package roots into absolute directories.
  pub fn anchor_roots(&mut self, base: &Path, lookup_paths: &[PathBuf]) -> Result<()> {
    for collection in &mut self.collections {
      for package in &mut collection.packages {
        let root = match package.root.take() {
          Some(root) => base.join(root),
          None => find_installed(lookup_paths, &package.name, &package.version).ok_or_else(|| {
            anyhow!(
              "package {} {} is not among the installed locations",
              package.name,
              package.version
            )
          })?,
        };
        package.root = Some(absolute_path(&root)?);
      }
    }
    Ok(())
  }

  fn package(&self, name: &str) -> Option<(&CollectionDecl, &PackageDecl)> {
    let mut collections: Vec<&CollectionDecl> = self.collections.iter().collect();
    collections.sort_by_key(|collection| !collection.local);
    collections.into_iter().find_map(|collection| {
      collection
        .packages
        .iter()
        .find(|package| package.name == name)
        .map(|package| (collection, package))
    })
  }

  fn local_package(&self, name: &str) -> Option<&PackageDecl> {
    self
      .collections
      .iter()
      .filter(|collection| collection.local)
      .flat_map(|collection| collection.packages.iter())
      .find(|package| package.name == name)
  }

  fn inclusion(&self, id: &ResourceId) -> Result<Inclusion> {
    let (collection, package) = self
      .package(&id.package)
      .ok_or_else(|| anyhow!("unknown package {} required by {}", id.package, id))?;
    let declared = package
      .resources
      .iter()
      .find(|resource| resource.path == id.path);

    let extension = declared
      .and_then(|resource| resource.ext.clone())
      .unwrap_or_else(|| extension_of(&id.path));
    let dependencies = match declared {
      Some(resource) => resource
        .dependencies
        .iter()
        .map(|value| {
          ResourceId::parse(value)
            .ok_or_else(|| anyhow!("invalid dependency {value:?} declared by {id}"))
        })
        .collect::<Result<Vec<_>>>()?,
      None => Vec::new(),
    };

    Ok(Inclusion {
      resource: Resource {
        collection: collection.name.clone(),
        package: package.name.clone(),
        version: package.version.clone(),
        extension,
        file_path: id.path.clone(),
      },
      dependencies,
    })
  }
}

impl Registry for StaticRegistry {
  fn local_components(&self) -> Result<Vec<ComponentRef>> {
    Ok(
      self
        .collections
        .iter()
        .filter(|collection| collection.local)
        .flat_map(|collection| {
          collection.packages.iter().map(|package| ComponentRef {
            collection: collection.name.clone(),
            name: package.name.clone(),
          })
        })
        .collect(),
    )
  }

  fn include(&self, component: &str) -> Result<InclusionSet> {
    let package = self
      .local_package(component)
      .ok_or_else(|| anyhow!("unknown local component {component}"))?;

    let mut queue: VecDeque<ResourceId> = package
      .main
      .iter()
      .map(|path| ResourceId::new(&package.name, path))
      .collect();
    let mut seen: HashSet<ResourceId> = queue.iter().cloned().collect();
    let mut inclusions = Vec::new();

    while let Some(id) = queue.pop_front() {
      let inclusion = self.inclusion(&id)?;
      for dependency in &inclusion.dependencies {
        if seen.insert(dependency.clone()) {
          queue.push_back(dependency.clone());
        }
      }
      inclusions.push(inclusion);
    }

    Ok(InclusionSet::new(inclusions))
  }

  fn resolve_path(
    &self,
    collection: &str,
    package: &str,
    version: &str,
    relative_path: &str,
  ) -> Result<PathBuf> {
    let declared = self
      .collections
      .iter()
      .filter(|candidate| candidate.name == collection)
      .flat_map(|candidate| candidate.packages.iter())
      .find(|candidate| candidate.name == package && candidate.version == version)
      .ok_or_else(|| anyhow!("package {package} {version} is not registered in {collection}"))?;
    let root = declared
      .root
      .as_ref()
      .ok_or_else(|| anyhow!("package {package} has no root directory"))?;
    Ok(root.join(relative_path))
  }
}

fn extension_of(path: &str) -> String {
  Path::new(path)
    .extension()
    .map(|ext| format!(".{}", ext.to_string_lossy()))
    .unwrap_or_default()
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
  std::path::absolute(path).with_context(|| format!("failed to resolve {}", path.display()))
}

fn find_installed(lookup_paths: &[PathBuf], name: &str, version: &str) -> Option<PathBuf> {
  let versioned = format!("{name}-{version}");
  lookup_paths
    .iter()
    .find(|path| {
      path
        .file_name()
        .and_then(|file_name| file_name.to_str())
        .is_some_and(|file_name| file_name == versioned || file_name == name)
    })
    .cloned()
}
