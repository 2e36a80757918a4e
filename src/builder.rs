//! Build orchestrator driving one bundle build per local component.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::bundle::{BundleWriter, MinifierRegistry};
use crate::classify::resources_by_type;
use crate::config::BundlerConfig;
use crate::error::{BuildStage, BundleError, BundleResult};
use crate::install::PackageInstaller;
use crate::layout::BundleLayout;
use crate::manifest::write_manifest;
use crate::models::{BundleManifest, ComponentBuild};
use crate::registry::Registry;
use crate::resources::copy_resources;

/// High-level helper building bundles for every local component of a registry.
#[derive(Debug)]
pub struct Bundler {
  config: BundlerConfig,
  layout: BundleLayout,
  minifiers: MinifierRegistry,
}

impl Bundler {
  /// Create a bundler for `config`, with the standard minifiers unless minification is off.
  pub fn new(config: BundlerConfig) -> Self {
    let minifiers = if config.minify {
      MinifierRegistry::standard()
    } else {
      MinifierRegistry::empty()
    };
    let layout = config.layout();
    Self {
      config,
      layout,
      minifiers,
    }
  }

  /// Replace the minifiers used for bundled content.
  pub fn with_minifiers(mut self, minifiers: MinifierRegistry) -> Self {
    self.minifiers = minifiers;
    self
  }

  /// Configuration this bundler was created with.
  pub fn config(&self) -> &BundlerConfig {
    &self.config
  }

  /// Output layout shared by every component build.
  pub fn layout(&self) -> &BundleLayout {
    &self.layout
  }

  /// Install packages, load the registry from the installed locations and build every
  /// local component.
  ///
  /// Installation happens before any component is touched; the first failing component
  /// stops the run.
  pub fn run<I, R, F>(&self, installer: &I, load_registry: F) -> BundleResult<Vec<ComponentBuild>>
  where
    I: PackageInstaller + ?Sized,
    R: Registry,
    F: FnOnce(&[PathBuf]) -> anyhow::Result<R>,
  {
    let request = self.config.install_request();
    let locations = installer
      .install(&request)
      .map_err(|err| BundleError::Installation {
        packages: request.packages.clone(),
        source: err.into(),
      })?;
    info!(packages = request.packages.len(), locations = locations.len(), "installed packages");

    let registry =
      load_registry(&locations).map_err(|err| BundleError::registry("load", err))?;
    self.build_all(&registry)
  }

  /// Build every local component in registry order.
  pub fn build_all<R: Registry + ?Sized>(&self, registry: &R) -> BundleResult<Vec<ComponentBuild>> {
    let components = registry
      .local_components()
      .map_err(|err| BundleError::registry("enumerate local components", err))?;

    components
      .iter()
      .map(|component| self.build_component(registry, &component.name))
      .collect()
  }

  /// Build the bundle directory for a single component.
  pub fn build_component<R: Registry + ?Sized>(
    &self,
    registry: &R,
    component: &str,
  ) -> BundleResult<ComponentBuild> {
    let mut stage = BuildStage::Pending;
    self
      .build_stages(registry, component, &mut stage)
      .map_err(|err| BundleError::Component {
        component: component.to_string(),
        stage,
        source: Box::new(err),
      })
  }

  fn build_stages<R: Registry + ?Sized>(
    &self,
    registry: &R,
    component: &str,
    stage: &mut BuildStage,
  ) -> BundleResult<ComponentBuild> {
    let name = self.layout.component_dir_name(component);
    let directory = self.layout.component_dir(component);
    info!(component, directory = %directory.display(), "building component");

    fs::create_dir_all(&directory).map_err(|err| BundleError::DirectoryCreation {
      path: directory.clone(),
      source: err,
    })?;
    advance(stage, BuildStage::DirectoryEnsured, component);

    let inclusions = registry
      .include(component)
      .map_err(|err| BundleError::registry(format!("include {component}"), err))?;
    let resources = resources_by_type(registry, &inclusions)?;
    advance(stage, BuildStage::Classified, component);

    let output = BundleWriter::new(
      &directory,
      &self.config.bundle_extensions,
      &self.config.stylesheet_extension,
      &self.minifiers,
    )
    .write_bundles(&resources)?;
    advance(stage, BuildStage::Bundled, component);

    let copied = copy_resources(&directory, &self.config.resource_extensions, &resources)?;
    advance(stage, BuildStage::ResourcesCopied, component);

    let mut main = copied;
    main.extend(output.bundles);
    let manifest = BundleManifest {
      name,
      main,
      version: output.version,
    };
    write_manifest(&directory.join(&self.config.manifest_file), &manifest)?;
    advance(stage, BuildStage::ManifestWritten, component);

    info!(component, version = %manifest.version, files = manifest.main.len(), "component bundled");
    Ok(ComponentBuild {
      component: component.to_string(),
      directory,
      manifest,
    })
  }
}

fn advance(stage: &mut BuildStage, next: BuildStage, component: &str) {
  debug!(component, from = %stage, to = %next, "build stage");
  *stage = next;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::install::{DirectoryInstaller, InstallRequest};
  use crate::manifest::load_manifest;
  use crate::registry::StaticRegistry;
  #[cfg(unix)]
  use crate::test_support::relative_to_cwd;
  use sha2::{Digest, Sha256};
  use std::path::Path;
  use tempfile::tempdir;

  const REGISTRY: &str = r#"{
    "collections": [
      {
        "name": "app",
        "local": true,
        "packages": [
          {
            "name": "widget",
            "version": "1.0.0",
            "root": "widget",
            "main": ["widget.js", "widget.css", "images/banner.png"],
            "resources": [
              {"path": "widget.js", "dependencies": ["jquery/jquery.js"]}
            ]
          },
          {"name": "empty", "version": "0.1.0", "root": "empty"}
        ]
      },
      {
        "name": "components",
        "packages": [
          {"name": "jquery", "version": "3.7.1", "main": ["jquery.js"]}
        ]
      }
    ]
  }"#;

  const JQUERY: &str = "(function (global) {\n  global.jqueryMarker = true;\n})(this);\n";
  const WIDGET: &str = "// widget\nfunction widgetMarker() {\n  return jqueryMarker;\n}\n";
  const STYLES: &str = ".logo {\n  background: url(\"icons/logo.png?v=2\");\n}\n";

  fn write_sources(root: &Path) {
    fs::create_dir_all(root.join("widget/icons")).unwrap();
    fs::create_dir_all(root.join("widget/images")).unwrap();
    fs::create_dir_all(root.join("eggs/jquery-3.7.1")).unwrap();
    fs::write(root.join("eggs/jquery-3.7.1/jquery.js"), JQUERY).unwrap();
    fs::write(root.join("widget/widget.js"), WIDGET).unwrap();
    fs::write(root.join("widget/widget.css"), STYLES).unwrap();
    fs::write(root.join("widget/icons/logo.png"), b"logo").unwrap();
    fs::write(root.join("widget/images/banner.png"), b"banner").unwrap();
    fs::write(root.join("registry.json"), REGISTRY).unwrap();
  }

  fn registry(root: &Path) -> StaticRegistry {
    StaticRegistry::load(&root.join("registry.json"), &[root.join("eggs/jquery-3.7.1")]).unwrap()
  }

  fn config(root: &Path, minify: bool) -> BundlerConfig {
    BundlerConfig {
      target_dir: root.join("out"),
      minify,
      ..BundlerConfig::default()
    }
  }

  #[test]
  fn bundles_scripts_in_dependency_order() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    let bundler = Bundler::new(config(dir.path(), false));

    let build = bundler.build_component(&registry(dir.path()), "widget").unwrap();

    assert_eq!(build.directory, dir.path().join("out/bowerstatic_bundle_widget"));
    let script = fs::read_to_string(build.directory.join("bundle.js")).unwrap();
    assert_eq!(script, format!("{JQUERY}\n{WIDGET}\n"));
    assert_eq!(build.manifest.name, "bowerstatic_bundle_widget");
    assert_eq!(build.manifest.main, vec![
      "widget/banner.png",
      "bundle.js",
      "bundle.css"
    ]);

    let mut bytes = fs::read(build.directory.join("bundle.js")).unwrap();
    bytes.extend(fs::read(build.directory.join("bundle.css")).unwrap());
    assert_eq!(build.manifest.version, format!("{:x}", Sha256::digest(&bytes)));
  }

  #[test]
  fn minified_bundle_keeps_dependency_order() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    let bundler = Bundler::new(config(dir.path(), true));

    let build = bundler.build_component(&registry(dir.path()), "widget").unwrap();

    let script = fs::read_to_string(build.directory.join("bundle.js")).unwrap();
    let jquery_at = script.find("jqueryMarker").unwrap();
    let widget_at = script.find("widgetMarker").unwrap();
    assert!(jquery_at < widget_at);
    assert!(!script.contains("// widget"));
    assert!(build.manifest.main.contains(&"bundle.js".to_string()));
  }

  #[test]
  fn stages_stylesheet_references_without_query_string() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    let bundler = Bundler::new(config(dir.path(), true));

    let build = bundler.build_component(&registry(dir.path()), "widget").unwrap();

    let styles = fs::read_to_string(build.directory.join("bundle.css")).unwrap();
    assert!(styles.contains("logo.png"));
    assert!(!styles.contains("v=2"));
    assert!(!styles.contains("icons/"));
    assert_eq!(fs::read(build.directory.join("logo.png")).unwrap(), b"logo");
    assert_eq!(fs::read_to_string(dir.path().join("widget/widget.css")).unwrap(), STYLES);
  }

  #[test]
  fn rebuilds_are_deterministic() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    let bundler = Bundler::new(config(dir.path(), true));
    let registry = registry(dir.path());

    let first = bundler.build_component(&registry, "widget").unwrap();
    let first_js = fs::read(first.directory.join("bundle.js")).unwrap();
    let first_css = fs::read(first.directory.join("bundle.css")).unwrap();

    let second = bundler.build_component(&registry, "widget").unwrap();
    assert_eq!(first.manifest, second.manifest);
    assert_eq!(fs::read(second.directory.join("bundle.js")).unwrap(), first_js);
    assert_eq!(fs::read(second.directory.join("bundle.css")).unwrap(), first_css);
  }

  #[test]
  fn version_tracks_content_changes() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    let bundler = Bundler::new(config(dir.path(), false));
    let registry = registry(dir.path());
    let widget = dir.path().join("widget/widget.js");

    let original = bundler.build_component(&registry, "widget").unwrap().manifest.version;

    fs::write(&widget, WIDGET.replace("return", "return ")).unwrap();
    let changed = bundler.build_component(&registry, "widget").unwrap().manifest.version;
    assert_ne!(original, changed);

    fs::write(&widget, WIDGET).unwrap();
    let reverted = bundler.build_component(&registry, "widget").unwrap().manifest.version;
    assert_eq!(original, reverted);
  }

  #[test]
  fn manifest_entries_exist_on_disk() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    let bundler = Bundler::new(config(dir.path(), true));

    let build = bundler.build_component(&registry(dir.path()), "widget").unwrap();
    let manifest = load_manifest(&build.directory.join(".bower.json")).unwrap();

    assert_eq!(manifest, build.manifest);
    for entry in &manifest.main {
      assert!(build.directory.join(entry).is_file(), "{entry} is missing");
    }
  }

  #[test]
  fn component_without_inclusions_only_gets_a_manifest() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    let bundler = Bundler::new(config(dir.path(), true));

    let build = bundler.build_component(&registry(dir.path()), "empty").unwrap();

    let entries: Vec<String> = fs::read_dir(&build.directory)
      .unwrap()
      .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    assert_eq!(entries, vec![".bower.json"]);
    assert!(build.manifest.main.is_empty());
  }

  #[test]
  fn cycles_abort_only_the_failing_component() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    let cyclic = REGISTRY.replace(
      r#"{"name": "jquery", "version": "3.7.1", "main": ["jquery.js"]}"#,
      r#"{"name": "jquery", "version": "3.7.1", "main": ["jquery.js"],
          "resources": [{"path": "jquery.js", "dependencies": ["widget/widget.js"]}]}"#,
    );
    fs::write(dir.path().join("registry.json"), cyclic).unwrap();
    let bundler = Bundler::new(config(dir.path(), false));
    let registry = registry(dir.path());

    let error = bundler.build_component(&registry, "widget").unwrap_err();
    match &error {
      BundleError::Component {
        component, stage, ..
      } => {
        assert_eq!(component, "widget");
        assert_eq!(*stage, BuildStage::DirectoryEnsured);
      }
      other => panic!("unexpected error {other}"),
    }
    assert!(matches!(error.root(), BundleError::Cycle { .. }));

    assert!(bundler.build_component(&registry, "empty").is_ok());
  }

  #[test]
  fn run_installs_then_builds_every_local_component() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    let root = dir.path().to_path_buf();
    let bundler = Bundler::new(BundlerConfig {
      packages: vec!["jquery".into()],
      find_links: vec![root.join("eggs")],
      ..config(&root, true)
    });

    let builds = bundler
      .run(&DirectoryInstaller, |locations| {
        StaticRegistry::load(&root.join("registry.json"), locations)
      })
      .unwrap();

    let names: Vec<&str> = builds.iter().map(|build| build.component.as_str()).collect();
    assert_eq!(names, vec!["widget", "empty"]);
    assert!(root.join("out/bowerstatic_bundle_empty/.bower.json").is_file());
  }

  #[test]
  fn unusable_target_directory_fails_before_classification() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    fs::write(dir.path().join("out"), "not a directory").unwrap();
    let bundler = Bundler::new(config(dir.path(), false));

    let error = bundler.build_component(&registry(dir.path()), "widget").unwrap_err();

    assert!(matches!(error, BundleError::Component { stage: BuildStage::Pending, .. }));
    match error.root() {
      BundleError::DirectoryCreation { path, .. } => {
        assert_eq!(path, &dir.path().join("out/bowerstatic_bundle_widget"));
      }
      other => panic!("unexpected error {other}"),
    }
  }

  #[cfg(unix)]
  #[test]
  fn relative_registry_path_still_stages_readable_references() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    let bundler = Bundler::new(config(dir.path(), true));
    let registry = StaticRegistry::load(
      &relative_to_cwd(&dir.path().join("registry.json")),
      &[dir.path().join("eggs/jquery-3.7.1")],
    )
    .unwrap();

    let build = bundler.build_component(&registry, "widget").unwrap();

    let staged = build.directory.join("logo.png");
    assert!(fs::read_link(&staged).unwrap().is_absolute());
    assert_eq!(fs::read(&staged).unwrap(), b"logo");
  }

  struct FailingInstaller;

  impl PackageInstaller for FailingInstaller {
    fn install(&self, request: &InstallRequest) -> anyhow::Result<Vec<PathBuf>> {
      Err(anyhow::anyhow!("cannot satisfy {:?}", request.packages))
    }
  }

  #[test]
  fn installation_failure_stops_before_any_build() {
    let dir = tempdir().unwrap();
    write_sources(dir.path());
    let root = dir.path().to_path_buf();
    let bundler = Bundler::new(BundlerConfig {
      packages: vec!["jquery".into()],
      ..config(&root, true)
    });

    let error = bundler
      .run(&FailingInstaller, |locations| {
        StaticRegistry::load(&root.join("registry.json"), locations)
      })
      .unwrap_err();

    assert!(matches!(error, BundleError::Installation { ref packages, .. } if packages == &vec!["jquery".to_string()]));
    assert!(!root.join("out").exists());
  }
}
