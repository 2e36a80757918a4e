//! Copy auxiliary resources (images, icons, templates) into package-namespaced directories.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use same_file::is_same_file;
use tracing::debug;

use crate::error::{BundleError, BundleResult};
use crate::layout::{base_name, copied_resource_path};
use crate::models::ResourcesByType;

/// Copy every resource whose extension is in `extensions` below `output_dir`.
///
/// Each file lands in `<output_dir>/<package>/<basename>`, overwriting what is there. Two
/// resources of one package sharing a basename collide and the later copy wins. Returns the
/// relative paths in copy order, extensions visited in the order given.
pub fn copy_resources(
  output_dir: &Path,
  extensions: &[String],
  resources: &ResourcesByType,
) -> BundleResult<Vec<String>> {
  let mut ensured: BTreeSet<PathBuf> = BTreeSet::new();
  let mut copied = Vec::new();

  for extension in extensions {
    let Some(entries) = resources.get(extension) else {
      continue;
    };

    for entry in entries {
      let file_name = base_name(&entry.path).ok_or_else(|| BundleError::ResourceRead {
        path: entry.path.clone(),
        source: std::io::Error::new(
          std::io::ErrorKind::InvalidInput,
          "resource path has no file name",
        ),
      })?;
      let package_dir = output_dir.join(&entry.package);
      if !ensured.contains(&package_dir) {
        fs::create_dir_all(&package_dir).map_err(|err| BundleError::DirectoryCreation {
          path: package_dir.clone(),
          source: err,
        })?;
        ensured.insert(package_dir.clone());
      }

      let destination = package_dir.join(&file_name);
      install_resource(&entry.path, &destination)?;
      debug!(source = %entry.path.display(), destination = %destination.display(), "copied resource");

      copied.push(copied_resource_path(&entry.package, &file_name));
    }
  }

  Ok(copied)
}

fn install_resource(source: &Path, destination: &Path) -> BundleResult<()> {
  if !source.is_file() {
    return Err(BundleError::ResourceRead {
      path: source.to_path_buf(),
      source: std::io::Error::new(std::io::ErrorKind::NotFound, "resource file is missing"),
    });
  }

  // A link left at the destination would make the copy write through to the source.
  if fs::symlink_metadata(destination).is_ok_and(|meta| meta.file_type().is_symlink()) {
    fs::remove_file(destination).map_err(|err| BundleError::Write {
      path: destination.to_path_buf(),
      source: err,
    })?;
  }

  if destination.exists()
    && is_same_file(source, destination).map_err(|err| BundleError::ResourceRead {
      path: source.to_path_buf(),
      source: err,
    })?
  {
    return Ok(());
  }

  fs::copy(source, destination).map_err(|err| BundleError::Write {
    path: destination.to_path_buf(),
    source: err,
  })?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::ResolvedResource;
  use tempfile::tempdir;

  fn extensions() -> Vec<String> {
    vec![".pt".into(), ".png".into()]
  }

  #[test]
  fn copies_into_package_directories() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let source = dir.path().join("src");
    let out = dir.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&out).unwrap();
    fs::write(source.join("logo.png"), b"png").unwrap();
    fs::write(source.join("form.pt"), b"<form/>").unwrap();
    fs::write(source.join("app.js"), b"var a;").unwrap();

    let mut resources = ResourcesByType::new();
    resources.insert(".png".into(), vec![ResolvedResource {
      package: "icons".into(),
      path: source.join("logo.png"),
    }]);
    resources.insert(".pt".into(), vec![ResolvedResource {
      package: "widget".into(),
      path: source.join("form.pt"),
    }]);
    resources.insert(".js".into(), vec![ResolvedResource {
      package: "widget".into(),
      path: source.join("app.js"),
    }]);

    let copied = copy_resources(&out, &extensions(), &resources)?;

    assert_eq!(copied, vec!["widget/form.pt", "icons/logo.png"]);
    assert_eq!(fs::read(out.join("icons/logo.png")).unwrap(), b"png");
    assert!(!fs::symlink_metadata(out.join("icons/logo.png"))
      .unwrap()
      .file_type()
      .is_symlink());
    assert!(!out.join("widget/app.js").exists());
    Ok(())
  }

  #[test]
  fn later_copy_wins_on_basename_collision() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    fs::write(dir.path().join("a/icon.png"), "first").unwrap();
    fs::write(dir.path().join("b/icon.png"), "second").unwrap();

    let mut resources = ResourcesByType::new();
    resources.insert(".png".into(), vec![
      ResolvedResource {
        package: "icons".into(),
        path: dir.path().join("a/icon.png"),
      },
      ResolvedResource {
        package: "icons".into(),
        path: dir.path().join("b/icon.png"),
      },
    ]);

    let copied = copy_resources(&out, &extensions(), &resources)?;

    assert_eq!(copied, vec!["icons/icon.png", "icons/icon.png"]);
    assert_eq!(fs::read_to_string(out.join("icons/icon.png")).unwrap(), "second");
    Ok(())
  }

  #[test]
  fn missing_sources_are_fatal() {
    let dir = tempdir().unwrap();
    let mut resources = ResourcesByType::new();
    resources.insert(".png".into(), vec![ResolvedResource {
      package: "icons".into(),
      path: dir.path().join("missing.png"),
    }]);

    let error = copy_resources(dir.path(), &extensions(), &resources).unwrap_err();
    assert!(matches!(error, BundleError::ResourceRead { .. }));
  }

  #[test]
  fn paths_without_file_name_are_fatal() {
    let dir = tempdir().unwrap();
    let odd = dir.path().join("icons/..");
    let mut resources = ResourcesByType::new();
    resources.insert(".png".into(), vec![ResolvedResource {
      package: "icons".into(),
      path: odd.clone(),
    }]);

    let error = copy_resources(&dir.path().join("out"), &extensions(), &resources).unwrap_err();
    assert!(matches!(error, BundleError::ResourceRead { ref path, .. } if path == &odd));
  }

  #[test]
  fn package_directory_blocked_by_a_file() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("icons"), "not a directory").unwrap();
    fs::write(dir.path().join("logo.png"), "png").unwrap();

    let mut resources = ResourcesByType::new();
    resources.insert(".png".into(), vec![ResolvedResource {
      package: "icons".into(),
      path: dir.path().join("logo.png"),
    }]);

    let error = copy_resources(&out, &extensions(), &resources).unwrap_err();
    assert!(
      matches!(error, BundleError::DirectoryCreation { ref path, .. } if path == &out.join("icons"))
    );
  }

  #[cfg(unix)]
  #[test]
  fn replaces_links_to_the_source_with_copies() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    let source = dir.path().join("logo.png");
    fs::create_dir_all(out.join("icons")).unwrap();
    fs::write(&source, "png").unwrap();
    std::os::unix::fs::symlink(&source, out.join("icons/logo.png")).unwrap();

    let mut resources = ResourcesByType::new();
    resources.insert(".png".into(), vec![ResolvedResource {
      package: "icons".into(),
      path: source.clone(),
    }]);
    copy_resources(&out, &extensions(), &resources)?;

    let copied = out.join("icons/logo.png");
    assert!(!fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(&copied).unwrap(), b"png");
    assert_eq!(fs::read(&source).unwrap(), b"png");
    Ok(())
  }
}
