//! Package installation seam used before the registry is loaded.

use std::cmp::Ordering;
use std::fs;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tracing::warn;

/// Packages to make available plus where and how to look for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRequest {
  /// Package names to install.
  pub packages: Vec<String>,
  /// Candidate source locations, searched in order.
  pub find_links: Vec<PathBuf>,
  /// Optional package index, for installers that download distributions.
  ///
  /// [`DirectoryInstaller`] only looks at local directories and ignores it.
  pub index: Option<String>,
  /// Prefer the newest available version over the first match.
  pub newest: bool,
}

/// Collaborator that turns package names into usable on-disk locations.
pub trait PackageInstaller {
  /// Install every requested package, returning one location per package.
  fn install(&self, request: &InstallRequest) -> Result<Vec<PathBuf>>;
}

/// Installer resolving packages to directories already present under `find_links`.
///
/// A package `name` matches a directory called `name` or `name-<version>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryInstaller;

impl PackageInstaller for DirectoryInstaller {
  fn install(&self, request: &InstallRequest) -> Result<Vec<PathBuf>> {
    if let Some(index) = &request.index {
      warn!(index = %index, "directory installer ignores the package index");
    }
    request
      .packages
      .iter()
      .map(|package| {
        let candidates = find_candidates(&request.find_links, package)?;
        let chosen = if request.newest {
          candidates
            .into_iter()
            .max_by(|a, b| compare_versions(&a.0, &b.0))
        } else {
          candidates.into_iter().next()
        };
        chosen.map(|(_, path)| path).ok_or_else(|| {
          anyhow!(
            "no distribution of {package} found in {} location(s)",
            request.find_links.len()
          )
        })
      })
      .collect()
  }
}

type Candidate = (String, PathBuf);

fn find_candidates(locations: &[PathBuf], package: &str) -> Result<Vec<Candidate>> {
  let prefix = format!("{package}-");
  let mut candidates = Vec::new();

  for location in locations {
    let entries = match fs::read_dir(location) {
      Ok(entries) => entries,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
      Err(err) => {
        return Err(anyhow!(err).context(format!("failed to read {}", location.display())));
      }
    };

    let mut matches = Vec::new();
    for entry in entries {
      let entry = entry?;
      if !entry.file_type()?.is_dir() {
        continue;
      }
      let file_name = entry.file_name();
      let Some(name) = file_name.to_str() else {
        continue;
      };
      if name == package {
        matches.push((String::new(), entry.path()));
      } else if let Some(version) = name.strip_prefix(&prefix) {
        // `jquery-ui-1.13` is a different package, not a `jquery` version.
        if version.starts_with(|c: char| c.is_ascii_digit()) {
          matches.push((version.to_string(), entry.path()));
        }
      }
    }

    matches.sort();
    candidates.extend(matches);
  }

  Ok(candidates)
}

/// Compare dotted versions numerically where possible, falling back to text.
fn compare_versions(left: &str, right: &str) -> Ordering {
  let mut left_parts = left.split(['.', '-']);
  let mut right_parts = right.split(['.', '-']);
  loop {
    match (left_parts.next(), right_parts.next()) {
      (None, None) => return Ordering::Equal,
      (None, Some(_)) => return Ordering::Less,
      (Some(_), None) => return Ordering::Greater,
      (Some(a), Some(b)) => {
        let ordering = match (a.parse::<u64>(), b.parse::<u64>()) {
          (Ok(a), Ok(b)) => a.cmp(&b),
          _ => a.cmp(b),
        };
        if ordering != Ordering::Equal {
          return ordering;
        }
      }
    }
  }
}
