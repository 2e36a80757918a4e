//! Helpers shared by unit tests.

use std::path::{Path, PathBuf};

/// Spell an absolute path relative to the current working directory.
pub fn relative_to_cwd(path: &Path) -> PathBuf {
  let cwd = std::env::current_dir().unwrap();
  let mut relative: PathBuf = cwd.components().skip(1).map(|_| "..").collect();
  relative.push(path.strip_prefix("/").unwrap());
  relative
}
