//! Stylesheet helpers relocating files referenced through `url(...)` next to the bundle.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use regex::bytes::Regex as BytesRegex;
use tracing::{debug, warn};

use crate::error::{BundleError, BundleResult};
use crate::layout::base_name;

// Byte-oriented so stylesheets in legacy encodings are rewritten without decoding them.
fn url_pattern() -> &'static BytesRegex {
  static PATTERN: OnceLock<BytesRegex> = OnceLock::new();
  PATTERN.get_or_init(|| BytesRegex::new(r"(?-u)url\((.*?)\)").expect("invalid css url regex"))
}

fn reference_ignores() -> &'static [Regex] {
  static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
  PATTERNS
    .get_or_init(|| {
      vec![
        Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*:").expect("invalid scheme regex"),
        Regex::new(r"^//").expect("invalid protocol-relative regex"),
      ]
    })
    .as_slice()
}

/// Determine whether a stylesheet reference points outside the local filesystem.
///
/// Absolute URLs, protocol-relative URLs and data URIs are left as they are.
pub fn should_ignore_reference(value: &str) -> bool {
  reference_ignores()
    .iter()
    .any(|pattern| pattern.is_match(value))
}

/// Strip quotes, query string and fragment from a raw `url(...)` argument.
///
/// Returns the quote character (if any) and the filename used to locate the file.
pub fn sanitize_reference(raw: &str) -> (Option<char>, &str) {
  let mut quote = None;
  let mut value = raw;
  if let Some(first) = raw.chars().next().filter(|c| *c == '"' || *c == '\'') {
    quote = Some(first);
    value = &raw[1..];
    value = value.strip_suffix(first).unwrap_or(value);
  }

  let value = value.split('?').next().unwrap_or(value);
  let value = value.split('#').next().unwrap_or(value);
  (quote, value)
}

/// Files staged into one component output directory while its stylesheets are bundled.
///
/// Staged entries are flat, keyed by base filename. Two sources sharing a base filename
/// collide and the one staged last wins.
#[derive(Debug)]
pub struct StylesheetStaging {
  output_dir: PathBuf,
  staged: HashMap<String, PathBuf>,
}

impl StylesheetStaging {
  /// Stage into `output_dir`.
  pub fn new(output_dir: impl Into<PathBuf>) -> Self {
    Self {
      output_dir: output_dir.into(),
      staged: HashMap::new(),
    }
  }

  /// Base filenames staged so far, with the source each currently points at.
  pub fn staged(&self) -> &HashMap<String, PathBuf> {
    &self.staged
  }

  /// Relocate every file referenced by `content` and rewrite the references.
  ///
  /// `stylesheet` is the absolute path the content was read from; references resolve
  /// against its directory. The source file itself is never modified, and bytes outside
  /// rewritten references are kept exactly as read.
  pub fn rewrite(&mut self, content: &[u8], stylesheet: &Path) -> BundleResult<Vec<u8>> {
    let stylesheet_dir = stylesheet.parent().unwrap_or(Path::new(""));
    let mut rewritten = Vec::with_capacity(content.len());
    let mut copied_up_to = 0;

    for token in url_pattern()
      .captures_iter(content)
      .filter_map(|caps| caps.get(1))
    {
      let raw = token.as_bytes();
      let trimmed = raw.trim_ascii();
      if trimmed.is_empty() {
        continue;
      }
      let start = token.start() + (raw.len() - raw.trim_ascii_start().len());
      let end = start + trimmed.len();

      let reference = String::from_utf8_lossy(trimmed);
      let Some(replacement) = self.relocate(&reference, stylesheet_dir)? else {
        continue;
      };
      rewritten.extend_from_slice(&content[copied_up_to..start]);
      rewritten.extend_from_slice(replacement.as_bytes());
      copied_up_to = end;
    }

    rewritten.extend_from_slice(&content[copied_up_to..]);
    Ok(rewritten)
  }

  /// Stage one reference, returning the text that replaces it.
  fn relocate(&mut self, reference: &str, stylesheet_dir: &Path) -> BundleResult<Option<String>> {
    let (quote, filename) = sanitize_reference(reference);
    if filename.is_empty() || should_ignore_reference(filename) {
      return Ok(None);
    }
    let Some(base) = base_name(Path::new(filename)) else {
      return Ok(None);
    };

    let source = stylesheet_dir.join(filename);
    let target = self.output_dir.join(&base);
    self.stage(&base, &source, &target)?;

    Ok(Some(match quote {
      Some(quote) => format!("{quote}{base}{quote}"),
      None => base,
    }))
  }

  fn stage(&mut self, base: &str, source: &Path, target: &Path) -> BundleResult<()> {
    if let Some(previous) = self.staged.get(base)
      && previous != source
    {
      warn!(
        name = base,
        previous = %previous.display(),
        current = %source.display(),
        "stylesheet references share a filename, the later one wins"
      );
    }
    if !source.exists() {
      warn!(source = %source.display(), "stylesheet references a missing file");
    }

    link_staged_file(source, target).map_err(|err| BundleError::Stage {
      source_path: source.to_path_buf(),
      target: target.to_path_buf(),
      source: err,
    })?;
    debug!(source = %source.display(), target = %target.display(), "staged stylesheet reference");

    self.staged.insert(base.to_string(), source.to_path_buf());
    Ok(())
  }
}

/// Replace whatever sits at `target` with a link to `source`.
///
/// Links always point at an absolute path; a relative one would resolve against the output
/// directory instead of the stylesheet.
fn link_staged_file(source: &Path, target: &Path) -> std::io::Result<()> {
  let source = std::path::absolute(source)?;
  if fs::symlink_metadata(target).is_ok() {
    fs::remove_file(target)?;
  }
  create_link(&source, target)
}

#[cfg(unix)]
fn create_link(source: &Path, target: &Path) -> std::io::Result<()> {
  std::os::unix::fs::symlink(source, target)
}

// Symlinks need elevated rights on some platforms, so stage a copy instead.
#[cfg(not(unix))]
fn create_link(source: &Path, target: &Path) -> std::io::Result<()> {
  fs::copy(source, target).map(|_| ())
}
