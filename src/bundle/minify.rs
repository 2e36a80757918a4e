//! Type-specific minifiers applied to bundled content.
//!
//! Minification only removes whitespace and comments; names are never mangled and no
//! rule-level optimisations run, so the bundled code behaves exactly like its sources.
//! Content a minifier cannot parse (browser hacks such as `*zoom:1`, engine-specific
//! syntax) is bundled as written.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::{Parser, ParserReturn};
use oxc_span::SourceType;
use thiserror::Error;
use tracing::warn;

use crate::error::{BundleError, BundleResult};

/// Why a minifier produced no output.
#[derive(Debug, Error)]
pub enum MinifyError {
  /// The source is not something the minifier understands; it is bundled unchanged.
  #[error("{0}")]
  Parse(String),
  /// The parsed source could not be printed back.
  #[error("{0}")]
  Print(String),
}

/// Content transformation registered for one extension.
pub trait Minifier: Send + Sync {
  /// Minify `source`, which was read from `path`.
  fn minify(&self, source: &str, path: &Path) -> Result<String, MinifyError>;
}

/// Script minifier re-printing the parsed program in compact form.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptMinifier;

impl Minifier for ScriptMinifier {
  fn minify(&self, source: &str, path: &Path) -> Result<String, MinifyError> {
    let allocator = Allocator::default();
    let ParserReturn {
      program,
      errors,
      panicked,
      ..
    } = Parser::new(&allocator, source, SourceType::cjs()).parse();

    if panicked || !errors.is_empty() {
      let detail = errors
        .first()
        .map(|error| format!("{error:?}"))
        .unwrap_or_else(|| "parser aborted".to_string());
      return Err(MinifyError::Parse(format!(
        "failed to parse script {}: {detail}",
        path.display()
      )));
    }

    let printed = Codegen::new()
      .with_options(CodegenOptions::minify())
      .build(&program);
    Ok(printed.code)
  }
}

/// Stylesheet minifier printing the parsed stylesheet without whitespace or comments.
#[derive(Debug, Clone, Copy, Default)]
pub struct StylesheetMinifier;

impl Minifier for StylesheetMinifier {
  fn minify(&self, source: &str, path: &Path) -> Result<String, MinifyError> {
    let stylesheet = StyleSheet::parse(
      source,
      ParserOptions {
        filename: path.to_string_lossy().to_string(),
        ..Default::default()
      },
    )
    .map_err(|e| {
      MinifyError::Parse(format!("failed to parse stylesheet {}: {:?}", path.display(), e))
    })?;

    let printed = stylesheet
      .to_css(PrinterOptions {
        minify: true,
        ..Default::default()
      })
      .map_err(|e| {
        MinifyError::Print(format!("failed to print stylesheet {}: {:?}", path.display(), e))
      })?;
    Ok(printed.code)
  }
}

/// Minifiers keyed by extension; extensions without one pass through unchanged.
pub struct MinifierRegistry {
  minifiers: BTreeMap<String, Box<dyn Minifier>>,
}

impl MinifierRegistry {
  /// Registry without any minifier.
  pub fn empty() -> Self {
    Self {
      minifiers: BTreeMap::new(),
    }
  }

  /// Script and stylesheet minifiers for `.js` and `.css`.
  pub fn standard() -> Self {
    let mut registry = Self::empty();
    registry.register(".js", ScriptMinifier);
    registry.register(".css", StylesheetMinifier);
    registry
  }

  /// Register (or replace) the minifier for `extension`.
  pub fn register(&mut self, extension: impl Into<String>, minifier: impl Minifier + 'static) {
    self.minifiers.insert(extension.into(), Box::new(minifier));
  }

  /// Minifier registered for `extension`.
  pub fn get(&self, extension: &str) -> Option<&dyn Minifier> {
    self.minifiers.get(extension).map(|minifier| minifier.as_ref())
  }

  /// Minify `content` when a minifier is registered for `extension`.
  ///
  /// Content the minifier cannot parse passes through unchanged; only a failure to print
  /// parsed content is an error.
  pub fn apply(&self, extension: &str, content: String, path: &Path) -> BundleResult<String> {
    let Some(minifier) = self.get(extension) else {
      return Ok(content);
    };
    match minifier.minify(&content, path) {
      Ok(minified) => Ok(minified),
      Err(MinifyError::Parse(reason)) => {
        warn!(resource = %path.display(), %reason, "bundling resource unminified");
        Ok(content)
      }
      Err(MinifyError::Print(message)) => Err(BundleError::Minify {
        path: path.to_path_buf(),
        message,
      }),
    }
  }
}

impl Default for MinifierRegistry {
  fn default() -> Self {
    Self::standard()
  }
}

impl fmt::Debug for MinifierRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MinifierRegistry")
      .field("extensions", &self.minifiers.keys().collect::<Vec<_>>())
      .finish()
  }
}
