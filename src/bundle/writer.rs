//! Concatenate resources of each bundle-eligible type into one minified file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::bundle::digest::ContentDigest;
use crate::bundle::minify::MinifierRegistry;
use crate::bundle::styles::StylesheetStaging;
use crate::error::{BundleError, BundleResult};
use crate::models::{ResolvedResource, ResourcesByType};

/// Bundles written for one component and the version derived from their bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOutput {
  /// Hex digest over every bundled byte, in bundle-then-resource order.
  pub version: String,
  /// Bundle filenames relative to the output directory, in write order.
  pub bundles: Vec<String>,
}

/// Writes `bundle<ext>` files into a component output directory.
#[derive(Debug)]
pub struct BundleWriter<'a> {
  output_dir: &'a Path,
  extensions: &'a [String],
  stylesheet_extension: &'a str,
  minifiers: &'a MinifierRegistry,
}

impl<'a> BundleWriter<'a> {
  /// Create a writer for `output_dir` bundling `extensions` in the given order.
  pub fn new(
    output_dir: &'a Path,
    extensions: &'a [String],
    stylesheet_extension: &'a str,
    minifiers: &'a MinifierRegistry,
  ) -> Self {
    Self {
      output_dir,
      extensions,
      stylesheet_extension,
      minifiers,
    }
  }

  /// Write every non-empty bundle and compute the component version.
  pub fn write_bundles(&self, resources: &ResourcesByType) -> BundleResult<BundleOutput> {
    let mut digest = ContentDigest::new();
    let mut staging = StylesheetStaging::new(self.output_dir);
    let mut bundles = Vec::new();

    for extension in self.extensions {
      let Some(entries) = resources.get(extension).filter(|entries| !entries.is_empty()) else {
        continue;
      };
      let name = self.write_bundle(extension, entries, &mut digest, &mut staging)?;
      bundles.push(name);
    }

    Ok(BundleOutput {
      version: digest.finish(),
      bundles,
    })
  }

  /// Write one bundle, folding every written byte into `digest`.
  pub fn write_bundle(
    &self,
    extension: &str,
    entries: &[ResolvedResource],
    digest: &mut ContentDigest,
    staging: &mut StylesheetStaging,
  ) -> BundleResult<String> {
    let name = format!("bundle{extension}");
    let path = self.output_dir.join(&name);
    let file = File::create(&path).map_err(|err| write_error(&path, err))?;
    let mut out = BufWriter::new(file);

    for entry in entries {
      let mut content = fs::read(&entry.path).map_err(|err| BundleError::ResourceRead {
        path: entry.path.clone(),
        source: err,
      })?;
      if extension == self.stylesheet_extension {
        content = staging.rewrite(&content, &entry.path)?;
      }
      let mut content = match String::from_utf8(content) {
        Ok(text) => self.minifiers.apply(extension, text, &entry.path)?.into_bytes(),
        Err(err) => {
          warn!(resource = %entry.path.display(), "resource is not valid UTF-8, bundling it unminified");
          err.into_bytes()
        }
      };
      content.push(b'\n');

      out
        .write_all(&content)
        .map_err(|err| write_error(&path, err))?;
      digest.update(&content);
      debug!(bundle = %name, resource = %entry.path.display(), bytes = content.len(), "appended resource");
    }

    out.flush().map_err(|err| write_error(&path, err))?;
    info!(bundle = %path.display(), resources = entries.len(), "wrote bundle");
    Ok(name)
  }
}

fn write_error(path: &Path, source: std::io::Error) -> BundleError {
  BundleError::Write {
    path: PathBuf::from(path),
    source,
  }
}
