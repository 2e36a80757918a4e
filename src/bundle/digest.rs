//! Content digest that becomes the component version.

use sha2::{Digest, Sha256};

/// Running digest over every byte written to the bundles of one component build.
///
/// The resulting hex string is the component version, so bundles must be folded in the order
/// they are written.
#[derive(Debug, Clone, Default)]
pub struct ContentDigest {
  hasher: Sha256,
  bytes: u64,
}

impl ContentDigest {
  /// Start an empty digest.
  pub fn new() -> Self {
    Self::default()
  }

  /// Fold bytes into the digest.
  pub fn update(&mut self, bytes: &[u8]) {
    self.hasher.update(bytes);
    self.bytes += bytes.len() as u64;
  }

  /// Number of bytes folded in so far.
  pub fn len(&self) -> u64 {
    self.bytes
  }

  /// Returns `true` when nothing was folded in.
  pub fn is_empty(&self) -> bool {
    self.bytes == 0
  }

  /// Lowercase hex encoding of the digest.
  pub fn finish(self) -> String {
    format!("{:x}", self.hasher.finalize())
  }
}
