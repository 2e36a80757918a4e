//! Bundling pipeline: stylesheet reference staging, minification and concatenation.

pub mod digest;
pub mod minify;
pub mod styles;
pub mod writer;

pub use digest::ContentDigest;
pub use minify::{Minifier, MinifierRegistry, MinifyError, ScriptMinifier, StylesheetMinifier};
pub use styles::StylesheetStaging;
pub use writer::{BundleOutput, BundleWriter};
