#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod builder;
pub mod bundle;
pub mod classify;
pub mod config;
pub mod error;
pub mod install;
pub mod layout;
pub mod manifest;
pub mod models;
pub mod registry;
pub mod resources;
pub mod toposort;

#[cfg(all(test, unix))]
mod test_support;

pub use builder::Bundler;
pub use config::BundlerConfig;
pub use error::{BuildStage, BundleError, BundleResult};
pub use install::{DirectoryInstaller, InstallRequest, PackageInstaller};
pub use layout::BundleLayout;
pub use models::{
  BundleManifest, ComponentBuild, ComponentRef, Inclusion, InclusionSet, Resource, ResourceId,
  ResolvedResource, ResourcesByType,
};
pub use registry::{Registry, StaticRegistry};
