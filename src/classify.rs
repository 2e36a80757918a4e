//! Order inclusions by dependency and group the resolved resources by extension.

use tracing::debug;

use crate::error::{BundleError, BundleResult};
use crate::models::{InclusionSet, ResolvedResource, ResourceId, ResourcesByType};
use crate::registry::Registry;
use crate::toposort::topological_sort;

/// Order `inclusions` topologically and resolve each resource against the registry.
///
/// Every extension list keeps the relative dependency order. An empty inclusion set yields an
/// empty mapping.
pub fn resources_by_type<R: Registry + ?Sized>(
  registry: &R,
  inclusions: &InclusionSet,
) -> BundleResult<ResourcesByType> {
  let mut resources = ResourcesByType::new();
  if inclusions.is_empty() {
    return Ok(resources);
  }

  let ordered = order_inclusions(inclusions)?;

  for id in ordered {
    let inclusion = inclusions.get(&id).ok_or_else(|| BundleError::UnknownDependency {
      dependent: dependent_of(inclusions, &id),
      dependency: id.to_string(),
    })?;
    let resource = &inclusion.resource;
    let path = registry
      .resolve_path(
        &resource.collection,
        &resource.package,
        &resource.version,
        &resource.file_path,
      )
      .map_err(|err| BundleError::registry(format!("resolve {id}"), err))?;

    debug!(resource = %id, path = %path.display(), ext = %resource.extension, "classified resource");
    resources
      .entry(resource.extension.clone())
      .or_default()
      .push(ResolvedResource {
        package: resource.package.clone(),
        path,
      });
  }

  Ok(resources)
}

/// Dependency order of every inclusion, including nodes only reachable as dependencies.
pub fn order_inclusions(inclusions: &InclusionSet) -> BundleResult<Vec<ResourceId>> {
  topological_sort(
    inclusions
      .inclusions()
      .iter()
      .map(|inclusion| inclusion.resource.id()),
    |id| {
      inclusions
        .get(id)
        .map(|inclusion| inclusion.dependencies.clone())
        .unwrap_or_default()
    },
  )
  .map_err(|err| BundleError::Cycle {
    cycle: err.cycle.iter().map(ToString::to_string).collect(),
  })
}

fn dependent_of(inclusions: &InclusionSet, missing: &ResourceId) -> String {
  inclusions
    .inclusions()
    .iter()
    .find(|inclusion| inclusion.dependencies.contains(missing))
    .map(|inclusion| inclusion.resource.id().to_string())
    .unwrap_or_default()
}
