//! Building the resource tree from flat configuration entries.
//!
//! Configuration lists resources as `(id, kind, parent)` rows. Rows may
//! appear in any order; each is materialised after its parent. Dangling
//! parents, cycles, leaf parents, duplicate ids and chains deeper than
//! [`MAX_HIERARCHY_DEPTH`] are reported as malformed hierarchies.

use std::collections::HashMap;

use indexmap::IndexMap;

use arbor_core::{CoreError, MAX_HIERARCHY_DEPTH, Resource, ResourceId, ResourceKind};

use crate::settings::ResourceSpec;

/// Resources materialised from configuration, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    resources: IndexMap<ResourceId, Resource>,
}

impl ResourceCatalog {
    /// Build every resource described by `specs`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedHierarchy`] if the rows do not form a
    /// tree of system roots, and [`CoreError::InvalidResource`] if a row is
    /// inconsistent with its kind.
    pub fn from_specs(specs: &[ResourceSpec]) -> Result<Self, CoreError> {
        let mut by_id: IndexMap<&str, &ResourceSpec> = IndexMap::with_capacity(specs.len());
        for spec in specs {
            if by_id.insert(spec.id.as_str(), spec).is_some() {
                return Err(CoreError::malformed_hierarchy(
                    spec.id.as_str(),
                    "duplicate resource id",
                ));
            }
        }

        let mut builder = Builder {
            by_id: &by_id,
            built: HashMap::with_capacity(by_id.len()),
        };
        let mut resources = IndexMap::with_capacity(by_id.len());
        for id in by_id.keys() {
            let resource = builder.resolve(id)?;
            resources.insert(resource.id().clone(), resource);
        }

        tracing::debug!(resources = resources.len(), "Resource hierarchy built");
        Ok(Self { resources })
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(&ResourceId::new(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Leaf resources only, in declaration order.
    pub fn leaves(&self) -> impl Iterator<Item = &Resource> {
        self.iter().filter(|resource| resource.is_leaf())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

struct Builder<'a> {
    by_id: &'a IndexMap<&'a str, &'a ResourceSpec>,
    built: HashMap<String, Resource>,
}

impl Builder<'_> {
    /// Materialise `id` and any unbuilt ancestors.
    ///
    /// Walks up to the first built ancestor or root, then builds back down.
    fn resolve(&mut self, id: &str) -> Result<Resource, CoreError> {
        if let Some(resource) = self.built.get(id) {
            return Ok(resource.clone());
        }

        let mut pending: Vec<&ResourceSpec> = Vec::new();
        let mut cursor = Some(id);
        let mut base: Option<Resource> = None;

        while let Some(current) = cursor {
            if let Some(resource) = self.built.get(current) {
                base = Some(resource.clone());
                break;
            }
            if pending.iter().any(|spec| spec.id == current) {
                return Err(CoreError::malformed_hierarchy(
                    id,
                    format!("parent cycle through {current}"),
                ));
            }
            if pending.len() == MAX_HIERARCHY_DEPTH {
                return Err(CoreError::malformed_hierarchy(
                    id,
                    format!("parent chain exceeds {MAX_HIERARCHY_DEPTH} levels"),
                ));
            }

            let spec = self.by_id.get(current).copied().ok_or_else(|| {
                let child = pending.last().map_or(id, |spec| spec.id.as_str());
                CoreError::malformed_hierarchy(child, format!("unknown parent {current}"))
            })?;
            pending.push(spec);
            cursor = parent_of(spec)?;
        }

        let mut parent = base;
        while let Some(spec) = pending.pop() {
            let resource = materialise(spec, parent.as_ref())?;
            self.built.insert(spec.id.clone(), resource.clone());
            parent = Some(resource);
        }

        parent.ok_or_else(|| CoreError::malformed_hierarchy(id, "resource could not be built"))
    }
}

/// The declared parent, checked against the row's kind.
fn parent_of(spec: &ResourceSpec) -> Result<Option<&str>, CoreError> {
    match (spec.kind, spec.parent.as_deref()) {
        (ResourceKind::System, None) => Ok(None),
        (ResourceKind::System, Some(_)) => Err(CoreError::invalid_resource(format!(
            "system {} cannot have a parent",
            spec.id
        ))),
        (ResourceKind::Directory | ResourceKind::Leaf, Some(parent)) => Ok(Some(parent)),
        (kind, None) => Err(CoreError::malformed_hierarchy(
            spec.id.as_str(),
            format!("{kind} requires a parent"),
        )),
    }
}

fn materialise(spec: &ResourceSpec, parent: Option<&Resource>) -> Result<Resource, CoreError> {
    let needs_parent = || CoreError::malformed_hierarchy(spec.id.as_str(), "missing parent");

    match spec.kind {
        ResourceKind::System => Ok(Resource::system(spec.id.as_str())),
        ResourceKind::Directory => {
            Resource::directory(spec.id.as_str(), parent.ok_or_else(needs_parent)?)
        }
        ResourceKind::Leaf => {
            let mut builder = Resource::leaf(spec.id.as_str(), parent.ok_or_else(needs_parent)?)
                .resource_type(spec.resource_type.clone().unwrap_or_default())
                .serialised_format(spec.format.clone().unwrap_or_default());
            if let Some(detail) = &spec.connection {
                builder = builder.connection_detail(detail.clone());
            }
            builder.build()
        }
    }
}
