//! Resource hierarchy model.
//!
//! Resources form a tree rooted at a [`Resource::System`]. Directories and
//! leaves hold their parent behind an [`Arc`], so a resource value always
//! carries its complete ancestor chain and the chain cannot contain a cycle.
//! Only leaves carry a data type and serialised format.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Maximum number of nodes in an ancestor chain, root and resource included.
pub const MAX_HIERARCHY_DEPTH: usize = 64;

/// Stable, unique identifier of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How a leaf resource is reached by a data reader.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionDetail {
    /// Name of the service able to read the resource.
    pub service: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl ConnectionDetail {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Discriminant of a [`Resource`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    System,
    Directory,
    Leaf,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Directory => write!(f, "directory"),
            Self::Leaf => write!(f, "leaf"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SystemResource {
    id: ResourceId,
}

#[derive(Debug, Clone)]
pub struct DirectoryResource {
    id: ResourceId,
    parent: Arc<Resource>,
}

#[derive(Debug, Clone)]
pub struct LeafResource {
    id: ResourceId,
    parent: Arc<Resource>,
    resource_type: String,
    serialised_format: String,
    connection_detail: Option<ConnectionDetail>,
}

impl LeafResource {
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn serialised_format(&self) -> &str {
        &self.serialised_format
    }

    pub fn connection_detail(&self) -> Option<&ConnectionDetail> {
        self.connection_detail.as_ref()
    }
}

/// A node in the access-controlled storage hierarchy.
///
/// Equality and hashing use the resource id only.
#[derive(Debug, Clone)]
pub enum Resource {
    System(SystemResource),
    Directory(DirectoryResource),
    Leaf(LeafResource),
}

impl Resource {
    /// Create a root resource.
    pub fn system(id: impl Into<ResourceId>) -> Self {
        Self::System(SystemResource { id: id.into() })
    }

    /// Create a directory below `parent`.
    ///
    /// Fails if `parent` is a leaf or the chain would exceed
    /// [`MAX_HIERARCHY_DEPTH`].
    pub fn directory(id: impl Into<ResourceId>, parent: &Resource) -> Result<Self> {
        let id = id.into();
        let parent = attach_parent(&id, parent)?;
        Ok(Self::Directory(DirectoryResource { id, parent }))
    }

    /// Start building a leaf resource below `parent`.
    pub fn leaf(id: impl Into<ResourceId>, parent: &Resource) -> LeafBuilder {
        LeafBuilder {
            id: id.into(),
            parent: parent.clone(),
            resource_type: None,
            serialised_format: None,
            connection_detail: None,
        }
    }

    pub fn id(&self) -> &ResourceId {
        match self {
            Self::System(system) => &system.id,
            Self::Directory(directory) => &directory.id,
            Self::Leaf(leaf) => &leaf.id,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::System(_) => ResourceKind::System,
            Self::Directory(_) => ResourceKind::Directory,
            Self::Leaf(_) => ResourceKind::Leaf,
        }
    }

    /// Parent resource; `None` only for a system root.
    pub fn parent(&self) -> Option<&Resource> {
        match self {
            Self::System(_) => None,
            Self::Directory(directory) => Some(&directory.parent),
            Self::Leaf(leaf) => Some(&leaf.parent),
        }
    }

    /// Declared data type; present only on leaves.
    pub fn resource_type(&self) -> Option<&str> {
        match self {
            Self::Leaf(leaf) => Some(&leaf.resource_type),
            Self::System(_) | Self::Directory(_) => None,
        }
    }

    /// Serialised format; present only on leaves.
    pub fn serialised_format(&self) -> Option<&str> {
        match self {
            Self::Leaf(leaf) => Some(&leaf.serialised_format),
            Self::System(_) | Self::Directory(_) => None,
        }
    }

    pub fn connection_detail(&self) -> Option<&ConnectionDetail> {
        match self {
            Self::Leaf(leaf) => leaf.connection_detail(),
            Self::System(_) | Self::Directory(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafResource> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::System(_) | Self::Directory(_) => None,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::System(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Number of ancestors above this resource.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(node) = current {
            depth += 1;
            current = node.parent();
        }
        depth
    }

    /// The chain from the root down to this resource, both inclusive.
    ///
    /// Fails fast with [`CoreError::MalformedHierarchy`] if the chain does not
    /// end at a system root within [`MAX_HIERARCHY_DEPTH`] nodes.
    pub fn ancestor_chain(&self) -> Result<Vec<&Resource>> {
        let mut chain = Vec::new();
        let mut current = Some(self);

        while let Some(node) = current {
            if chain.len() == MAX_HIERARCHY_DEPTH {
                return Err(CoreError::malformed_hierarchy(
                    self.id().as_str(),
                    format!("parent chain exceeds {MAX_HIERARCHY_DEPTH} levels"),
                ));
            }
            chain.push(node);
            current = node.parent();
        }

        let Some(Resource::System(_)) = chain.last() else {
            return Err(CoreError::malformed_hierarchy(
                self.id().as_str(),
                "parent chain does not terminate at a system root",
            ));
        };

        chain.reverse();
        Ok(chain)
    }

    /// Returns `true` if `other` appears in this resource's ancestor chain.
    pub fn is_descendant_of(&self, other: &Resource) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if node == other {
                return true;
            }
            current = node.parent();
        }
        false
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Builder for [`Resource::Leaf`]; type and format are mandatory.
#[derive(Debug, Clone)]
pub struct LeafBuilder {
    id: ResourceId,
    parent: Resource,
    resource_type: Option<String>,
    serialised_format: Option<String>,
    connection_detail: Option<ConnectionDetail>,
}

impl LeafBuilder {
    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn serialised_format(mut self, format: impl Into<String>) -> Self {
        self.serialised_format = Some(format.into());
        self
    }

    pub fn connection_detail(mut self, detail: ConnectionDetail) -> Self {
        self.connection_detail = Some(detail);
        self
    }

    pub fn build(self) -> Result<Resource> {
        let resource_type = self
            .resource_type
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CoreError::invalid_resource(format!("leaf {} requires a resource type", self.id))
            })?;
        let serialised_format = self
            .serialised_format
            .filter(|f| !f.is_empty())
            .ok_or_else(|| {
                CoreError::invalid_resource(format!(
                    "leaf {} requires a serialised format",
                    self.id
                ))
            })?;
        let parent = attach_parent(&self.id, &self.parent)?;

        Ok(Resource::Leaf(LeafResource {
            id: self.id,
            parent,
            resource_type,
            serialised_format,
            connection_detail: self.connection_detail,
        }))
    }
}

fn attach_parent(id: &ResourceId, parent: &Resource) -> Result<Arc<Resource>> {
    if parent.is_leaf() {
        return Err(CoreError::malformed_hierarchy(
            id.as_str(),
            format!("parent {} is a leaf and cannot hold children", parent.id()),
        ));
    }
    if parent.depth() + 2 > MAX_HIERARCHY_DEPTH {
        return Err(CoreError::malformed_hierarchy(
            id.as_str(),
            format!("parent chain exceeds {MAX_HIERARCHY_DEPTH} levels"),
        ));
    }
    Ok(Arc::new(parent.clone()))
}
