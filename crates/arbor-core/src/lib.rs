pub mod context;
pub mod error;
pub mod resource;
pub mod user;

pub use context::{Context, PURPOSE};
pub use error::{CoreError, ErrorCategory, Result};
pub use resource::{
    ConnectionDetail, DirectoryResource, LeafBuilder, LeafResource, MAX_HIERARCHY_DEPTH, Resource,
    ResourceId, ResourceKind, SystemResource,
};
pub use user::User;
