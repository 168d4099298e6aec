//! Resource Implementations
//!
//! Implements the CRUD operations for each resource type.

pub mod device;

use netbox_common::Result;

use crate::client::NetBoxClient;
use crate::schema::Schema;
use crate::state::DynamicValue;

/// Trait for resource operations
#[async_trait::async_trait]
pub trait Resource {
    /// Resource type name
    fn type_name() -> &'static str;

    /// Declared schema of the resource
    fn schema() -> Schema;

    /// Create a new resource and return its normalized state
    async fn create(client: &NetBoxClient, config: &DynamicValue) -> Result<DynamicValue>;

    /// Read an existing resource; `None` means it no longer exists remotely
    async fn read(client: &NetBoxClient, state: &DynamicValue) -> Result<Option<DynamicValue>>;

    /// Update an existing resource
    async fn update(client: &NetBoxClient, prior: &DynamicValue, planned: &DynamicValue) -> Result<DynamicValue>;

    /// Delete a resource
    async fn delete(client: &NetBoxClient, state: &DynamicValue) -> Result<()>;
}
