//! NetBox Provider
//!
//! This crate implements the `netbox_device` resource: it translates a
//! declarative attribute set into NetBox REST API calls and reconciles the
//! returned device back into state.

pub mod client;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod state;
pub mod tags;

pub use client::NetBoxClient;
pub use provider::{Diagnostic, NetBoxProvider, Severity};
pub use resources::{device::DeviceResource, Resource};
pub use state::DynamicValue;
