//! Device Resource handler
//!
//! Maps the `netbox_device` attribute set onto `/api/dcim/devices/`.

use tracing::info;

use netbox_common::{Device, Error, Field, NestedTag, Result, WritableDevice};

use super::Resource;
use crate::client::NetBoxClient;
use crate::schema::{self, Schema};
use crate::state::{
    attr_changed, get_optional_int_attr, get_optional_string_attr, get_string_attr,
    get_string_set_attr, make_state, optional_int_value, optional_string_value, string_set_value,
    string_value, DynamicValue,
};
use crate::tags::{resolve_tags, tag_names};

/// Value NetBox interprets as "clear this text field"; an empty string is ignored.
pub const CLEAR_SENTINEL: &str = " ";

pub struct DeviceResource;

#[async_trait::async_trait]
impl Resource for DeviceResource {
    fn type_name() -> &'static str {
        "netbox_device"
    }

    fn schema() -> Schema {
        schema::device_schema()
    }

    async fn create(client: &NetBoxClient, config: &DynamicValue) -> Result<DynamicValue> {
        let tags = resolve_tags(client, &get_string_set_attr(config, "tags")).await?;
        let data = create_payload(config, tags);

        let device = client.create_device(&data).await?;
        info!("Created device {} ({:?})", device.id, device.name);

        let state = make_state(vec![("id", string_value(device.id.to_string()))]);
        match Self::read(client, &state).await {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Err(created_unread(device.id, Error::not_found("device", device.id))),
            Err(e) => Err(created_unread(device.id, e)),
        }
    }

    async fn read(client: &NetBoxClient, state: &DynamicValue) -> Result<Option<DynamicValue>> {
        let Some(id) = parse_id(state)? else {
            return Ok(None);
        };

        match client.get_device(id).await {
            Ok(device) => Ok(Some(device_to_state(&device))),
            Err(e) if e.is_not_found() => {
                info!("Device {} no longer exists, removing from state", id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(client: &NetBoxClient, prior: &DynamicValue, planned: &DynamicValue) -> Result<DynamicValue> {
        let id = parse_id(prior)?
            .or(parse_id(planned)?)
            .ok_or_else(|| Error::InvalidId(String::new()))?;

        let tags = resolve_tags(client, &get_string_set_attr(planned, "tags")).await?;
        let data = update_payload(prior, planned, tags);

        client.update_device(id, &data).await?;
        info!("Updated device {}", id);

        let state = make_state(vec![("id", string_value(id.to_string()))]);
        Self::read(client, &state)
            .await?
            .ok_or_else(|| Error::not_found("device", id))
    }

    async fn delete(client: &NetBoxClient, state: &DynamicValue) -> Result<()> {
        let id = parse_id(state)?.ok_or_else(|| Error::InvalidId(String::new()))?;
        client.delete_device(id).await?;
        info!("Deleted device {}", id);
        Ok(())
    }
}

fn created_unread(id: i64, source: Error) -> Error {
    Error::CreatedUnread {
        kind: "device".to_string(),
        id: id.to_string(),
        source: Box::new(source),
    }
}

/// Parse the decimal identifier kept in state; an empty id means "absent"
fn parse_id(state: &DynamicValue) -> Result<Option<i64>> {
    let raw = get_string_attr(state, "id");
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| Error::InvalidId(raw))
}

fn create_payload(config: &DynamicValue, tags: Vec<NestedTag>) -> WritableDevice {
    WritableDevice {
        name: Some(get_string_attr(config, "name")),
        device_type: get_optional_int_attr(config, "device_type_id").into(),
        device_role: get_optional_int_attr(config, "role_id").into(),
        role: get_optional_int_attr(config, "role_id").into(),
        site: get_optional_int_attr(config, "site_id").into(),
        tenant: get_optional_int_attr(config, "tenant_id").into(),
        location: get_optional_int_attr(config, "location_id").into(),
        primary_ip4: Field::Omitted,
        serial: get_optional_string_attr(config, "serial").into(),
        comments: get_optional_string_attr(config, "comments").into(),
        tags,
    }
}

fn update_payload(prior: &DynamicValue, planned: &DynamicValue, tags: Vec<NestedTag>) -> WritableDevice {
    WritableDevice {
        name: Some(get_string_attr(planned, "name")),
        device_type: get_optional_int_attr(planned, "device_type_id").into(),
        device_role: get_optional_int_attr(planned, "role_id").into(),
        role: get_optional_int_attr(planned, "role_id").into(),
        site: get_optional_int_attr(planned, "site_id").into(),
        tenant: relation_update(prior, planned, "tenant_id"),
        location: relation_update(prior, planned, "location_id"),
        primary_ip4: get_optional_int_attr(planned, "primary_ipv4").into(),
        serial: text_update(prior, planned, "serial"),
        comments: text_update(prior, planned, "comments"),
        tags,
    }
}

/// Nullable relation: a removed value is sent as explicit null
fn relation_update(prior: &DynamicValue, planned: &DynamicValue, key: &str) -> Field<i64> {
    match get_optional_int_attr(planned, key) {
        Some(id) => Field::Set(id),
        None if attr_changed(prior, planned, key) => Field::Null,
        None => Field::Omitted,
    }
}

/// Free-text field: only sent when changed, a removed value is sent as the sentinel
fn text_update(prior: &DynamicValue, planned: &DynamicValue, key: &str) -> Field<String> {
    if !attr_changed(prior, planned, key) {
        return Field::Omitted;
    }
    match get_optional_string_attr(planned, key) {
        Some(value) => Field::Set(value),
        None => Field::Set(CLEAR_SENTINEL.to_string()),
    }
}

fn device_to_state(device: &Device) -> DynamicValue {
    let rel = |r: Option<&netbox_common::NestedRef>| optional_int_value(r.map(|r| r.id));

    make_state(vec![
        ("id", string_value(device.id.to_string())),
        ("name", optional_string_value(device.name.as_deref())),
        ("device_type_id", rel(device.device_type.as_ref())),
        ("tenant_id", rel(device.tenant.as_ref())),
        ("location_id", rel(device.location.as_ref())),
        ("role_id", rel(device.role())),
        ("site_id", rel(device.site.as_ref())),
        ("primary_ipv4", rel(device.primary_ip4.as_ref())),
        ("serial", optional_string_value(Some(&device.serial))),
        ("comments", optional_string_value(Some(&device.comments))),
        ("tags", string_set_value(&tag_names(&device.tags))),
    ])
}
