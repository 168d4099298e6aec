//! NetBox API wire types

use serde::{Deserialize, Serialize, Serializer};

/// Nested reference to a related object, e.g. `"site": {"id": 1, ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedRef {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl NestedRef {
    pub fn new(id: i64) -> Self {
        Self { id, display: None }
    }
}

/// Tag as embedded in other objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub slug: String,
}

/// Tag object from `/api/extras/tags/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<Tag> for NestedTag {
    fn from(tag: Tag) -> Self {
        Self {
            id: Some(tag.id),
            name: tag.name,
            slug: tag.slug,
        }
    }
}

/// Body for creating a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritableTag {
    pub name: String,
    pub slug: String,
}

/// Paginated list response
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub count: i64,
    pub results: Vec<T>,
}

/// Device as returned by `/api/dcim/devices/`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub device_type: Option<NestedRef>,
    #[serde(default)]
    pub device_role: Option<NestedRef>,
    /// NetBox 3.6 added `role`; 4.0 dropped `device_role`
    #[serde(default)]
    pub role: Option<NestedRef>,
    #[serde(default)]
    pub tenant: Option<NestedRef>,
    #[serde(default)]
    pub location: Option<NestedRef>,
    #[serde(default)]
    pub site: Option<NestedRef>,
    #[serde(default)]
    pub primary_ip4: Option<NestedRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub serial: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comments: String,
    #[serde(default)]
    pub tags: Vec<NestedTag>,
}

impl Device {
    pub fn role(&self) -> Option<&NestedRef> {
        self.device_role.as_ref().or(self.role.as_ref())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A field of a write payload: left out, sent as `null`, or sent with a value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    #[default]
    Omitted,
    Null,
    Set(T),
}

impl<T> Field<T> {
    pub fn is_omitted(&self) -> bool {
        matches!(self, Field::Omitted)
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Set(v),
            None => Field::Omitted,
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Set(v) => v.serialize(serializer),
            Field::Omitted | Field::Null => serializer.serialize_none(),
        }
    }
}

/// Body for `POST`/`PUT` on `/api/dcim/devices/`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WritableDevice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Field::is_omitted")]
    pub device_type: Field<i64>,
    /// Accepted up to NetBox 3.7
    #[serde(skip_serializing_if = "Field::is_omitted")]
    pub device_role: Field<i64>,
    /// Accepted from NetBox 3.6; required from 4.0
    #[serde(skip_serializing_if = "Field::is_omitted")]
    pub role: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_omitted")]
    pub site: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_omitted")]
    pub tenant: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_omitted")]
    pub location: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_omitted")]
    pub primary_ip4: Field<i64>,
    #[serde(skip_serializing_if = "Field::is_omitted")]
    pub serial: Field<String>,
    #[serde(skip_serializing_if = "Field::is_omitted")]
    pub comments: Field<String>,
    pub tags: Vec<NestedTag>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_parsing_with_null_relations() {
        let body = json!({
            "id": 42,
            "name": "sw1",
            "device_type": {"id": 5, "display": "EX4300"},
            "device_role": {"id": 2},
            "site": {"id": 1},
            "tenant": null,
            "location": null,
            "primary_ip4": null,
            "serial": "",
            "comments": null,
            "tags": []
        });

        let device: Device = serde_json::from_value(body).unwrap();
        assert_eq!(device.id, 42);
        assert_eq!(device.device_type.as_ref().map(|r| r.id), Some(5));
        assert_eq!(device.role().map(|r| r.id), Some(2));
        assert!(device.tenant.is_none());
        assert!(device.comments.is_empty());
    }

    #[test]
    fn test_device_role_fallback() {
        let body = json!({"id": 1, "role": {"id": 9}});
        let device: Device = serde_json::from_value(body).unwrap();
        assert_eq!(device.role().map(|r| r.id), Some(9));

        let body = json!({"id": 1, "role": {"id": 9}, "device_role": {"id": 9}});
        let device: Device = serde_json::from_value(body).unwrap();
        assert_eq!(device.role().map(|r| r.id), Some(9));
    }

    #[test]
    fn test_writable_device_field_states() {
        let data = WritableDevice {
            name: Some("sw1".to_string()),
            device_type: Field::Set(5),
            tenant: Field::Null,
            comments: Field::Set(" ".to_string()),
            ..Default::default()
        };

        let value = serde_json::to_value(&data).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj["device_type"], json!(5));
        assert!(obj["tenant"].is_null());
        assert_eq!(obj["comments"], json!(" "));
        assert!(!obj.contains_key("location"));
        assert!(!obj.contains_key("serial"));
        assert_eq!(obj["tags"], json!([]));
    }

    #[test]
    fn test_writable_device_sends_both_role_keys() {
        let data = WritableDevice {
            device_role: Field::Set(2),
            role: Field::Set(2),
            ..Default::default()
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["device_role"], json!(2));
        assert_eq!(value["role"], json!(2));
    }

    #[test]
    fn test_field_from_option() {
        assert_eq!(Field::from(Some(3)), Field::Set(3));
        assert!(Field::<i64>::from(None).is_omitted());
        assert!(!Field::<i64>::Null.is_omitted());
    }

    #[test]
    fn test_tag_page_parsing() {
        let body = json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{"id": 7, "name": "core", "slug": "core", "color": "9e9e9e"}]
        });
        let page: Page<Tag> = serde_json::from_value(body).unwrap();
        assert_eq!(page.count, 1);
        let nested: NestedTag = page.results[0].clone().into();
        assert_eq!(nested.id, Some(7));
        assert_eq!(nested.slug, "core");
    }
}
