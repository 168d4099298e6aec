//! Provider and resource schemas

use serde::Serialize;

use crate::state::DynamicValue;

/// Attribute value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int,
    Bool,
    SetOfString,
}

impl AttributeType {
    /// Whether a non-null value has this type
    pub fn accepts(&self, value: &DynamicValue) -> bool {
        match self {
            AttributeType::String => value.as_string().is_some(),
            AttributeType::Int => value.as_i64().is_some(),
            AttributeType::Bool => value.as_bool().is_some(),
            AttributeType::SetOfString => value
                .as_list()
                .map(|items| items.iter().all(|i| i.as_string().is_some()))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'static str,
}

impl Attribute {
    fn new(name: &'static str, kind: AttributeType) -> Self {
        Self {
            name,
            kind,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            description: "",
        }
    }

    pub fn required(name: &'static str, kind: AttributeType) -> Self {
        Self { required: true, ..Self::new(name, kind) }
    }

    pub fn optional(name: &'static str, kind: AttributeType) -> Self {
        Self { optional: true, ..Self::new(name, kind) }
    }

    pub fn computed(name: &'static str, kind: AttributeType) -> Self {
        Self { computed: true, ..Self::new(name, kind) }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub version: i64,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'static str,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Provider configuration block
pub fn provider_schema() -> Schema {
    use AttributeType::*;

    Schema {
        version: 0,
        description: "",
        attributes: vec![
            Attribute::optional("server_url", String)
                .describe("Location of NetBox server including scheme and optional port. Falls back to NETBOX_SERVER_URL."),
            Attribute::optional("api_token", String)
                .sensitive()
                .describe("NetBox API authentication token. Falls back to NETBOX_API_TOKEN."),
            Attribute::optional("allow_insecure_https", Bool)
                .describe("Skip TLS certificate verification. Falls back to NETBOX_ALLOW_INSECURE_HTTPS."),
        ],
    }
}

/// `netbox_device` resource
pub fn device_schema() -> Schema {
    use AttributeType::*;

    Schema {
        version: 0,
        description: "Every piece of hardware which is installed within a site or rack exists in NetBox as a device.",
        attributes: vec![
            Attribute::computed("id", String),
            Attribute::required("name", String),
            Attribute::required("device_type_id", Int),
            Attribute::optional("tenant_id", Int),
            Attribute::optional("location_id", Int),
            Attribute::required("role_id", Int),
            Attribute::optional("serial", String),
            Attribute::required("site_id", Int),
            Attribute::optional("comments", String),
            Attribute::optional("tags", SetOfString),
            Attribute::computed("primary_ipv4", Int)
                .describe("ID of the primary IPv4 address assigned to the device."),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_schema_flags() {
        let schema = device_schema();

        let required: Vec<_> = schema.attributes.iter()
            .filter(|a| a.required)
            .map(|a| a.name)
            .collect();
        assert_eq!(required, vec!["name", "device_type_id", "role_id", "site_id"]);

        let primary = schema.attribute("primary_ipv4").unwrap();
        assert!(primary.computed && !primary.optional && !primary.required);
        assert_eq!(schema.attribute("tags").unwrap().kind, AttributeType::SetOfString);
        assert!(schema.attribute("rack_id").is_none());
    }

    #[test]
    fn test_attribute_type_accepts() {
        let tags = DynamicValue::List(vec![DynamicValue::String("a".into())]);
        assert!(AttributeType::SetOfString.accepts(&tags));
        assert!(!AttributeType::Int.accepts(&tags));
        assert!(AttributeType::String.accepts(&DynamicValue::String("x".into())));
        assert!(AttributeType::Int.accepts(&DynamicValue::Number(5.into())));
    }

    #[test]
    fn test_api_token_is_sensitive() {
        let schema = provider_schema();
        assert!(schema.attribute("api_token").unwrap().sensitive);
        assert!(!schema.attribute("server_url").unwrap().sensitive);
    }
}
