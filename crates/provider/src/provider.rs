//! NetBox Provider Implementation
//!
//! Entry points the host reconciliation engine calls. Every outcome is
//! reported as new state plus diagnostics; failures never panic or abort.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use netbox_common::ProviderConfig;

use crate::client::NetBoxClient;
use crate::resources::{device::DeviceResource, Resource};
use crate::schema::{self, Schema};
use crate::state::{get_optional_bool_attr, get_optional_string_attr, make_state, string_value, DynamicValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A problem reported back to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary, detail)
        }
    }

    pub fn for_attribute(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchemaResponse {
    pub provider: Schema,
    pub resource_schemas: BTreeMap<String, Schema>,
}

#[derive(Debug, Clone, Default)]
pub struct ReadResourceResponse {
    /// `None` when the remote object is gone
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyResourceChangeResponse {
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct ImportedResource {
    pub type_name: String,
    pub state: DynamicValue,
}

#[derive(Debug, Clone, Default)]
pub struct ImportResourceStateResponse {
    pub imported_resources: Vec<ImportedResource>,
    pub diagnostics: Vec<Diagnostic>,
}

fn unknown_type(type_name: &str) -> Diagnostic {
    Diagnostic::error("Unknown resource type", format!("Unknown resource type: {}", type_name))
}

/// NetBox Provider
pub struct NetBoxProvider {
    /// Client shared by every resource operation once configured
    client: Arc<RwLock<Option<NetBoxClient>>>,
    /// Settings from a config file, overridden by env and the provider block
    base_config: ProviderConfig,
}

impl NetBoxProvider {
    pub fn new(base_config: ProviderConfig) -> Self {
        Self {
            client: Arc::new(RwLock::new(None)),
            base_config,
        }
    }

    /// Provider that uses an already constructed client
    pub fn with_client(client: NetBoxClient) -> Self {
        Self {
            client: Arc::new(RwLock::new(Some(client))),
            base_config: ProviderConfig::default(),
        }
    }

    async fn get_client(&self) -> Result<NetBoxClient, Diagnostic> {
        self.client.read().await.clone().ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "configure_provider must succeed before resources can be managed",
            )
        })
    }

    pub fn get_provider_schema(&self) -> ProviderSchemaResponse {
        info!("GetProviderSchema called");

        ProviderSchemaResponse {
            provider: schema::provider_schema(),
            resource_schemas: [(DeviceResource::type_name().to_string(), DeviceResource::schema())]
                .into_iter()
                .collect(),
        }
    }

    /// Check a resource configuration against its schema
    pub fn validate_resource_config(&self, type_name: &str, config: &DynamicValue) -> Vec<Diagnostic> {
        debug!("ValidateResourceConfig called for {}", type_name);

        let schema = match type_name {
            "netbox_device" => DeviceResource::schema(),
            _ => return vec![unknown_type(type_name)],
        };

        let mut diagnostics = Vec::new();

        for attr in &schema.attributes {
            match config.get(attr.name).filter(|v| !v.is_null()) {
                None if attr.required => diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument {:?} is required, but no definition was found.", attr.name),
                    )
                    .for_attribute(attr.name),
                ),
                Some(value) if !attr.kind.accepts(value) => diagnostics.push(
                    Diagnostic::error(
                        "Incorrect attribute value type",
                        format!("Attribute {:?} must be of type {:?}", attr.name, attr.kind),
                    )
                    .for_attribute(attr.name),
                ),
                _ => {}
            }
        }

        if let Some(map) = config.as_map() {
            let mut unknown: Vec<_> = map.keys()
                .filter(|k| schema.attribute(k).is_none())
                .collect();
            unknown.sort();
            for key in unknown {
                diagnostics.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!("An argument named {:?} is not expected here.", key),
                    )
                    .for_attribute(key),
                );
            }
        }

        diagnostics
    }

    /// Build the shared client from config file, environment and provider block
    pub async fn configure_provider(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        info!("ConfigureProvider called");

        let config = self.base_config.clone().with_env().with_overrides(
            get_optional_string_attr(config, "server_url"),
            get_optional_string_attr(config, "api_token"),
            get_optional_bool_attr(config, "allow_insecure_https"),
        );

        let client = match NetBoxClient::new(&config) {
            Ok(client) => client,
            Err(e) => {
                error!("Invalid provider configuration: {}", e);
                return vec![Diagnostic::error("Invalid provider configuration", e.to_string())];
            }
        };

        info!("Connecting to NetBox at {}", config.base_url());
        match client.status().await {
            Ok(status) => {
                let version = status
                    .get("netbox-version")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown");
                info!("Connected to NetBox {}", version);
            }
            Err(e) => {
                error!("Failed to connect to NetBox: {}", e);
                return vec![Diagnostic::error(
                    "Failed to connect to NetBox",
                    format!("Could not connect to {}: {}", config.base_url(), e),
                )];
            }
        }

        let mut diagnostics = vec![];
        if config.allow_insecure_https {
            warn!("TLS certificate verification is disabled");
            diagnostics.push(
                Diagnostic::warning(
                    "Insecure HTTPS",
                    "TLS certificates presented by the NetBox server are not verified",
                )
                .for_attribute("allow_insecure_https"),
            );
        }

        *self.client.write().await = Some(client);
        diagnostics
    }

    pub async fn read_resource(&self, type_name: &str, current_state: &DynamicValue) -> ReadResourceResponse {
        info!("ReadResource called for {}", type_name);

        if current_state.is_null() {
            return ReadResourceResponse::default();
        }

        let client = match self.get_client().await {
            Ok(client) => client,
            Err(d) => return ReadResourceResponse { new_state: None, diagnostics: vec![d] },
        };

        let result = match type_name {
            "netbox_device" => DeviceResource::read(&client, current_state).await,
            _ => return ReadResourceResponse { new_state: None, diagnostics: vec![unknown_type(type_name)] },
        };

        match result {
            Ok(new_state) => ReadResourceResponse { new_state, diagnostics: vec![] },
            Err(e) => ReadResourceResponse {
                // Prior state is kept; only a 404 empties it
                new_state: Some(current_state.clone()),
                diagnostics: vec![Diagnostic::error("Failed to read resource", e.to_string())],
            },
        }
    }

    /// Create, update or delete depending on which of prior/planned is null
    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        prior_state: &DynamicValue,
        planned_state: &DynamicValue,
    ) -> ApplyResourceChangeResponse {
        info!("ApplyResourceChange called for {}", type_name);

        if type_name != DeviceResource::type_name() {
            return ApplyResourceChangeResponse { new_state: None, diagnostics: vec![unknown_type(type_name)] };
        }

        let client = match self.get_client().await {
            Ok(client) => client,
            Err(d) => {
                return ApplyResourceChangeResponse {
                    new_state: Some(prior_state.clone()).filter(|s| !s.is_null()),
                    diagnostics: vec![d],
                }
            }
        };

        let result = match (prior_state.is_null(), planned_state.is_null()) {
            // Create
            (true, false) => DeviceResource::create(&client, planned_state).await.map(Some),
            // Delete
            (false, true) => DeviceResource::delete(&client, prior_state).await.map(|_| None),
            // Update
            (false, false) => DeviceResource::update(&client, prior_state, planned_state).await.map(Some),
            // No change
            (true, true) => Ok(None),
        };

        match result {
            Ok(new_state) => ApplyResourceChangeResponse { new_state, diagnostics: vec![] },
            Err(e) => {
                warn!("ApplyResourceChange for {} failed: {}", type_name, e);
                // A create that reached NetBox must stay tracked by its id
                let new_state = match e.created_id() {
                    Some(id) => Some(make_state(vec![("id", string_value(id))])),
                    None => Some(prior_state.clone()).filter(|s| !s.is_null()),
                };
                ApplyResourceChangeResponse {
                    new_state,
                    diagnostics: vec![Diagnostic::error("Failed to apply resource change", e.to_string())],
                }
            }
        }
    }

    /// Populate full state from nothing but the remote id
    pub async fn import_resource_state(&self, type_name: &str, id: &str) -> ImportResourceStateResponse {
        info!("ImportResourceState called for {} with ID {}", type_name, id);

        let client = match self.get_client().await {
            Ok(client) => client,
            Err(d) => return ImportResourceStateResponse { imported_resources: vec![], diagnostics: vec![d] },
        };

        let initial_state = make_state(vec![("id", string_value(id))]);

        let state = match type_name {
            "netbox_device" => DeviceResource::read(&client, &initial_state).await,
            _ => {
                return ImportResourceStateResponse {
                    imported_resources: vec![],
                    diagnostics: vec![unknown_type(type_name)],
                }
            }
        };

        match state {
            Ok(Some(state)) => ImportResourceStateResponse {
                imported_resources: vec![ImportedResource {
                    type_name: type_name.to_string(),
                    state,
                }],
                diagnostics: vec![],
            },
            Ok(None) => ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Cannot import non-existent remote object",
                    format!("No {} with id {:?} exists", type_name, id),
                )],
            },
            Err(e) => ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![Diagnostic::error("Failed to import resource", e.to_string())],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(v: serde_json::Value) -> DynamicValue {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_schema_lists_device_resource() {
        let provider = NetBoxProvider::new(ProviderConfig::default());
        let schema = provider.get_provider_schema();
        assert!(schema.resource_schemas.contains_key("netbox_device"));
        assert!(schema.provider.attribute("server_url").is_some());
    }

    #[test]
    fn test_validate_reports_missing_and_mistyped() {
        let provider = NetBoxProvider::new(ProviderConfig::default());
        let diags = provider.validate_resource_config(
            "netbox_device",
            &value(json!({"name": "sw1", "device_type_id": "five", "site_id": 1, "rack": 3})),
        );

        let attrs: Vec<_> = diags.iter().filter_map(|d| d.attribute.as_deref()).collect();
        assert_eq!(attrs, vec!["device_type_id", "role_id", "rack"]);
        assert!(has_errors(&diags));
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let provider = NetBoxProvider::new(ProviderConfig::default());
        let diags = provider.validate_resource_config(
            "netbox_device",
            &value(json!({
                "name": "sw1", "device_type_id": 5, "role_id": 2, "site_id": 1,
                "tenant_id": null, "tags": ["a"], "comments": "x"
            })),
        );
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_validate_unknown_type() {
        let provider = NetBoxProvider::new(ProviderConfig::default());
        let diags = provider.validate_resource_config("netbox_rack", &DynamicValue::Null);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Unknown resource type");
    }

    #[test]
    fn test_warnings_are_not_errors() {
        let diags = vec![Diagnostic::warning("Insecure HTTPS", "")];
        assert!(!has_errors(&diags));
        assert_eq!(diags[0].severity, Severity::Warning);

        let diags = vec![diags[0].clone(), Diagnostic::error("Failed", "")];
        assert!(has_errors(&diags));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_reports_diagnostic() {
        let provider = NetBoxProvider::new(ProviderConfig::default());
        let response = provider
            .read_resource("netbox_device", &value(json!({"id": "1"})))
            .await;
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn test_configure_rejects_invalid_server_url() {
        let provider = NetBoxProvider::new(ProviderConfig::default());
        let diags = provider
            .configure_provider(&value(json!({"server_url": "not a url", "api_token": "t"})))
            .await;
        assert_eq!(diags[0].summary, "Invalid provider configuration");
    }
}
