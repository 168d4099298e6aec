//! Client for the NetBox REST API

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use netbox_common::{
    Device, Error, Page, ProviderConfig, Result, Tag, WritableDevice, WritableTag,
};

/// Maximum length of response body kept in errors and logs
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body and strip control characters before logging it
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Client wrapper for NetBox API communication.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct NetBoxClient {
    http: reqwest::Client,
    base_url: String,
}

impl NetBoxClient {
    /// Build a client from validated provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut auth = HeaderValue::from_str(&format!("Token {}", config.api_token))
            .map_err(|_| Error::InvalidConfig("api_token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidConfig(format!("invalid header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidConfig(format!("invalid value for header {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(format!("netbox-provider/{}", netbox_common::VERSION))
            .default_headers(headers)
            .danger_accept_invalid_certs(config.allow_insecure_https)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);
        self.http.request(method, url)
    }

    /// Send a request and decode the JSON body.
    ///
    /// `kind` and `id` name the object in the NotFound error a 404 maps to.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, kind: &str, id: &str) -> Result<T> {
        let body = self.send_raw(request, kind, id).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_raw(&self, request: RequestBuilder, kind: &str, id: &str) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            debug!("{} {} not found", kind, id);
            return Err(Error::not_found(kind, id));
        }

        if !status.is_success() {
            let body = sanitize_for_log(&body);
            error!("API error: {} - {}", status, body);
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        kind: &str,
        id: &str,
    ) -> Result<T> {
        let request = self.request(method, path).json(body);
        self.send(request, kind, id).await
    }

    /// Fetch `/api/status/`, used to check connectivity and credentials
    pub async fn status(&self) -> Result<serde_json::Value> {
        self.send(self.request(Method::GET, "status/"), "status", "").await
    }

    // Device operations

    pub async fn create_device(&self, data: &WritableDevice) -> Result<Device> {
        self.send_json(Method::POST, "dcim/devices/", data, "device", "").await
    }

    pub async fn get_device(&self, id: i64) -> Result<Device> {
        let path = format!("dcim/devices/{}/", id);
        self.send(self.request(Method::GET, &path), "device", &id.to_string()).await
    }

    pub async fn update_device(&self, id: i64, data: &WritableDevice) -> Result<Device> {
        let path = format!("dcim/devices/{}/", id);
        self.send_json(Method::PUT, &path, data, "device", &id.to_string()).await
    }

    pub async fn delete_device(&self, id: i64) -> Result<()> {
        let path = format!("dcim/devices/{}/", id);
        self.send_raw(self.request(Method::DELETE, &path), "device", &id.to_string()).await?;
        Ok(())
    }

    // Tag operations

    /// Look up tags by exact name; at most two results are requested
    pub async fn find_tags_by_name(&self, name: &str) -> Result<Page<Tag>> {
        let request = self
            .request(Method::GET, "extras/tags/")
            .query(&[("name", name), ("limit", "2")]);
        self.send(request, "tag", name).await
    }

    pub async fn create_tag(&self, data: &WritableTag) -> Result<Tag> {
        self.send_json(Method::POST, "extras/tags/", data, "tag", &data.name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProviderConfig {
        ProviderConfig {
            server_url: "https://netbox.example.com/".to_string(),
            api_token: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_url_building() {
        let client = NetBoxClient::new(&config()).unwrap();
        assert_eq!(
            client.url("dcim/devices/42/"),
            "https://netbox.example.com/api/dcim/devices/42/"
        );
        assert_eq!(client.url("/status/"), "https://netbox.example.com/api/status/");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut cfg = config();
        cfg.api_token.clear();
        assert!(matches!(NetBoxClient::new(&cfg), Err(Error::InvalidConfig(_))));

        let mut cfg = config();
        cfg.headers.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(NetBoxClient::new(&cfg), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_sanitize_for_log() {
        assert_eq!(sanitize_for_log("a\nb"), "ab");

        let long = "é".repeat(150);
        let sanitized = sanitize_for_log(&long);
        assert!(sanitized.contains("[truncated, 300 bytes total]"));
    }
}
