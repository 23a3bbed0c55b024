// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP client for the mesh/VPN inventory source.
//!
//! Request plumbing (method dispatch, bearer auth header, structured
//! request/response tracing, error mapping on non-2xx) mirrors the
//! low-level REST helper the teacher crate uses for its own upstream API.

use super::{CreatedWebhook, Webhook};
use crate::errors::{ApiError, Service};
use crate::machine::Machine;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Operations against the mesh/VPN inventory source.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Fetch every machine in the account, with all fields populated.
    async fn list_machines(&self) -> Result<Vec<Machine>, ApiError>;

    /// List currently-registered webhook endpoints.
    async fn list_webhooks(&self) -> Result<Vec<Webhook>, ApiError>;

    /// Register a new webhook endpoint. The returned secret, if present,
    /// must be persisted immediately by the caller.
    async fn create_webhook(&self, url: &str, subscriptions: &[String]) -> Result<CreatedWebhook, ApiError>;

    /// Replace an existing webhook's subscription set.
    async fn update_webhook(&self, endpoint_id: &str, subscriptions: &[String]) -> Result<(), ApiError>;

    /// Remove a webhook endpoint.
    async fn delete_webhook(&self, endpoint_id: &str) -> Result<(), ApiError>;

    /// Fetch the account ACL, if the inventory source exposes one. The
    /// response may contain `//` and `/* */` comments; see [`parse_jsonc`].
    async fn get_acl(&self) -> Result<Option<Value>, ApiError>;
}

/// `reqwest`-backed [`InventoryClient`].
pub struct HttpInventoryClient {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
    api_key: String,
}

impl HttpInventoryClient {
    /// Build a client talking to `base_url` (e.g. `https://api.tailscale.com`)
    /// scoped to `account_id`, authenticating with `api_key`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, account_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(crate::constants::HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .expect("reqwest client builds with static config");

        Self {
            http,
            base_url: base_url.into(),
            account_id: account_id.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn request<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!(%method, %url, "inventory request");

        let mut req = self.http.request(method.clone(), &url).bearer_auth(&self.api_key);
        if let Some(body) = &body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| {
            tracing::warn!(%method, %url, error = %e, "inventory request failed to send");
            ApiError::connection(Service::Inventory, e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%method, %url, %status, body = %text, "inventory request returned error status");
            return Err(ApiError::with_status(Service::Inventory, status.as_u16(), text));
        }

        if status == StatusCode::NO_CONTENT {
            return serde_json::from_value(Value::Null)
                .map_err(|e| ApiError::connection(Service::Inventory, e.to_string()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::connection(Service::Inventory, e.to_string()))
    }
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    async fn list_machines(&self) -> Result<Vec<Machine>, ApiError> {
        #[derive(serde::Deserialize)]
        struct ListResponse {
            #[serde(default)]
            devices: Vec<Machine>,
        }

        let path = format!("api/v2/tailnet/{}/devices?fields=all", self.account_id);
        let response: ListResponse = self.request(Method::GET, &path, None).await?;
        Ok(response.devices)
    }

    async fn list_webhooks(&self) -> Result<Vec<Webhook>, ApiError> {
        #[derive(serde::Deserialize)]
        struct ListResponse {
            #[serde(default)]
            webhooks: Vec<Webhook>,
        }

        let path = format!("api/v2/tailnet/{}/webhooks", self.account_id);
        let response: ListResponse = self.request(Method::GET, &path, None).await?;
        Ok(response.webhooks)
    }

    async fn create_webhook(&self, url: &str, subscriptions: &[String]) -> Result<CreatedWebhook, ApiError> {
        let path = format!("api/v2/tailnet/{}/webhooks", self.account_id);
        let body = serde_json::json!({ "endpointUrl": url, "subscriptions": subscriptions });
        self.request(Method::POST, &path, Some(body)).await
    }

    async fn update_webhook(&self, endpoint_id: &str, subscriptions: &[String]) -> Result<(), ApiError> {
        let path = format!("api/v2/webhooks/{endpoint_id}");
        let body = serde_json::json!({ "subscriptions": subscriptions });
        self.request::<Value>(Method::PATCH, &path, Some(body)).await?;
        Ok(())
    }

    async fn delete_webhook(&self, endpoint_id: &str) -> Result<(), ApiError> {
        let path = format!("api/v2/webhooks/{endpoint_id}");
        self.request::<Value>(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn get_acl(&self) -> Result<Option<Value>, ApiError> {
        let path = format!("api/v2/tailnet/{}/acl", self.account_id);
        let url = self.url(&path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/hujson")
            .send()
            .await
            .map_err(|e| ApiError::connection(Service::Inventory, e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::with_status(Service::Inventory, status.as_u16(), text));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| ApiError::connection(Service::Inventory, e.to_string()))?;
        parse_jsonc(&raw)
            .map(Some)
            .map_err(|e| ApiError::connection(Service::Inventory, format!("malformed ACL response: {e}")))
    }
}

/// Parse a JSON document that may contain `//` line comments and `/* */`
/// block comments, as the inventory source's ACL endpoint returns. Isolated
/// behind this function so a stricter or more permissive parser can be
/// swapped in without touching callers.
fn parse_jsonc(raw: &str) -> Result<Value, serde_json::Error> {
    let stripped = strip_json_comments(raw);
    serde_json::from_str(&stripped)
}

fn strip_json_comments(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_and_block_comments() {
        let input = r#"{
            // a comment
            "a": 1, /* inline */ "b": "value with // not a comment"
        }"#;
        let value = parse_jsonc(input).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], "value with // not a comment");
    }

    #[test]
    fn passes_through_plain_json() {
        let value = parse_jsonc(r#"{"x": true}"#).unwrap();
        assert_eq!(value["x"], true);
    }
}
