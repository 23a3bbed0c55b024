// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP client for the cloud DNS backend.

use super::zone_cache::TtlCache;
use super::Zone;
use crate::constants::{OWNED_RECORDS_PAGE_SIZE, ZONE_CACHE_TTL_SECS};
use crate::errors::{ApiError, Service};
use crate::records::{DesiredRecord, OwnedRecord};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of applying one zone's batch within a
/// [`DnsBackendClient::batch_apply_multi`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneApplyOutcome {
    /// The zone this outcome applies to.
    pub zone_id: String,
    /// `None` on success; the batch error otherwise. A failure here never
    /// rolls back any other zone's batch.
    pub error: Option<String>,
}

/// Operations against the cloud DNS backend.
#[async_trait]
pub trait DnsBackendClient: Send + Sync {
    /// Resolve `domain` to the id of the zone whose apex is the longest DNS
    /// suffix of `domain`. Results are cached for
    /// [`crate::constants::ZONE_CACHE_TTL_SECS`].
    async fn resolve_zone(&self, domain: &str) -> Result<String, ApiError>;

    /// List every record whose comment begins with `comment_prefix`, across
    /// all zones, auto-paginating.
    async fn list_owned_records(&self, comment_prefix: &str) -> Result<Vec<OwnedRecord>, ApiError>;

    /// Apply one zone's deletes and creates in a single atomic call.
    async fn batch_apply(&self, zone_id: &str, deletes: &[OwnedRecord], creates: &[DesiredRecord]) -> Result<(), ApiError>;

    /// Resolve the zone for every record, group by zone, and issue one
    /// batch per zone. A failure on one zone is reported in its outcome and
    /// does not prevent other zones' batches from running.
    async fn batch_apply_multi(&self, deletes: Vec<OwnedRecord>, creates: Vec<DesiredRecord>) -> Vec<ZoneApplyOutcome>;
}

/// `reqwest`-backed [`DnsBackendClient`].
pub struct HttpDnsBackendClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    zone_cache: TtlCache<String, Vec<Zone>>,
}

const ZONES_CACHE_KEY: &str = "zones";

impl HttpDnsBackendClient {
    /// Build a client talking to `base_url`, authenticating with `api_token`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(crate::constants::HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .expect("reqwest client builds with static config");

        Self {
            http,
            base_url: base_url.into(),
            api_token: api_token.into(),
            zone_cache: TtlCache::new(Duration::from_secs(ZONE_CACHE_TTL_SECS)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn request<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!(%method, %url, "dns backend request");

        let mut req = self.http.request(method.clone(), &url).bearer_auth(&self.api_token);
        if let Some(body) = &body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| {
            tracing::warn!(%method, %url, error = %e, "dns backend request failed to send");
            ApiError::connection(Service::Dns, e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%method, %url, %status, body = %text, "dns backend request returned error status");
            return Err(ApiError::with_status(Service::Dns, status.as_u16(), text));
        }

        response.json::<T>().await.map_err(|e| ApiError::connection(Service::Dns, e.to_string()))
    }

    async fn fetch_zones(&self) -> Result<Vec<Zone>, ApiError> {
        if let Some(cached) = self.zone_cache.get(&ZONES_CACHE_KEY.to_string()) {
            return Ok(cached);
        }

        #[derive(serde::Deserialize)]
        struct ListResponse {
            #[serde(default)]
            result: Vec<Zone>,
        }

        let response: ListResponse = self.request(Method::GET, "zones", None).await?;
        self.zone_cache.put(ZONES_CACHE_KEY.to_string(), response.result.clone());
        Ok(response.result)
    }

    async fn zone_for_name(&self, record_name: &str) -> Result<String, ApiError> {
        self.resolve_zone(record_name).await
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim_end_matches('.').to_lowercase()
}

/// `true` if `apex` is `domain` itself or a proper DNS suffix of it.
fn is_suffix(domain: &str, apex: &str) -> bool {
    domain == apex || domain.ends_with(&format!(".{apex}"))
}

#[async_trait]
impl DnsBackendClient for HttpDnsBackendClient {
    async fn resolve_zone(&self, domain: &str) -> Result<String, ApiError> {
        let domain = normalize_domain(domain);
        let zones = self.fetch_zones().await?;

        zones
            .iter()
            .filter(|z| is_suffix(&domain, &normalize_domain(&z.name)))
            .max_by_key(|z| z.name.len())
            .map(|z| z.id.clone())
            .ok_or_else(|| ApiError::with_status(Service::Dns, 404, format!("no zone matches '{domain}'")))
    }

    async fn list_owned_records(&self, comment_prefix: &str) -> Result<Vec<OwnedRecord>, ApiError> {
        #[derive(serde::Deserialize)]
        struct Page {
            #[serde(default)]
            result: Vec<OwnedRecord>,
            #[serde(default)]
            cursor: Option<String>,
        }

        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut path = format!("dns_records?comment.startswith={comment_prefix}&per_page={OWNED_RECORDS_PAGE_SIZE}");
            if let Some(c) = &cursor {
                path.push_str(&format!("&cursor={c}"));
            }

            let page: Page = self.request(Method::GET, &path, None).await?;
            records.extend(page.result);

            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn batch_apply(&self, zone_id: &str, deletes: &[OwnedRecord], creates: &[DesiredRecord]) -> Result<(), ApiError> {
        let path = format!("zones/{zone_id}/dns_records/batch");
        let body = serde_json::json!({
            "deletes": deletes.iter().map(|r| serde_json::json!({ "id": r.id })).collect::<Vec<_>>(),
            "posts": creates,
        });
        self.request::<Value>(Method::POST, &path, Some(body)).await?;
        Ok(())
    }

    async fn batch_apply_multi(&self, deletes: Vec<OwnedRecord>, creates: Vec<DesiredRecord>) -> Vec<ZoneApplyOutcome> {
        let mut by_zone: HashMap<String, (Vec<OwnedRecord>, Vec<DesiredRecord>)> = HashMap::new();

        for record in deletes {
            by_zone.entry(record.zone_id.clone()).or_default().0.push(record);
        }

        for record in creates {
            match self.zone_for_name(&record.name).await {
                Ok(zone_id) => {
                    by_zone.entry(zone_id).or_default().1.push(record);
                }
                Err(err) => {
                    tracing::warn!(record = %record.name, error = %err, "could not resolve zone for create");
                }
            }
        }

        let mut outcomes = Vec::with_capacity(by_zone.len());
        for (zone_id, (zone_deletes, zone_creates)) in by_zone {
            let result = self.batch_apply(&zone_id, &zone_deletes, &zone_creates).await;
            outcomes.push(ZoneApplyOutcome {
                zone_id,
                error: result.err().map(|e| e.to_string()),
            });
        }
        outcomes
    }
}
