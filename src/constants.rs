// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the DNS reconciliation controller.
//!
//! Constants are organized by category for easy maintenance, the way the
//! teacher project's `constants.rs` groups numeric and string tunables.

// ============================================================================
// Record defaults
// ============================================================================

/// Default TTL for a generated DNS record when a template doesn't specify one.
pub const DEFAULT_RECORD_TTL_SECS: u32 = 300;

/// Default SRV priority when a template doesn't specify one.
pub const DEFAULT_SRV_PRIORITY: u16 = 10;

/// Default SRV weight when a template doesn't specify one.
pub const DEFAULT_SRV_WEIGHT: u16 = 10;

/// Default SRV port when a template doesn't specify one.
pub const DEFAULT_SRV_PORT: u16 = 80;

/// Fixed literal prefix identifying records owned by this controller.
pub const OWNERSHIP_PREFIX: &str = "cf-ts-dns";

/// Maximum length, in bytes, of a generated ownership comment.
pub const OWNERSHIP_COMMENT_MAX_LEN: usize = 100;

// ============================================================================
// Zone cache
// ============================================================================

/// TTL for the DNS backend's zone-listing cache.
pub const ZONE_CACHE_TTL_SECS: u64 = 300;

// ============================================================================
// Batch convergence
// ============================================================================

/// Maximum number of create/delete operations sent to the DNS backend in a
/// single batch call.
pub const MAX_BATCH_OPERATIONS: usize = 200;

// ============================================================================
// HTTP client
// ============================================================================

/// Request timeout applied to every outbound call to the inventory source
/// or the DNS backend.
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Page size requested when auto-paginating the DNS backend's owned-record
/// listing.
pub const OWNED_RECORDS_PAGE_SIZE: u32 = 100;

// ============================================================================
// HTTP retry/backoff
// ============================================================================

/// Initial retry interval for HTTP calls to upstream services.
pub const HTTP_RETRY_INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between HTTP retries.
pub const HTTP_RETRY_MAX_INTERVAL_SECS: u64 = 10;

/// Maximum total time spent retrying a single upstream HTTP call.
pub const HTTP_RETRY_MAX_ELAPSED_SECS: u64 = 30;

/// Exponential backoff growth factor.
pub const HTTP_RETRY_MULTIPLIER: f64 = 2.0;

/// Randomization (jitter) factor applied to each backoff interval.
pub const HTTP_RETRY_RANDOMIZATION_FACTOR: f64 = 0.1;

// ============================================================================
// Upstream services
// ============================================================================

/// Base URL for the mesh/VPN inventory source's API.
pub const INVENTORY_API_BASE_URL: &str = "https://api.tailscale.com";

/// Base URL for the cloud DNS backend's API.
pub const DNS_BACKEND_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

// ============================================================================
// Trigger layer
// ============================================================================

/// Default bind address for the operator HTTP server.
pub const SERVER_BIND_ADDRESS: &str = "0.0.0.0";

/// Default port for the operator HTTP server.
pub const SERVER_PORT: u16 = 8080;

/// Path for the inventory event webhook receiver.
pub const WEBHOOK_PATH: &str = "/webhook";

/// Header carrying the inventory webhook's HMAC signature.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Tailscale-Signature";

/// Required webhook subscriptions for the ensure-webhook protocol.
pub const REQUIRED_WEBHOOK_SUBSCRIPTIONS: &[&str] = &["nodeCreated", "nodeDeleted"];

/// Maximum number of records returned by the `/preview` endpoint.
pub const PREVIEW_MAX_RECORDS: usize = 50;

/// Default period between scheduled sync ticks.
pub const DEFAULT_SCHEDULE_INTERVAL_SECS: u64 = 300;

// ============================================================================
// Runtime
// ============================================================================

/// Number of worker threads for the Tokio runtime.
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Mask character used to detect "unchanged" secret fields on config writes.
pub const SECRET_MASK_CHAR: char = '*';
