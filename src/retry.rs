// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Exponential backoff for transient failures against the inventory and DNS
//! backend HTTP APIs.
//!
//! This is distinct from "retrying a sync": a whole reconciliation pass is
//! never retried by this crate (the next scheduled tick is the retry). Only
//! a single upstream HTTP call is retried here.

use crate::constants::{
    HTTP_RETRY_INITIAL_INTERVAL_MILLIS, HTTP_RETRY_MAX_ELAPSED_SECS, HTTP_RETRY_MAX_INTERVAL_SECS,
    HTTP_RETRY_MULTIPLIER, HTTP_RETRY_RANDOMIZATION_FACTOR,
};
use std::time::Duration;

/// Decorrelated exponential backoff with jitter.
///
/// Default schedule: 100ms initial interval, doubling each attempt, capped
/// at 10s, giving up after 30s of total elapsed retry time.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
    randomization_factor: f64,
    elapsed: Duration,
    max_elapsed: Duration,
}

impl ExponentialBackoff {
    /// The schedule used for retrying calls to the inventory source and the
    /// DNS backend.
    #[must_use]
    pub fn http_backoff() -> Self {
        Self {
            current_interval: Duration::from_millis(HTTP_RETRY_INITIAL_INTERVAL_MILLIS),
            max_interval: Duration::from_secs(HTTP_RETRY_MAX_INTERVAL_SECS),
            multiplier: HTTP_RETRY_MULTIPLIER,
            randomization_factor: HTTP_RETRY_RANDOMIZATION_FACTOR,
            elapsed: Duration::ZERO,
            max_elapsed: Duration::from_secs(HTTP_RETRY_MAX_ELAPSED_SECS),
        }
    }

    /// The next interval to sleep for, or `None` if the backoff has been
    /// exhausted and the caller should give up.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.elapsed >= self.max_elapsed {
            return None;
        }

        let jitter = 1.0 + self.randomization_factor * (2.0 * rand::random::<f64>() - 1.0);
        let interval = self.current_interval.mul_f64(jitter.max(0.0));

        self.elapsed += self.current_interval;
        self.current_interval = self
            .current_interval
            .mul_f64(self.multiplier)
            .min(self.max_interval);

        Some(interval)
    }
}

/// `true` if an upstream HTTP status code indicates a transient failure
/// worth retrying (429 and 5xx).
#[must_use]
pub fn is_retryable_http_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Run `call`, retrying while it returns a transient [`crate::errors::ApiError`]
/// per [`ExponentialBackoff::http_backoff`].
pub async fn retry_api_call<F, Fut, T>(mut call: F) -> Result<T, crate::errors::ApiError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, crate::errors::ApiError>>,
{
    let mut backoff = ExponentialBackoff::http_backoff();
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => match backoff.next_backoff() {
                Some(delay) => {
                    tracing::warn!(error = %err, delay_ms = delay.as_millis(), "retrying transient upstream failure");
                    tokio::time::sleep(delay).await;
                }
                None => return Err(err),
            },
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ApiError, Service};

    #[test]
    fn classifies_retryable_statuses() {
        assert!(is_retryable_http_status(429));
        assert!(is_retryable_http_status(503));
        assert!(!is_retryable_http_status(404));
        assert!(!is_retryable_http_status(200));
    }

    #[test]
    fn backoff_grows_and_eventually_exhausts() {
        let mut backoff = ExponentialBackoff::http_backoff();
        let first = backoff.next_backoff().unwrap();
        let second = backoff.next_backoff().unwrap();
        assert!(second >= first.mul_f64(1.5));

        let mut exhausted = false;
        for _ in 0..100 {
            if backoff.next_backoff().is_none() {
                exhausted = true;
                break;
            }
        }
        assert!(exhausted);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result = retry_api_call(|| {
            let n = attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ApiError::with_status(Service::Dns, 503, "busy"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_errors() {
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result: Result<(), _> = retry_api_call(|| {
            attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Err(ApiError::with_status(Service::Dns, 404, "missing")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
