//! Sampler: one measurement of the monitored signal
//!
//! The monitor only depends on the [`Sampler`] trait. [`HttpSampler`] is the
//! stock implementation: it GETs a JSON document and reads one number out of
//! it with a JSON pointer.

use crate::error::SampleError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One immutable measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub taken_at: DateTime<Utc>,
}

impl Reading {
    /// A reading taken now
    pub fn new(value: f64) -> Self {
        Self {
            value,
            taken_at: Utc::now(),
        }
    }
}

/// Source of readings for the crisis monitor
#[async_trait]
pub trait Sampler: Send + Sync {
    async fn sample(&self) -> Result<Reading, SampleError>;
}

/// Samples a numeric field from an HTTP JSON endpoint
#[derive(Debug, Clone)]
pub struct HttpSampler {
    client: reqwest::Client,
    url: String,
    value_pointer: String,
    timeout: Duration,
}

impl HttpSampler {
    /// Create a sampler for `url`
    ///
    /// `value_pointer` is an RFC 6901 JSON pointer such as `/balance/total`.
    /// The empty pointer selects the whole document, for endpoints that
    /// return a bare number.
    pub fn new(
        url: impl Into<String>,
        value_pointer: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SampleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SampleError::Transport)?;

        Ok(Self {
            client,
            url: url.into(),
            value_pointer: value_pointer.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify(&self, e: reqwest::Error) -> SampleError {
        if e.is_timeout() {
            SampleError::Timeout(self.timeout)
        } else {
            SampleError::Transport(e)
        }
    }
}

#[async_trait]
impl Sampler for HttpSampler {
    async fn sample(&self) -> Result<Reading, SampleError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SampleError::Status(status.as_u16()));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| self.classify(e))?;

        let value = body
            .pointer(&self.value_pointer)
            .and_then(serde_json::Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or_else(|| SampleError::MissingValue(self.value_pointer.clone()))?;

        debug!("📡 Probe {} -> {}", self.url, value);
        Ok(Reading::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_value_at_pointer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/signal")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"balance":{"total":42.5}}"#)
            .create_async()
            .await;

        let sampler = HttpSampler::new(
            format!("{}/signal", server.url()),
            "/balance/total",
            Duration::from_secs(5),
        )
        .unwrap();

        let reading = sampler.sample().await.unwrap();
        assert_eq!(reading.value, 42.5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bare_number_with_empty_pointer() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("7")
            .create_async()
            .await;

        let sampler = HttpSampler::new(server.url(), "", Duration::from_secs(5)).unwrap();
        assert_eq!(sampler.sample().await.unwrap().value, 7.0);
    }

    #[tokio::test]
    async fn test_missing_value() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"{"total":"not a number"}"#)
            .create_async()
            .await;

        let sampler = HttpSampler::new(server.url(), "/total", Duration::from_secs(5)).unwrap();
        let err = sampler.sample().await.unwrap_err();
        assert!(matches!(err, SampleError::MissingValue(ref p) if p == "/total"));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(503)
            .create_async()
            .await;

        let sampler = HttpSampler::new(server.url(), "/total", Duration::from_secs(5)).unwrap();
        let err = sampler.sample().await.unwrap_err();
        assert!(matches!(err, SampleError::Status(503)));
    }
}
