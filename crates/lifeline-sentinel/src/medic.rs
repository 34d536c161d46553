//! Medic: remediation calls to the collaborator subsystems
//!
//! Each subsystem is an opaque remote procedure. The orchestrator only sees
//! the [`SubsystemInvoker`] trait; [`HttpInvoker`] POSTs the action id to
//! `base_url + path` and hands back the JSON body.

use crate::error::InvokeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::debug;

/// One remediation endpoint in the orchestrator roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsystemEndpoint {
    /// Stable id, also sent as the action name
    pub id: String,

    /// Path relative to the invoker's base URL
    pub path: String,
}

impl SubsystemEndpoint {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

/// Performs one remediation call
///
/// Implementations return the subsystem's JSON payload. Interpreting it is
/// the orchestrator's job.
#[async_trait]
pub trait SubsystemInvoker: Send + Sync {
    async fn invoke(&self, endpoint: &SubsystemEndpoint) -> Result<Value, InvokeError>;
}

/// HTTP POST invoker
///
/// The timeout is applied by the orchestrator, not here.
#[derive(Clone)]
pub struct HttpInvoker {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpInvoker {
    pub fn new(base_url: impl Into<String>) -> Result<Self, InvokeError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(InvokeError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            auth_token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every call
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an endpoint
    pub fn url_for(&self, endpoint: &SubsystemEndpoint) -> String {
        let base = self.base_url.trim_end_matches('/');
        if endpoint.path.starts_with('/') {
            format!("{}{}", base, endpoint.path)
        } else {
            format!("{}/{}", base, endpoint.path)
        }
    }
}

impl fmt::Debug for HttpInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpInvoker")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl SubsystemInvoker for HttpInvoker {
    async fn invoke(&self, endpoint: &SubsystemEndpoint) -> Result<Value, InvokeError> {
        let url = self.url_for(endpoint);
        debug!("💉 Invoking {} at {}", endpoint.id, url);

        let mut request = self
            .client
            .post(&url)
            .json(&json!({ "action": endpoint.id }));
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(InvokeError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(InvokeError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| InvokeError::Decode(e.to_string()))
    }
}
