//! HTTP remote store implementation.
//!
//! This module maps the three remote operations onto JSON-over-HTTP calls.
//! The actual HTTP client is abstracted via a trait so the application can
//! plug in whichever HTTP library (or platform fetch API) it already uses.

use crate::config::{SyncConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::error::RemoteError;
use crate::remote::RemoteStore;
use async_trait::async_trait;
use liftsync_queue::Payload;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Header carrying the idempotency key on inserts.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// HTTP method used by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Create.
    Post,
    /// Full overwrite.
    Put,
    /// Delete.
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A request to send.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Extra headers (name, value).
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Vec<u8>>,
}

/// A received response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. An `Err` means
/// no response was received at all (connection refused, DNS failure, reset).
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

#[derive(Debug, Deserialize)]
struct CreatedEntity {
    id: String,
}

/// HTTP-based remote store.
///
/// - insert: `POST {base}/{entity_type}` with an `Idempotency-Key` header,
///   answered with `{"id": "..."}`
/// - update: `PUT {base}/{entity_type}/{id}`
/// - delete: `DELETE {base}/{entity_type}/{id}`
///
/// Path segments are percent-encoded.
pub struct HttpRemoteStore<C: HttpClient> {
    base_url: String,
    client: C,
    timeout: Duration,
}

impl<C: HttpClient> HttpRemoteStore<C> {
    /// Creates a new HTTP remote store.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Applies the remote settings of an engine configuration.
    pub fn with_config(self, config: &SyncConfig) -> Self {
        self.with_timeout(config.request_timeout)
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn collection_url(&self, entity_type: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(entity_type))
    }

    fn entity_url(&self, entity_type: &str, entity_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            urlencoding::encode(entity_type),
            urlencoding::encode(entity_id)
        )
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RemoteError> {
        debug!(method = %request.method, url = %request.url, "remote request");
        let response = tokio::time::timeout(self.timeout, self.client.send(request))
            .await
            .map_err(|_| RemoteError::Timeout)?
            .map_err(RemoteError::Unavailable)?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(RemoteError::from_status(
                response.status,
                &String::from_utf8_lossy(&response.body),
            ))
        }
    }
}

fn encode_payload(payload: &Payload) -> Result<Vec<u8>, RemoteError> {
    serde_json::to_vec(payload)
        .map_err(|e| RemoteError::Rejected(format!("failed to encode payload: {e}")))
}

#[async_trait]
impl<C: HttpClient> RemoteStore for HttpRemoteStore<C> {
    async fn insert(
        &self,
        entity_type: &str,
        idempotency_key: &str,
        payload: &Payload,
    ) -> Result<String, RemoteError> {
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.collection_url(entity_type),
            headers: vec![(IDEMPOTENCY_HEADER.to_string(), idempotency_key.to_string())],
            body: Some(encode_payload(payload)?),
        };
        let response = self.send(request).await?;

        // The insert landed; a garbled acknowledgement is worth another try,
        // which the idempotency key makes safe.
        serde_json::from_slice::<CreatedEntity>(&response.body)
            .map(|created| created.id)
            .map_err(|e| RemoteError::Unavailable(format!("unreadable create response: {e}")))
    }

    async fn update(
        &self,
        entity_type: &str,
        entity_id: &str,
        payload: &Payload,
    ) -> Result<(), RemoteError> {
        let request = HttpRequest {
            method: HttpMethod::Put,
            url: self.entity_url(entity_type, entity_id),
            headers: Vec::new(),
            body: Some(encode_payload(payload)?),
        };
        self.send(request).await.map(|_| ())
    }

    async fn delete(&self, entity_type: &str, entity_id: &str) -> Result<(), RemoteError> {
        let request = HttpRequest {
            method: HttpMethod::Delete,
            url: self.entity_url(entity_type, entity_id),
            headers: Vec::new(),
            body: None,
        };
        self.send(request).await.map(|_| ())
    }
}


