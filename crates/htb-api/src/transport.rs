//! Transport abstraction and the reqwest-backed implementation.
//!
//! Every API call goes through [`Transport::send`], which returns the
//! parsed JSON body. Typed decoding happens once, in [`fetch_envelope`],
//! [`fetch`] and [`post_message`], so callers never handle raw maps.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::types::MessageResponse;

/// HTTP method used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A single API request, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: Method,
    /// Path starting with `/`, e.g. `/machine/profile/42`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Append a query-string pair.
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// Sends API requests and returns parsed JSON bodies.
///
/// Implementations must map non-success HTTP statuses to
/// [`ApiError::Status`] and never retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value>;
}

/// GET `path` and decode the record wrapped under `envelope`.
pub async fn fetch_envelope<T: DeserializeOwned>(
    transport: &dyn Transport,
    path: &str,
    envelope: &str,
) -> ApiResult<T> {
    let body = transport.send(ApiRequest::get(path)).await?;
    unwrap_envelope(body, envelope)
}

/// Send `request` and decode the whole body as `T`.
pub async fn fetch<T: DeserializeOwned>(
    transport: &dyn Transport,
    request: ApiRequest,
) -> ApiResult<T> {
    let body = transport.send(request).await?;
    Ok(serde_json::from_value(body)?)
}

/// POST `body` to `path` and return the server's `message` field.
pub async fn post_message(transport: &dyn Transport, path: &str, body: Value) -> ApiResult<String> {
    let response: MessageResponse = fetch(transport, ApiRequest::post(path, body)).await?;
    Ok(response.message)
}

/// Extract and decode `body[envelope]`.
pub fn unwrap_envelope<T: DeserializeOwned>(mut body: Value, envelope: &str) -> ApiResult<T> {
    let inner = body
        .get_mut(envelope)
        .map(Value::take)
        .ok_or_else(|| ApiError::Shape(format!("missing `{envelope}` envelope")))?;
    serde_json::from_value(inner).map_err(|e| ApiError::Shape(format!("`{envelope}`: {e}")))
}

/// reqwest-backed transport
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with bearer auth, optional proxy and timeout.
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let token = config
            .token
            .as_deref()
            .ok_or_else(|| ApiError::Config("no API token configured (set HTB_TOKEN)".into()))?;

        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ApiError::Config(format!("token is not a valid header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs));

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ApiError::Config(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        Ok(HttpTransport {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, url = %url, "sending API request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Shape(format!("{} {}: {e}", request.method, request.path)))
    }
}
