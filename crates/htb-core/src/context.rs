//! Explicit per-invocation context.
//!
//! Built once in `main` and passed by reference to every component.
//! All API traffic from htb-core goes through these helpers so request
//! counting happens in one place.

use std::sync::Arc;

use htb_api::{ApiRequest, Transport};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::Result;
use crate::metrics::METRICS;

/// Transport handle plus invocation-wide switches.
#[derive(Clone)]
pub struct Context {
    transport: Arc<dyn Transport>,
    batch: bool,
}

impl Context {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            batch: false,
        }
    }

    /// Auto-confirm every confirmation prompt.
    pub fn with_batch(mut self, batch: bool) -> Self {
        self.batch = batch;
        self
    }

    pub fn batch(&self) -> bool {
        self.batch
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// GET `path` and decode `body[envelope]`.
    pub async fn get_envelope<T: DeserializeOwned>(&self, path: &str, envelope: &str) -> Result<T> {
        METRICS.inc_requests();
        Ok(htb_api::fetch_envelope(self.transport(), path, envelope).await?)
    }

    /// Send `request` and decode the whole body.
    pub async fn get<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        METRICS.inc_requests();
        Ok(htb_api::fetch(self.transport(), request).await?)
    }

    /// POST `body` and return the response `message`.
    pub async fn post_message(&self, path: &str, body: Value) -> Result<String> {
        METRICS.inc_requests();
        Ok(htb_api::post_message(self.transport(), path, body).await?)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("batch", &self.batch).finish()
    }
}
