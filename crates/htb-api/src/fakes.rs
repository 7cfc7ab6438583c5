//! In-memory fake transport (testing only)
//!
//! `FakeTransport` answers requests from canned replies keyed by method
//! and path, and records every request it receives so tests can assert
//! on what was (or was not) sent.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::transport::{ApiRequest, Method, Transport};

#[derive(Debug, Clone)]
enum FakeReply {
    Json(Value),
    Status(u16, String),
}

/// Canned-reply transport.
///
/// Replies registered for the same route are served in order; the last
/// one is repeated once the queue is down to a single reply. Unknown
/// routes answer `404`.
#[derive(Debug, Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<FakeReply>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: FakeReply) -> &Self {
        let mut routes = self.routes.lock().unwrap();
        routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue a JSON reply for `GET path`.
    pub fn on_get(&self, path: &str, body: Value) -> &Self {
        self.push(Method::Get, path, FakeReply::Json(body))
    }

    /// Queue a JSON reply for `POST path`.
    pub fn on_post(&self, path: &str, body: Value) -> &Self {
        self.push(Method::Post, path, FakeReply::Json(body))
    }

    /// Queue an HTTP error for `GET path`.
    pub fn fail_get(&self, path: &str, status: u16) -> &Self {
        self.push(Method::Get, path, FakeReply::Status(status, "fake failure".into()))
    }

    /// Queue an HTTP error for `POST path`.
    pub fn fail_post(&self, path: &str, status: u16) -> &Self {
        self.push(Method::Post, path, FakeReply::Status(status, "fake failure".into()))
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received for `method path`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Most recent `POST` request, if any.
    pub fn last_post(&self) -> Option<ApiRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.method == Method::Post)
            .cloned()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        self.requests.lock().unwrap().push(request.clone());

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&(request.method, request.path.clone())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(FakeReply::Json(body)) => Ok(body),
            Some(FakeReply::Status(status, body)) => Err(ApiError::Status { status, body }),
            None => Err(ApiError::Status {
                status: 404,
                body: format!("no fake route for {} {}", request.method, request.path),
            }),
        }
    }
}
