//! htb-api: transport boundary for the Hack The Box labs API
//!
//! This crate owns everything that touches the wire:
//! - `Transport`: the request/response seam, with a reqwest-backed
//!   `HttpTransport` and an in-memory `fakes::FakeTransport`
//! - typed response structures decoded once at the boundary
//! - `ApiError`, the transport/shape error type

pub mod config;
pub mod error;
pub mod fakes;
pub mod transport;
pub mod types;

pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{ApiError, ApiResult};
pub use transport::{
    fetch, fetch_envelope, post_message, unwrap_envelope, ApiRequest, HttpTransport, Method,
    Transport,
};
pub use types::*;
