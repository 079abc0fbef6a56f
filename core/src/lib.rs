//! Transport core of an HTTP client.
//!
//! # Overview
//! Takes a normalized `RequestConfig` and drives an event-driven
//! `Transport` to exactly one outcome: a `Response`, or an `Error` that
//! tells network failures, timeouts, rejected statuses and cancellations
//! apart. URL building, default merging, interceptors and body
//! (de)serialization happen before and after this crate.
//!
//! # Design
//! - `Transport` is the only I/O seam. Real transports live with the host;
//!   the `mock` feature adds a scripted `mock::MockTransport` for tests.
//! - Listener callbacks race to settle a one-shot cell, so late events are
//!   harmless no-ops.
//! - Outbound headers pass through an ordered pipeline (`headers`) that is
//!   testable without a transport.
//! - Cancellation is an external one-shot signal (`CancelToken`), awaited
//!   alongside the outcome rather than polled.

pub mod cancel;
pub mod config;
pub mod cookie;
pub mod error;
pub mod executor;
pub mod headers;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod origin;
pub mod response;
mod settle;
pub mod transport;
pub mod types;

pub use cancel::{Cancel, CancelSource, CancelToken};
pub use config::{ProgressHandler, RequestConfig, StatusValidator};
pub use cookie::{CookieJar, CookieSource};
pub use error::{Error, ErrorCode, RequestError};
pub use executor::Executor;
pub use headers::parse_headers;
pub use http::{Body, FormData, Headers, HttpMethod, ProgressEvent, ResponseData, ResponseType};
pub use origin::{CrossOrigin, OriginCheck, PageOrigin};
pub use response::Response;
pub use transport::{EventHandler, ReadyState, Transport};
pub use types::BasicAuth;
