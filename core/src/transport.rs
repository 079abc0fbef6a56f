//! The transport capability the executor drives.
//!
//! # Design
//! A transport is an event-driven handle for one network exchange: it is
//! opened, configured, given listeners, then sent. Completion, failure,
//! timeout and progress are reported by invoking the registered listeners;
//! the handle is then read back through its getters.
//!
//! Methods take `&self`. A handle is shared between the executor, the
//! listeners it registers and the `Response`/`RequestError` it hands back,
//! so implementations keep their state behind interior mutability.
//!
//! Contract for implementors:
//! - no listener fires before `send`;
//! - `abort` on a finished exchange is a no-op;
//! - listeners are invoked without holding any internal lock, since they
//!   call back into the getters.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProgressHandler;
use crate::http::{Body, ResponseData, ResponseType};

/// Listener for a state change, error or timeout.
pub type EventHandler = Arc<dyn Fn() + Send + Sync>;

/// Lifecycle stage of a transport handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    #[default]
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    /// Terminal: completed, failed or aborted.
    Done = 4,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadyState::Unsent => "UNSENT",
            ReadyState::Opened => "OPENED",
            ReadyState::HeadersReceived => "HEADERS_RECEIVED",
            ReadyState::Loading => "LOADING",
            ReadyState::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// One in-flight network exchange.
pub trait Transport: Send + Sync + 'static {
    /// Prepare the exchange. Configuration is only valid after this call.
    fn open(&self, method: &str, url: &str);

    fn set_response_type(&self, response_type: ResponseType);

    fn set_timeout(&self, timeout: Duration);

    fn set_with_credentials(&self, with_credentials: bool);

    fn set_request_header(&self, name: &str, value: &str);

    /// Fired on every readiness transition.
    fn on_ready_state_change(&self, handler: EventHandler);

    /// Fired on a transport-level failure (connection refused, reset, ...).
    fn on_error(&self, handler: EventHandler);

    /// Fired when the configured timeout elapses.
    fn on_timeout(&self, handler: EventHandler);

    fn on_download_progress(&self, handler: ProgressHandler);

    fn on_upload_progress(&self, handler: ProgressHandler);

    fn send(&self, body: Option<Body>);

    fn abort(&self);

    fn ready_state(&self) -> ReadyState;

    /// Zero until a response status is known, and after network failures.
    fn status(&self) -> u16;

    fn status_text(&self) -> String;

    /// Raw `name: value` lines separated by CRLF.
    fn all_response_headers(&self) -> String;

    /// Payload decoded according to the configured response type.
    fn response(&self) -> ResponseData;

    fn response_text(&self) -> String;
}
