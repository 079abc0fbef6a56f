//! Failure values produced by the executor.
//!
//! # Design
//! Every failure carries enough context to branch on without reading the
//! message. `RequestError` covers network, timeout and status failures: a
//! network failure has neither `code` nor `response`, a timeout carries
//! `ErrorCode::ConnectionAborted`, and a status failure carries the full
//! `Response` so the body of a rejected reply stays inspectable.
//! Cancellation is its own variant holding the token's reason unchanged.

use std::fmt;
use std::sync::Arc;

use crate::cancel::Cancel;
use crate::config::RequestConfig;
use crate::response::Response;

/// Machine-readable failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The exchange was cut short, e.g. by the transport timeout.
    ConnectionAborted,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConnectionAborted => "ECONNABORTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request that reached the transport and failed.
#[derive(thiserror::Error)]
#[error("{message}")]
pub struct RequestError<T> {
    pub message: String,
    pub config: Arc<RequestConfig>,
    pub code: Option<ErrorCode>,
    /// The same handle the request was sent on.
    pub request: Arc<T>,
    pub response: Option<Response<T>>,
}

impl<T> RequestError<T> {
    pub fn new(
        message: impl Into<String>,
        config: Arc<RequestConfig>,
        code: Option<ErrorCode>,
        request: Arc<T>,
        response: Option<Response<T>>,
    ) -> Self {
        Self {
            message: message.into(),
            config,
            code,
            request,
            response,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    pub fn response(&self) -> Option<&Response<T>> {
        self.response.as_ref()
    }

    pub fn is_timeout(&self) -> bool {
        self.code == Some(ErrorCode::ConnectionAborted)
    }
}

impl<T> fmt::Debug for RequestError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestError")
            .field("message", &self.message)
            .field("code", &self.code)
            .field("url", &self.config.url)
            .field("status", &self.response.as_ref().map(|r| r.status))
            .finish_non_exhaustive()
    }
}

/// Why `execute` failed.
#[derive(thiserror::Error)]
pub enum Error<T> {
    #[error(transparent)]
    Request(RequestError<T>),

    #[error("request cancelled: {0}")]
    Cancelled(Cancel),
}

impl<T> Error<T> {
    pub fn is_cancel(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }

    pub fn as_request(&self) -> Option<&RequestError<T>> {
        match self {
            Error::Request(err) => Some(err),
            Error::Cancelled(_) => None,
        }
    }

    pub fn cancel_reason(&self) -> Option<&Cancel> {
        match self {
            Error::Cancelled(reason) => Some(reason),
            Error::Request(_) => None,
        }
    }
}

impl<T> From<RequestError<T>> for Error<T> {
    fn from(err: RequestError<T>) -> Self {
        Error::Request(err)
    }
}

impl<T> fmt::Debug for Error<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Request(err) => f.debug_tuple("Request").field(err).finish(),
            Error::Cancelled(reason) => f.debug_tuple("Cancelled").field(reason).finish(),
        }
    }
}
