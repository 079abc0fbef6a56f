//! The request description consumed by the executor.
//!
//! # Design
//! `RequestConfig` arrives already normalized: defaults merged, URL built,
//! body serialized. Plain-data fields deserialize from camelCase JSON so a
//! config can be loaded from a file or a test vector. Hooks (progress,
//! status validation, cancellation) are attached with builder methods.
//!
//! The executor owns the config for the duration of one call. It rewrites
//! `headers` once before sending and then shares the result, frozen, with
//! the `Response` or `RequestError` it produces.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::cancel::CancelToken;
use crate::http::{Body, Headers, HttpMethod, ProgressEvent, ResponseType};
use crate::types::BasicAuth;

/// Observer for upload or download progress.
#[derive(Clone)]
pub struct ProgressHandler(Arc<dyn Fn(ProgressEvent) + Send + Sync>);

impl ProgressHandler {
    pub fn new(f: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, event: ProgressEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for ProgressHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressHandler")
    }
}

/// Predicate deciding whether a status code counts as success.
#[derive(Clone)]
pub struct StatusValidator(Arc<dyn Fn(u16) -> bool + Send + Sync>);

impl StatusValidator {
    pub fn new(f: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Accepts 2xx only.
    pub fn success() -> Self {
        Self::new(|status| (200..300).contains(&status))
    }

    pub fn accepts(&self, status: u16) -> bool {
        (self.0)(status)
    }
}

impl fmt::Debug for StatusValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StatusValidator")
    }
}

/// A normalized outbound request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestConfig {
    pub url: String,
    pub method: HttpMethod,
    pub data: Option<Body>,
    pub headers: Headers,
    /// Milliseconds. `None` or zero leaves the transport default. A
    /// transport timeout with `None` reports "Timeout exceeded".
    pub timeout: Option<u64>,
    pub response_type: Option<ResponseType>,
    pub with_credentials: Option<bool>,
    pub xsrf_cookie_name: Option<String>,
    pub xsrf_header_name: Option<String>,
    pub auth: Option<BasicAuth>,
    #[serde(skip)]
    pub on_download_progress: Option<ProgressHandler>,
    #[serde(skip)]
    pub on_upload_progress: Option<ProgressHandler>,
    #[serde(skip)]
    pub cancel_token: Option<CancelToken>,
    #[serde(skip)]
    pub validate_status: Option<StatusValidator>,
}

impl RequestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn data(mut self, data: impl Into<Body>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn timeout(mut self, millis: u64) -> Self {
        self.timeout = Some(millis);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = Some(with_credentials);
        self
    }

    /// Name the cookie to copy and the header to copy it into.
    pub fn xsrf(mut self, cookie_name: impl Into<String>, header_name: impl Into<String>) -> Self {
        self.xsrf_cookie_name = Some(cookie_name.into());
        self.xsrf_header_name = Some(header_name.into());
        self
    }

    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth::new(username, password));
        self
    }

    pub fn on_download_progress(mut self, f: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_download_progress = Some(ProgressHandler::new(f));
        self
    }

    pub fn on_upload_progress(mut self, f: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_upload_progress = Some(ProgressHandler::new(f));
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn validate_status(mut self, f: impl Fn(u16) -> bool + Send + Sync + 'static) -> Self {
        self.validate_status = Some(StatusValidator::new(f));
        self
    }

    /// The timeout only counts when present and non-zero.
    pub(crate) fn effective_timeout(&self) -> Option<u64> {
        self.timeout.filter(|millis| *millis > 0)
    }
}
