//! Successful exchanges as handed back to the caller.

use std::fmt;
use std::sync::Arc;

use crate::config::RequestConfig;
use crate::http::{Headers, ResponseData};

/// A completed exchange with a non-zero status.
pub struct Response<T> {
    pub data: ResponseData,
    pub status: u16,
    pub status_text: String,
    /// Lower-cased names, as parsed from the raw header block.
    pub headers: Headers,
    pub config: Arc<RequestConfig>,
    /// The same handle the request was sent on.
    pub request: Arc<T>,
}

impl<T> Response<T> {
    /// Look up a response header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl<T> Clone for Response<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            config: Arc::clone(&self.config),
            request: Arc::clone(&self.request),
        }
    }
}

impl<T> fmt::Debug for Response<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}
