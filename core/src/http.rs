//! HTTP data types shared by the executor and transports.
//!
//! # Design
//! These types describe methods, bodies and response payloads as plain data.
//! The executor never touches the network itself; a `Transport` carries the
//! bytes. Keeping the payload types here lets any transport (the in-memory
//! mock, a socket-backed client, a host bridge) agree on one vocabulary.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Request or response headers keyed by name, in insertion order.
///
/// Keys are stored exactly as given. Only the no-body `content-type` check
/// compares names case-insensitively.
pub type Headers = IndexMap<String, String>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// The upper-cased token sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a method token is not a known HTTP verb.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Outgoing request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Body {
    Text(String),
    Bytes(Bytes),
    Form(FormData),
}

impl Body {
    /// True for multipart form payloads, whose content type the transport
    /// picks itself (it owns the boundary).
    pub fn is_form_data(&self) -> bool {
        matches!(self, Body::Form(_))
    }

    /// Length in bytes of the encoded body. Form bodies report the length of
    /// their field data only, since the boundary belongs to the transport.
    pub fn len(&self) -> usize {
        match self {
            Body::Text(text) => text.len(),
            Body::Bytes(bytes) => bytes.len(),
            Body::Form(form) => form
                .fields
                .iter()
                .map(|(name, value)| name.len() + value.len())
                .sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Body::Form(form)
    }
}

/// Ordered multipart form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData {
    pub fields: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Encode as `multipart/form-data` using `boundary`.
    ///
    /// The matching content type is `multipart/form-data; boundary={boundary}`.
    pub fn to_multipart(&self, boundary: &str) -> Vec<u8> {
        let mut out = String::new();
        for (name, value) in &self.fields {
            out.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        out.push_str(&format!("--{boundary}--\r\n"));
        out.into_bytes()
    }
}

/// How the transport should expose the response payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    #[default]
    #[serde(rename = "")]
    Default,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "arraybuffer")]
    ArrayBuffer,
    #[serde(rename = "json")]
    Json,
}

impl ResponseType {
    /// Text-like response types read the raw text field of the transport.
    pub fn is_text(&self) -> bool {
        matches!(self, ResponseType::Default | ResponseType::Text)
    }
}

/// Response payload handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    Text(String),
    Binary(Bytes),
    Json(serde_json::Value),
    Empty,
}

impl ResponseData {
    /// Decode a raw body the way `response_type` asks for it.
    ///
    /// A JSON body that does not parse yields `Json(Null)`, matching how an
    /// event-driven transport reports an unparseable typed response.
    pub fn from_body(response_type: ResponseType, body: &Bytes) -> Self {
        match response_type {
            ResponseType::Default | ResponseType::Text => {
                ResponseData::Text(String::from_utf8_lossy(body).into_owned())
            }
            ResponseType::ArrayBuffer => ResponseData::Binary(body.clone()),
            ResponseType::Json => ResponseData::Json(
                serde_json::from_slice(body).unwrap_or(serde_json::Value::Null),
            ),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Progress notification forwarded from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub loaded: u64,
    /// `None` when the total length is not computable.
    pub total: Option<u64>,
}
