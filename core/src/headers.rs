//! Header parsing and the outbound header pipeline.
//!
//! # Design
//! Outbound headers go through four ordered steps before anything reaches
//! the transport:
//!
//! 1. a form body drops `content-type` (the transport owns the boundary);
//! 2. the XSRF cookie is copied into its header when credentials are sent
//!    or the target is same-origin;
//! 3. basic credentials become an `Authorization` header;
//! 4. with no body, any `content-type` is dropped.
//!
//! Each step is a plain mutation of the header map so it can be tested
//! without a transport. The executor applies whatever survives.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::config::RequestConfig;
use crate::cookie::CookieSource;
use crate::http::{Body, Headers};
use crate::origin::OriginCheck;
use crate::types::BasicAuth;

pub const AUTHORIZATION: &str = "Authorization";

const CONTENT_TYPE: &str = "content-type";

/// Parse a raw `name: value` header block into lower-cased names.
///
/// Lines without a name are skipped. A repeated name keeps the last value.
pub fn parse_headers(raw: &str) -> Headers {
    let mut parsed = Headers::new();
    for line in raw.lines() {
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value),
            None => (line, ""),
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        parsed.insert(name, value.trim().to_string());
    }
    parsed
}

/// Run the full pipeline over `config.headers`.
pub fn process_headers(config: &mut RequestConfig, origin: &dyn OriginCheck, cookies: &dyn CookieSource) {
    strip_form_content_type(&mut config.headers, config.data.as_ref());

    let send_xsrf = config.with_credentials.unwrap_or(false) || origin.is_same_origin(&config.url);
    if send_xsrf {
        if let Some(cookie_name) = config.xsrf_cookie_name.as_deref() {
            inject_xsrf(
                &mut config.headers,
                cookies.read(cookie_name),
                config.xsrf_header_name.as_deref(),
            );
        }
    }

    if let Some(auth) = &config.auth {
        inject_basic_auth(&mut config.headers, auth);
    }

    strip_bodyless_content_type(&mut config.headers, config.data.as_ref());
}

/// Remove `content-type` in any casing when the body is a form payload.
pub fn strip_form_content_type(headers: &mut Headers, data: Option<&Body>) {
    if data.is_some_and(Body::is_form_data) {
        remove_content_type(headers);
    }
}

/// Copy a non-empty XSRF cookie value into `header_name`.
pub fn inject_xsrf(headers: &mut Headers, cookie_value: Option<String>, header_name: Option<&str>) {
    let (Some(value), Some(name)) = (cookie_value, header_name) else {
        return;
    };
    if !value.is_empty() {
        headers.insert(name.to_string(), value);
    }
}

/// Set `Authorization: Basic base64(username:password)`.
pub fn inject_basic_auth(headers: &mut Headers, auth: &BasicAuth) {
    headers.insert(AUTHORIZATION.to_string(), basic_auth_value(auth));
}

/// With no body there is nothing to describe, so no `content-type` is sent.
pub fn strip_bodyless_content_type(headers: &mut Headers, data: Option<&Body>) {
    if data.is_none() {
        remove_content_type(headers);
    }
}

pub fn basic_auth_value(auth: &BasicAuth) -> String {
    let credentials = format!("{}:{}", auth.username, auth.password);
    format!("Basic {}", STANDARD.encode(credentials.as_bytes()))
}

fn remove_content_type(headers: &mut Headers) {
    headers.retain(|name, _| !name.eq_ignore_ascii_case(CONTENT_TYPE));
}
