//! Drives one request over one transport handle to a single outcome.
//!
//! # Design
//! The transport reports through listeners; the caller wants one future.
//! `Executor` bridges the two with a `Settlement` cell: every listener
//! (load, error, timeout) and the cancellation branch try to settle it, the
//! first one wins and the rest are no-ops.
//!
//! Sequence per call: pipeline the headers, open, configure, register
//! listeners, apply headers, send, then wait on the outcome and the cancel
//! token together. The header pipeline only touches the config map, so the
//! transport still sees open → configure → listeners → headers → send.
//!
//! A terminal readiness with status 0 is left to the error or timeout
//! listener. Transports report network failures and timeouts that way, and
//! settling from both paths would race. This relies on the transport firing
//! one of those listeners; it is not checked here.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::{debug, trace, warn, Instrument};
use uuid::Uuid;

use crate::config::RequestConfig;
use crate::cookie::{CookieJar, CookieSource};
use crate::error::{Error, ErrorCode, RequestError};
use crate::headers::{parse_headers, process_headers};
use crate::http::ResponseData;
use crate::origin::{CrossOrigin, OriginCheck};
use crate::response::Response;
use crate::settle::{settlement, Settlement};
use crate::transport::{ReadyState, Transport};

type Outcome<T> = Result<Response<T>, Error<T>>;

/// Executes requests over transports produced by a factory.
pub struct Executor<T> {
    connect: Arc<dyn Fn() -> T + Send + Sync>,
    origin: Arc<dyn OriginCheck>,
    cookies: Arc<dyn CookieSource>,
}

impl<T> Clone for Executor<T> {
    fn clone(&self) -> Self {
        Self {
            connect: Arc::clone(&self.connect),
            origin: Arc::clone(&self.origin),
            cookies: Arc::clone(&self.cookies),
        }
    }
}

impl<T: Transport> Executor<T> {
    /// Every request is cross-origin and no cookies are visible until
    /// `with_origin` / `with_cookies` say otherwise.
    pub fn new(connect: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            connect: Arc::new(connect),
            origin: Arc::new(CrossOrigin),
            cookies: Arc::new(CookieJar::new()),
        }
    }

    pub fn with_origin(mut self, origin: impl OriginCheck + 'static) -> Self {
        self.origin = Arc::new(origin);
        self
    }

    pub fn with_cookies(mut self, cookies: Arc<dyn CookieSource>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Send `config` on a fresh transport handle.
    pub async fn execute(&self, config: RequestConfig) -> Outcome<T> {
        let request = Arc::new((self.connect)());
        self.execute_on(request, config).await
    }

    /// Send `config` on `request`. The handle must be unused.
    pub async fn execute_on(&self, request: Arc<T>, config: RequestConfig) -> Outcome<T> {
        let span = tracing::debug_span!(
            "request",
            id = %Uuid::new_v4(),
            method = %config.method,
            url = %config.url,
        );
        self.dispatch(request, config).instrument(span).await
    }

    async fn dispatch(&self, request: Arc<T>, mut config: RequestConfig) -> Outcome<T> {
        process_headers(&mut config, self.origin.as_ref(), self.cookies.as_ref());
        let config = Arc::new(config);

        request.open(config.method.as_str(), &config.url);
        debug!("opened");
        configure_request(request.as_ref(), &config);

        let (settle, mut outcome) = settlement();
        let exchange = Exchange {
            request: Arc::downgrade(&request),
            config: Arc::clone(&config),
            settle,
        };
        add_events(request.as_ref(), &exchange);

        for (name, value) in &config.headers {
            request.set_request_header(name, value);
        }

        // A token cancelled before the call wins over anything `send` reports.
        let cancelled_early = config.cancel_token.as_ref().and_then(|token| token.reason());
        if let Some(reason) = cancelled_early.clone() {
            if exchange.settle.settle(Err(Error::Cancelled(reason))) {
                warn!("cancelled before send");
            }
        }

        request.send(config.data.clone());
        debug!(headers = config.headers.len(), "sent");
        if cancelled_early.is_some() {
            request.abort();
        }

        let settled = match &config.cancel_token {
            Some(token) => {
                tokio::select! {
                    biased;
                    settled = &mut outcome => settled,
                    reason = token.cancelled() => {
                        request.abort();
                        if exchange.settle.settle(Err(Error::Cancelled(reason))) {
                            warn!("cancelled, transport aborted");
                        }
                        outcome.await
                    }
                }
            }
            None => outcome.await,
        };

        // `exchange` keeps a sender alive until here, so the channel cannot
        // close unsettled; map it anyway rather than panic.
        settled.unwrap_or_else(|_| {
            Err(Error::Request(RequestError::new(
                "Request dropped before completion",
                Arc::clone(&config),
                None,
                Arc::clone(&request),
                None,
            )))
        })
    }
}

/// Only override transport defaults that were asked for.
fn configure_request<T: Transport>(request: &T, config: &RequestConfig) {
    if let Some(response_type) = config.response_type {
        request.set_response_type(response_type);
    }
    if let Some(millis) = config.effective_timeout() {
        request.set_timeout(Duration::from_millis(millis));
    }
    if config.with_credentials == Some(true) {
        request.set_with_credentials(true);
    }
}

fn add_events<T: Transport>(request: &T, exchange: &Exchange<T>) {
    let on_load = exchange.clone();
    request.on_ready_state_change(Arc::new(move || on_load.handle_load()));

    let on_error = exchange.clone();
    request.on_error(Arc::new(move || on_error.handle_error()));

    let on_timeout = exchange.clone();
    request.on_timeout(Arc::new(move || on_timeout.handle_timeout()));

    if let Some(handler) = &exchange.config.on_download_progress {
        request.on_download_progress(handler.clone());
    }
    if let Some(handler) = &exchange.config.on_upload_progress {
        request.on_upload_progress(handler.clone());
    }
}

/// State shared by the listeners of one request.
struct Exchange<T> {
    // Weak: the transport owns these listeners.
    request: Weak<T>,
    config: Arc<RequestConfig>,
    settle: Settlement<Outcome<T>>,
}

impl<T> Clone for Exchange<T> {
    fn clone(&self) -> Self {
        Self {
            request: Weak::clone(&self.request),
            config: Arc::clone(&self.config),
            settle: self.settle.clone(),
        }
    }
}

impl<T: Transport> Exchange<T> {
    fn handle_load(&self) {
        if self.settle.is_settled() {
            return;
        }
        let Some(request) = self.request.upgrade() else {
            return;
        };
        let state = request.ready_state();
        if state != ReadyState::Done {
            trace!(%state, "ready state changed");
            return;
        }
        if request.status() == 0 {
            trace!("done with status 0, deferring to error/timeout listener");
            return;
        }

        let headers = parse_headers(&request.all_response_headers());
        let data = if self.config.response_type.unwrap_or_default().is_text() {
            ResponseData::Text(request.response_text())
        } else {
            request.response()
        };
        let response = Response {
            data,
            status: request.status(),
            status_text: request.status_text(),
            headers,
            config: Arc::clone(&self.config),
            request,
        };
        self.handle_response(response);
    }

    fn handle_error(&self) {
        self.reject("Network Error".to_string(), None, None);
    }

    fn handle_timeout(&self) {
        let message = match self.config.timeout {
            Some(millis) => format!("Timeout of {millis} ms exceeded"),
            None => "Timeout exceeded".to_string(),
        };
        self.reject(message, Some(ErrorCode::ConnectionAborted), None);
    }

    fn handle_response(&self, response: Response<T>) {
        let status = response.status;
        let accepted = self
            .config
            .validate_status
            .as_ref()
            .map_or(true, |validate| validate.accepts(status));
        if accepted {
            if self.settle.settle(Ok(response)) {
                debug!(status, "resolved");
            }
        } else {
            self.reject(
                format!("Request failed with status code {status}"),
                None,
                Some(response),
            );
        }
    }

    fn reject(&self, message: String, code: Option<ErrorCode>, response: Option<Response<T>>) {
        let Some(request) = self.request.upgrade() else {
            return;
        };
        let err = RequestError::new(message, Arc::clone(&self.config), code, request, response);
        let message = err.message.clone();
        if self.settle.settle(Err(Error::Request(err))) {
            debug!(%message, "rejected");
        } else {
            trace!(%message, "already settled, ignoring");
        }
    }
}
