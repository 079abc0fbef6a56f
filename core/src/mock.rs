//! Scripted in-memory transport.
//!
//! `MockTransport` records everything the executor does to it and replies
//! the way it was told. Built with `replying`, it plays its `MockReply` as
//! soon as the request is sent. Built with `new`, it stays pending until
//! the test drives it with `respond`, `fail`, `time_out` or `abort`.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::watch;

use crate::config::ProgressHandler;
use crate::http::{Body, ProgressEvent, ResponseData, ResponseType};
use crate::transport::{EventHandler, ReadyState, Transport};

/// What the mock does once it is driven.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    Response {
        status: u16,
        status_text: String,
        headers: Vec<(String, String)>,
        body: Bytes,
    },
    NetworkError,
    Timeout,
}

impl MockReply {
    pub fn status(status: u16) -> Self {
        MockReply::Response {
            status,
            status_text: reason_phrase(status).to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Add a response header. No-op on failure replies.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let MockReply::Response { headers, .. } = &mut self {
            headers.push((name.to_string(), value.to_string()));
        }
        self
    }

    /// Set the response body. No-op on failure replies.
    pub fn body(mut self, content: impl Into<Bytes>) -> Self {
        if let MockReply::Response { body, .. } = &mut self {
            *body = content.into();
        }
        self
    }
}

#[derive(Default)]
struct Listeners {
    ready_state_change: Vec<EventHandler>,
    error: Vec<EventHandler>,
    timeout: Vec<EventHandler>,
    download_progress: Vec<ProgressHandler>,
    upload_progress: Vec<ProgressHandler>,
}

#[derive(Default)]
struct State {
    opened: Option<(String, String)>,
    response_type: Option<ResponseType>,
    timeout: Option<Duration>,
    with_credentials: bool,
    request_headers: Vec<(String, String)>,
    sent: bool,
    sent_body: Option<Body>,
    aborted: bool,
    ready_state: ReadyState,
    status: u16,
    status_text: String,
    response_headers: Vec<(String, String)>,
    response_body: Bytes,
    listeners: Listeners,
    script: Option<MockReply>,
}

pub struct MockTransport {
    state: Mutex<State>,
    sent: watch::Sender<bool>,
}

impl MockTransport {
    /// A mock that stays pending after `send`.
    pub fn new() -> Self {
        let (sent, _) = watch::channel(false);
        Self {
            state: Mutex::new(State::default()),
            sent,
        }
    }

    /// A mock that plays `reply` when sent.
    pub fn replying(reply: MockReply) -> Self {
        let mock = Self::new();
        mock.lock().script = Some(reply);
        mock
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn opened(&self) -> Option<(String, String)> {
        self.lock().opened.clone()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.lock().timeout
    }

    pub fn with_credentials(&self) -> bool {
        self.lock().with_credentials
    }

    pub fn response_type(&self) -> Option<ResponseType> {
        self.lock().response_type
    }

    /// Headers applied through `set_request_header`, in order.
    pub fn request_headers(&self) -> Vec<(String, String)> {
        self.lock().request_headers.clone()
    }

    pub fn was_sent(&self) -> bool {
        self.lock().sent
    }

    pub fn sent_body(&self) -> Option<Body> {
        self.lock().sent_body.clone()
    }

    pub fn aborted(&self) -> bool {
        self.lock().aborted
    }

    pub fn has_progress_listeners(&self) -> bool {
        let state = self.lock();
        !state.listeners.download_progress.is_empty() || !state.listeners.upload_progress.is_empty()
    }

    /// Wait until the executor has called `send`.
    pub async fn wait_sent(&self) {
        let mut rx = self.sent.subscribe();
        let _ = rx.wait_for(|sent| *sent).await;
    }

    /// Play a reply now.
    pub fn respond(&self, reply: MockReply) {
        match reply {
            MockReply::Response {
                status,
                status_text,
                headers,
                body,
            } => {
                self.set_ready_state(ReadyState::HeadersReceived, |state| {
                    state.status = status;
                    state.status_text = status_text;
                    state.response_headers = headers;
                });
                self.set_ready_state(ReadyState::Loading, |state| {
                    state.response_body = body.clone();
                });
                let total = body.len() as u64;
                self.emit_download_progress(ProgressEvent {
                    loaded: total,
                    total: Some(total),
                });
                self.set_ready_state(ReadyState::Done, |_| {});
            }
            MockReply::NetworkError => self.fail(),
            MockReply::Timeout => self.time_out(),
        }
    }

    /// Fail like a refused connection: done with status 0, then `error`.
    pub fn fail(&self) {
        self.finish_without_status();
        let handlers = self.lock().listeners.error.clone();
        for handler in handlers {
            handler();
        }
    }

    /// Time out: done with status 0, then `timeout`.
    pub fn time_out(&self) {
        self.finish_without_status();
        let handlers = self.lock().listeners.timeout.clone();
        for handler in handlers {
            handler();
        }
    }

    pub fn emit_download_progress(&self, event: ProgressEvent) {
        let handlers = self.lock().listeners.download_progress.clone();
        for handler in handlers {
            handler.call(event);
        }
    }

    pub fn emit_upload_progress(&self, event: ProgressEvent) {
        let handlers = self.lock().listeners.upload_progress.clone();
        for handler in handlers {
            handler.call(event);
        }
    }

    fn finish_without_status(&self) {
        self.set_ready_state(ReadyState::Done, |state| {
            state.status = 0;
            state.status_text.clear();
        });
    }

    /// Update state under the lock, then notify with the lock released.
    fn set_ready_state(&self, ready_state: ReadyState, update: impl FnOnce(&mut State)) {
        let handlers = {
            let mut state = self.lock();
            update(&mut state);
            state.ready_state = ready_state;
            state.listeners.ready_state_change.clone()
        };
        for handler in handlers {
            handler();
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn open(&self, method: &str, url: &str) {
        let mut state = self.lock();
        state.opened = Some((method.to_string(), url.to_string()));
        state.ready_state = ReadyState::Opened;
    }

    fn set_response_type(&self, response_type: ResponseType) {
        self.lock().response_type = Some(response_type);
    }

    fn set_timeout(&self, timeout: Duration) {
        self.lock().timeout = Some(timeout);
    }

    fn set_with_credentials(&self, with_credentials: bool) {
        self.lock().with_credentials = with_credentials;
    }

    fn set_request_header(&self, name: &str, value: &str) {
        self.lock()
            .request_headers
            .push((name.to_string(), value.to_string()));
    }

    fn on_ready_state_change(&self, handler: EventHandler) {
        self.lock().listeners.ready_state_change.push(handler);
    }

    fn on_error(&self, handler: EventHandler) {
        self.lock().listeners.error.push(handler);
    }

    fn on_timeout(&self, handler: EventHandler) {
        self.lock().listeners.timeout.push(handler);
    }

    fn on_download_progress(&self, handler: ProgressHandler) {
        self.lock().listeners.download_progress.push(handler);
    }

    fn on_upload_progress(&self, handler: ProgressHandler) {
        self.lock().listeners.upload_progress.push(handler);
    }

    fn send(&self, body: Option<Body>) {
        let (script, upload) = {
            let mut state = self.lock();
            state.sent = true;
            let upload = body.as_ref().map(|b| b.len() as u64);
            state.sent_body = body;
            (state.script.take(), upload)
        };
        self.sent.send_replace(true);

        if let Some(reply) = script {
            if let Some(len) = upload {
                self.emit_upload_progress(ProgressEvent {
                    loaded: len,
                    total: Some(len),
                });
            }
            self.respond(reply);
        }
    }

    fn abort(&self) {
        {
            let mut state = self.lock();
            if state.ready_state == ReadyState::Done {
                return;
            }
            state.aborted = true;
        }
        self.finish_without_status();
    }

    fn ready_state(&self) -> ReadyState {
        self.lock().ready_state
    }

    fn status(&self) -> u16 {
        self.lock().status
    }

    fn status_text(&self) -> String {
        self.lock().status_text.clone()
    }

    fn all_response_headers(&self) -> String {
        self.lock()
            .response_headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}\r\n"))
            .collect()
    }

    fn response(&self) -> ResponseData {
        let state = self.lock();
        ResponseData::from_body(state.response_type.unwrap_or_default(), &state.response_body)
    }

    fn response_text(&self) -> String {
        String::from_utf8_lossy(&self.lock().response_body).into_owned()
    }
}

/// Canonical reason phrase for common status codes.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}
