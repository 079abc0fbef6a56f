//! End-to-end requests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port and drives it through a small
//! socket-backed transport built on ureq. The transport runs each exchange
//! on its own thread and reports back through the executor's listeners, the
//! way a host event loop would. This checks that what the header pipeline
//! decides is what actually goes over the wire.

use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use request_core::{
    Body, CookieJar, ErrorCode, EventHandler, Executor, FormData, HttpMethod, PageOrigin,
    ProgressEvent, ProgressHandler, ReadyState, RequestConfig, ResponseData, ResponseType,
    Transport,
};

#[derive(Default)]
struct Exchange {
    method: String,
    url: String,
    timeout: Option<Duration>,
    response_type: Option<ResponseType>,
    headers: Vec<(String, String)>,
    ready_state: ReadyState,
    status: u16,
    status_text: String,
    raw_headers: String,
    body: Bytes,
    aborted: bool,
    on_ready_state_change: Vec<EventHandler>,
    on_error: Vec<EventHandler>,
    on_timeout: Vec<EventHandler>,
    on_download_progress: Vec<ProgressHandler>,
    on_upload_progress: Vec<ProgressHandler>,
}

enum Finish {
    Loaded,
    Failed,
    TimedOut,
}

/// Blocking ureq client adapted to the listener-based transport contract.
#[derive(Clone, Default)]
struct UreqTransport {
    inner: Arc<Mutex<Exchange>>,
}

impl UreqTransport {
    fn lock(&self) -> MutexGuard<'_, Exchange> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, body: Option<Body>) -> Finish {
        let (method, url, timeout, headers) = {
            let ex = self.lock();
            (ex.method.clone(), ex.url.clone(), ex.timeout, ex.headers.clone())
        };
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();

        let mut payload = body.map(|body| match body {
            Body::Text(text) => (None, text.into_bytes()),
            Body::Bytes(bytes) => (None, bytes.to_vec()),
            Body::Form(form) => {
                let boundary = uuid::Uuid::new_v4().simple().to_string();
                (
                    Some(format!("multipart/form-data; boundary={boundary}")),
                    form.to_multipart(&boundary),
                )
            }
        });
        if let Some((_, bytes)) = &payload {
            let len = bytes.len() as u64;
            self.progress(true, ProgressEvent { loaded: len, total: Some(len) });
        }

        let result = match method.as_str() {
            "GET" => apply(agent.get(&url), &headers).call(),
            "DELETE" => apply(agent.delete(&url), &headers).call(),
            "POST" | "PUT" => {
                let builder = if method == "POST" { agent.post(&url) } else { agent.put(&url) };
                let mut builder = apply(builder, &headers);
                match payload.take() {
                    Some((content_type, bytes)) => {
                        if let Some(content_type) = content_type {
                            builder = builder.header("content-type", &content_type);
                        }
                        builder.send(&bytes[..])
                    }
                    None => builder.send_empty(),
                }
            }
            other => panic!("unsupported method in test transport: {other}"),
        };

        match result {
            Ok(mut response) => {
                let status = response.status();
                let raw_headers: String = response
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        format!("{}: {}\r\n", name, value.to_str().unwrap_or_default())
                    })
                    .collect();
                let text = response.body_mut().read_to_string().unwrap_or_default();
                let mut ex = self.lock();
                ex.status = status.as_u16();
                ex.status_text = status.canonical_reason().unwrap_or_default().to_string();
                ex.raw_headers = raw_headers;
                ex.body = Bytes::from(text);
                Finish::Loaded
            }
            Err(ureq::Error::Timeout(_)) => Finish::TimedOut,
            Err(_) => Finish::Failed,
        }
    }

    fn progress(&self, upload: bool, event: ProgressEvent) {
        let handlers = {
            let ex = self.lock();
            if upload {
                ex.on_upload_progress.clone()
            } else {
                ex.on_download_progress.clone()
            }
        };
        for handler in handlers {
            handler.call(event);
        }
    }

    fn finish(&self, finish: Finish) {
        let (state_handlers, extra) = {
            let mut ex = self.lock();
            if ex.aborted {
                return;
            }
            ex.ready_state = ReadyState::Done;
            let extra = match finish {
                Finish::Loaded => Vec::new(),
                Finish::Failed => ex.on_error.clone(),
                Finish::TimedOut => ex.on_timeout.clone(),
            };
            (ex.on_ready_state_change.clone(), extra)
        };
        if matches!(finish, Finish::Loaded) {
            let len = self.lock().body.len() as u64;
            self.progress(false, ProgressEvent { loaded: len, total: Some(len) });
        }
        for handler in state_handlers.iter().chain(extra.iter()) {
            handler();
        }
    }
}

fn apply<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn open(&self, method: &str, url: &str) {
        let mut ex = self.lock();
        ex.method = method.to_string();
        ex.url = url.to_string();
        ex.ready_state = ReadyState::Opened;
    }

    fn set_response_type(&self, response_type: ResponseType) {
        self.lock().response_type = Some(response_type);
    }

    fn set_timeout(&self, timeout: Duration) {
        self.lock().timeout = Some(timeout);
    }

    fn set_with_credentials(&self, _with_credentials: bool) {}

    fn set_request_header(&self, name: &str, value: &str) {
        self.lock().headers.push((name.to_string(), value.to_string()));
    }

    fn on_ready_state_change(&self, handler: EventHandler) {
        self.lock().on_ready_state_change.push(handler);
    }

    fn on_error(&self, handler: EventHandler) {
        self.lock().on_error.push(handler);
    }

    fn on_timeout(&self, handler: EventHandler) {
        self.lock().on_timeout.push(handler);
    }

    fn on_download_progress(&self, handler: ProgressHandler) {
        self.lock().on_download_progress.push(handler);
    }

    fn on_upload_progress(&self, handler: ProgressHandler) {
        self.lock().on_upload_progress.push(handler);
    }

    fn send(&self, body: Option<Body>) {
        let transport = self.clone();
        std::thread::spawn(move || {
            let finish = transport.run(body);
            transport.finish(finish);
        });
    }

    fn abort(&self) {
        let handlers = {
            let mut ex = self.lock();
            if ex.ready_state == ReadyState::Done {
                return;
            }
            ex.aborted = true;
            ex.ready_state = ReadyState::Done;
            ex.status = 0;
            ex.on_ready_state_change.clone()
        };
        for handler in handlers {
            handler();
        }
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
        self.lock().raw_headers.clone()
    }

    fn response(&self) -> ResponseData {
        let ex = self.lock();
        ResponseData::from_body(ex.response_type.unwrap_or_default(), &ex.body)
    }

    fn response_text(&self) -> String {
        String::from_utf8_lossy(&self.lock().body).into_owned()
    }
}

fn start_server() -> String {
    static TRACING: Once = Once::new();
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn executor() -> Executor<UreqTransport> {
    Executor::new(UreqTransport::default)
}

fn echoed(data: &ResponseData) -> mock_server::Echo {
    serde_json::from_value(data.as_json().unwrap().clone()).unwrap()
}

#[tokio::test]
async fn get_sends_pipeline_headers_over_the_wire() {
    let base = start_server();
    let cookies = Arc::new(CookieJar::from_cookie_header("XSRF-TOKEN=wire%20token"));
    let executor = executor()
        .with_origin(PageOrigin::parse(&base).unwrap())
        .with_cookies(cookies);

    let response = executor
        .execute(
            RequestConfig::new(format!("{base}/echo"))
                .response_type(ResponseType::Json)
                .header("Content-Type", "application/json")
                .header("Accept", "application/json")
                .xsrf("XSRF-TOKEN", "X-XSRF-TOKEN")
                .auth("u", "p"),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.status_text, "OK");
    assert!(response.header("x-request-id").is_some());

    let echo = echoed(&response.data);
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.headers["accept"], "application/json");
    assert_eq!(echo.headers["x-xsrf-token"], "wire token");
    assert_eq!(echo.headers["authorization"], "Basic dTpw");
    assert!(!echo.headers.contains_key("content-type"));
}

#[tokio::test]
async fn cross_origin_request_gets_no_xsrf_header() {
    let base = start_server();
    let cookies = Arc::new(CookieJar::from_cookie_header("XSRF-TOKEN=tok"));
    let executor = executor()
        .with_origin(PageOrigin::parse("https://app.example.com/").unwrap())
        .with_cookies(cookies);

    let response = executor
        .execute(
            RequestConfig::new(format!("{base}/echo"))
                .response_type(ResponseType::Json)
                .xsrf("XSRF-TOKEN", "X-XSRF-TOKEN"),
        )
        .await
        .unwrap();

    assert!(!echoed(&response.data).headers.contains_key("x-xsrf-token"));
}

#[tokio::test]
async fn post_text_body_keeps_its_content_type() {
    let base = start_server();
    let uploads = Arc::new(Mutex::new(Vec::new()));
    let seen = uploads.clone();

    let response = executor()
        .execute(
            RequestConfig::new(format!("{base}/echo"))
                .method(HttpMethod::Post)
                .response_type(ResponseType::Json)
                .header("Content-Type", "text/plain")
                .data("hello server")
                .on_upload_progress(move |e| seen.lock().unwrap().push(e)),
        )
        .await
        .unwrap();

    let echo = echoed(&response.data);
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.body, "hello server");
    assert_eq!(echo.headers["content-type"], "text/plain");
    assert_eq!(
        *uploads.lock().unwrap(),
        vec![ProgressEvent { loaded: 12, total: Some(12) }]
    );
}

#[tokio::test]
async fn form_body_uses_transport_boundary() {
    let base = start_server();

    let response = executor()
        .execute(
            RequestConfig::new(format!("{base}/echo"))
                .method(HttpMethod::Post)
                .response_type(ResponseType::Json)
                .header("Content-Type", "application/json")
                .data(FormData::new().append("name", "ada")),
        )
        .await
        .unwrap();

    let echo = echoed(&response.data);
    assert!(echo.headers["content-type"].starts_with("multipart/form-data; boundary="));
    assert!(echo.body.contains("name=\"name\""));
}

#[tokio::test]
async fn rejected_status_keeps_the_response() {
    let base = start_server();

    let err = executor()
        .execute(
            RequestConfig::new(format!("{base}/status/404"))
                .validate_status(|status| (200..300).contains(&status)),
        )
        .await
        .unwrap_err();

    let err = err.as_request().unwrap();
    assert_eq!(err.message, "Request failed with status code 404");
    assert_eq!(err.code, None);
    let response = err.response().unwrap();
    assert_eq!(response.status, 404);
    assert_eq!(response.data, ResponseData::Text("status 404".to_string()));
}

#[tokio::test]
async fn status_without_validator_resolves() {
    let base = start_server();

    let response = executor()
        .execute(RequestConfig::new(format!("{base}/status/503")))
        .await
        .unwrap();

    assert_eq!(response.status, 503);
}

#[tokio::test]
async fn slow_server_times_out() {
    let base = start_server();

    let err = executor()
        .execute(RequestConfig::new(format!("{base}/delay/2000")).timeout(100))
        .await
        .unwrap_err();

    let err = err.as_request().unwrap();
    assert_eq!(err.code, Some(ErrorCode::ConnectionAborted));
    assert_eq!(err.message, "Timeout of 100 ms exceeded");
    assert!(err.response.is_none());
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let err = executor()
        .execute(RequestConfig::new(format!("http://{addr}/echo")))
        .await
        .unwrap_err();

    let err = err.as_request().unwrap();
    assert_eq!(err.message, "Network Error");
    assert!(err.code.is_none());
    assert!(err.response.is_none());
    assert_eq!(err.request.status(), 0);
}
