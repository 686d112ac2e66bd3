// In-process stand-in for the CoPA server, over HTTP or self-signed HTTPS.
//
// Runs an axum app on its own tokio runtime thread so the blocking client can
// be driven from plain `#[test]` functions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::serve::Listener;
use copa_client::{ExchangeError, ExchangeObserver, RemoteRequest, SessionChannel, TransportError};
use rcgen::CertifiedKey;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::server::TlsStream;

/// Request type the mock answers only after [`SLOW_DELAY`].
pub const SLOW_REQUEST: &str = "SlowRequest";
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub enum Hit {
    Login { user: String, password: String },
    Request { body: String, session: Option<String> },
}

#[derive(Clone)]
struct MockState {
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl MockState {
    fn record(&self, hit: Hit) {
        self.hits.lock().unwrap().push(hit);
    }
}

pub struct MockServer {
    scheme: &'static str,
    addr: SocketAddr,
    hits: Arc<Mutex<Vec<Hit>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockServer {
    /// Plain HTTP.
    pub fn spawn() -> Self {
        Self::start(None)
    }

    /// HTTPS with a fresh self-signed certificate for `localhost`.
    pub fn spawn_tls() -> Self {
        Self::start(Some(self_signed_config()))
    }

    fn start(tls: Option<Arc<ServerConfig>>) -> Self {
        let scheme = if tls.is_some() { "https" } else { "http" };
        let hits = Arc::new(Mutex::new(Vec::new()));
        let state = MockState { hits: hits.clone() };
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("Failed to build mock runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("Failed to bind mock server");
                addr_tx
                    .send(listener.local_addr().expect("Mock server has no address"))
                    .expect("Test dropped before mock server started");

                let app = Router::new()
                    .route("/login", post(login))
                    .route("/request", post(request))
                    .route("/moved", post(moved))
                    .with_state(state);

                let shutdown = async {
                    let _ = shutdown_rx.await;
                };

                let served = match tls {
                    None => {
                        axum::serve(listener, app)
                            .with_graceful_shutdown(shutdown)
                            .await
                    }
                    Some(config) => {
                        let listener = TlsListener {
                            listener,
                            acceptor: TlsAcceptor::from(config),
                        };
                        axum::serve(listener, app)
                            .with_graceful_shutdown(shutdown)
                            .await
                    }
                };
                served.expect("Mock server failed");
            });
        });

        let addr = addr_rx.recv().expect("Mock server did not start");

        MockServer {
            scheme,
            addr,
            hits,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn login_url(&self) -> String {
        format!("{}://{}/login", self.scheme, self.addr)
    }

    pub fn request_url(&self) -> String {
        format!("{}://{}/request", self.scheme, self.addr)
    }

    /// Answers with a 302 pointing at the request endpoint.
    pub fn moved_url(&self) -> String {
        format!("{}://{}/moved", self.scheme, self.addr)
    }

    /// A trust-all channel pointed at this server, not yet started.
    pub fn channel(&self) -> SessionChannel {
        SessionChannel::new(self.login_url(), self.request_url(), true)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn request_bodies(&self) -> Vec<String> {
        self.hits()
            .into_iter()
            .filter_map(|hit| match hit {
                Hit::Request { body, .. } => Some(body),
                Hit::Login { .. } => None,
            })
            .collect()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Accepts TCP connections and completes the TLS handshake before handing
/// them to axum. Failed handshakes (a client rejecting the certificate) are
/// dropped.
struct TlsListener {
    listener: tokio::net::TcpListener,
    acceptor: TlsAcceptor,
}

impl Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            let Ok((stream, addr)) = self.listener.accept().await else {
                continue;
            };
            if let Ok(stream) = self.acceptor.accept(stream).await {
                return (stream, addr);
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.listener.local_addr()
    }
}

fn self_signed_config() -> Arc<ServerConfig> {
    let CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .expect("Failed to generate certificate");
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .expect("No TLS protocol versions")
        .with_no_client_auth()
        .with_single_cert(vec![cert.der().clone()], key)
        .expect("Invalid certificate");

    Arc::new(config)
}

async fn login(
    State(state): State<MockState>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let user = form.get("j_username").cloned().unwrap_or_default();
    let password = form.get("j_password").cloned().unwrap_or_default();

    state.record(Hit::Login {
        user: user.clone(),
        password,
    });

    // Accepts any credentials
    (
        [(header::SET_COOKIE, format!("JSESSIONID={user}; Path=/"))],
        "",
    )
}

async fn moved() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/request")], "moved")
}

async fn request(
    State(state): State<MockState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> String {
    let body = form.get("req").cloned().unwrap_or_default();
    let session = session_user(&headers);

    state.record(Hit::Request {
        body: body.clone(),
        session: session.clone(),
    });

    let Ok(envelope) = serde_json::from_str::<Value>(&body) else {
        return format!("echo: {body}");
    };

    let kind = envelope["type"].as_str().unwrap_or_default().to_string();
    let content = envelope["content"].clone();

    match kind.as_str() {
        "GetEventGroupRequest" if content["eventGroupID"] == 7 => error_envelope(
            "PermissionException",
            "No permission to read event group 7",
        ),
        "GetCategoriesRequest" => "<html><body>503 Service Unavailable</body></html>".to_string(),
        "GetUserSettingsRequest" => match session {
            Some(user) => json!({
                "type": "GetUserSettingsResponse",
                "content": { "user": user }
            })
            .to_string(),
            None => error_envelope("PermissionException", "Not logged in"),
        },
        "CancelSingleEventRequest" => error_envelope(
            "RequestNotPracticableException",
            "Single event is already cancelled",
        ),
        "GetAllOwnersRequest" => error_envelope("InternalErrorException", "Database unavailable"),
        "GetEventRequest" => error_envelope("APIException", "Unknown event"),
        SLOW_REQUEST => {
            tokio::time::sleep(SLOW_DELAY).await;
            json!({ "type": "SlowResponse" }).to_string()
        }
        _ => json!({
            "type": kind.replace("Request", "Response"),
            "content": content
        })
        .to_string(),
    }
}

fn error_envelope(tag: &str, message: &str) -> String {
    json!({ "type": tag, "content": { "message": message } }).to_string()
}

fn session_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix("JSESSIONID="))
        .map(str::to_string)
}

/// Records every notification as a short line, in order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ExchangeObserver for RecordingObserver {
    fn request_sent(&self, _url: &str, body: &str) {
        self.push(format!("sent {body}"));
    }

    fn response_received(&self, _url: &str, status: u16, body: &str) {
        self.push(format!("received {status} {body}"));
    }

    fn transport_failed(&self, _url: &str, error: &TransportError) {
        self.push(format!("transport failed: {error}"));
    }

    fn exchange_failed(&self, error: &ExchangeError) {
        self.push(format!("exchange failed: {error}"));
    }

    fn channel_stopped(&self, _url: &str) {
        self.push("stopped".to_string());
    }
}

// Typed requests used by the tests. The real payload types live with the
// server's schema; these only mirror the envelope discriminators.

#[derive(Debug, Serialize)]
pub struct GetEventGroupRequest {
    #[serde(rename = "eventGroupID")]
    pub event_group_id: i32,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct GetEventGroupResponse {
    #[serde(rename = "eventGroupID")]
    pub event_group_id: i32,
}

impl RemoteRequest for GetEventGroupRequest {
    type Response = GetEventGroupResponse;

    fn request_type(&self) -> &str {
        "GetEventGroupRequest"
    }

    fn response_type(&self) -> &str {
        "GetEventGroupResponse"
    }
}

#[derive(Debug, Serialize)]
pub struct GetCategoriesRequest {}

impl RemoteRequest for GetCategoriesRequest {
    type Response = Value;

    fn request_type(&self) -> &str {
        "GetCategoriesRequest"
    }

    fn response_type(&self) -> &str {
        "GetCategoriesResponse"
    }
}

#[derive(Debug, Serialize)]
pub struct GetUserSettingsRequest {}

#[derive(Debug, Deserialize, PartialEq)]
pub struct GetUserSettingsResponse {
    pub user: String,
}

impl RemoteRequest for GetUserSettingsRequest {
    type Response = GetUserSettingsResponse;

    fn request_type(&self) -> &str {
        "GetUserSettingsRequest"
    }

    fn response_type(&self) -> &str {
        "GetUserSettingsResponse"
    }
}

#[derive(Debug, Serialize)]
pub struct SlowRequest {}

impl RemoteRequest for SlowRequest {
    type Response = ();

    fn request_type(&self) -> &str {
        SLOW_REQUEST
    }

    fn response_type(&self) -> &str {
        "SlowResponse"
    }
}
