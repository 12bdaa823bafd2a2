//! The probe driver: handshake, operations, stream subscription.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use accord_core::rpc::{self, PROTOCOL_VERSION, SESSION_HEADER};

use crate::collector::NotificationCollector;
use crate::sse::{self, SseParser};

/// Failure observed while probing. Scenario code converts these into
/// FAILURE checks; they never escape a scenario's `run`.
#[derive(Debug)]
pub enum ProbeError {
    /// Transport-level failure (connect, send, read).
    Http(reqwest::Error),
    /// Non-success HTTP status.
    Status { status: u16, body: String },
    /// The response violated the envelope contract.
    Protocol(String),
    /// The server answered with a JSON-RPC error.
    Rpc { code: i64, message: String },
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "http error: {e}"),
            Self::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Rpc { code, message } => write!(f, "rpc error {code}: {message}"),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

/// Parse a response body that may be plain JSON or a one-event SSE body.
///
/// Servers are permitted to answer a POST either way; the probe accepts
/// both rather than failing conformant implementations on framing.
pub fn parse_response_body(text: &str) -> Result<Value, ProbeError> {
    let payload = if sse::looks_like_event_stream(text) {
        sse::first_data_payload(text)
            .ok_or_else(|| ProbeError::Protocol(format!("SSE response without data line: {text}")))?
    } else {
        text.to_string()
    };
    serde_json::from_str(&payload)
        .map_err(|e| ProbeError::Protocol(format!("invalid JSON response: {e}")))
}

/// A connected probe session against a remote endpoint.
///
/// `connect` performs the initialize handshake and captures the
/// server-minted session id; every subsequent operation carries it. The
/// probe issues each operation exactly once.
pub struct Probe {
    client: reqwest::Client,
    endpoint: String,
    session_id: String,
    initialize_response: Value,
    next_id: AtomicU64,
    collector: NotificationCollector,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Probe {
    /// Handshake against `endpoint`: send `initialize`, capture the session
    /// id from the response header, acknowledge with
    /// `notifications/initialized`.
    pub async fn connect(endpoint: &str) -> Result<Self, ProbeError> {
        let client = reqwest::Client::new();
        let body = rpc::request(
            1,
            "initialize",
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": "accord-probe",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        );

        let resp = client
            .post(endpoint)
            .header("accept", "application/json, text/event-stream")
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let session_id = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let initialize_response = parse_response_body(&text)?;
        let session_id = session_id.ok_or_else(|| {
            ProbeError::Protocol("server did not return a session id on initialize".into())
        })?;

        let probe = Self {
            client,
            endpoint: endpoint.to_string(),
            session_id,
            initialize_response,
            next_id: AtomicU64::new(2),
            collector: NotificationCollector::new(),
            reader: Mutex::new(None),
        };
        probe
            .notify(rpc::notifications::INITIALIZED, json!({}))
            .await?;
        Ok(probe)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The full initialize response envelope, for handshake checks.
    pub fn initialize_response(&self) -> &Value {
        &self.initialize_response
    }

    /// Issue a request and return its `result`.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ProbeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = rpc::request(id, method, params);

        let resp = self
            .client
            .post(&self.endpoint)
            .header(SESSION_HEADER, &self.session_id)
            .header("accept", "application/json, text/event-stream")
            .json(&envelope)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let body = parse_response_body(&text)?;
        if let Some(error) = body.get("error") {
            return Err(ProbeError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| ProbeError::Protocol("response missing result".into()))
    }

    /// Send a notification; nothing comes back.
    pub async fn notify(&self, method: &str, params: Value) -> Result<(), ProbeError> {
        let envelope = rpc::notification(method, params);
        let resp = self
            .client
            .post(&self.endpoint)
            .header(SESSION_HEADER, &self.session_id)
            .json(&envelope)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Open the server-push stream and start collecting notifications.
    ///
    /// Returns a handle onto the shared collector. Call before issuing the
    /// operation whose notifications you want to observe.
    pub async fn open_stream(&self) -> Result<NotificationCollector, ProbeError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header(SESSION_HEADER, &self.session_id)
            .header("accept", "text/event-stream")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let collector = self.collector.clone();
        let task = tokio::spawn(read_stream(resp, collector));
        if let Some(previous) = self.reader.lock().replace(task) {
            previous.abort();
        }
        Ok(self.collector.clone())
    }

    /// Terminate the session (DELETE).
    pub async fn terminate(&self) -> Result<(), ProbeError> {
        let resp = self
            .client
            .delete(&self.endpoint)
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        if let Some(task) = self.reader.lock().take() {
            task.abort();
        }
    }
}

/// Read the SSE body, parse events, record them on the collector.
async fn read_stream(resp: reqwest::Response, collector: NotificationCollector) {
    let mut parser = SseParser::new();
    let mut body = resp.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "push stream read error");
                break;
            }
        };
        for payload in parser.feed(&chunk) {
            match serde_json::from_str::<Value>(&payload) {
                Ok(notification) => collector.record(notification),
                Err(e) => tracing::warn!(error = %e, "unparseable push notification"),
            }
        }
    }
    tracing::debug!("push stream ended");
}
