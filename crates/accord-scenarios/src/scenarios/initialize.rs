//! Probe scenario: validate an external server's initialize handshake.

use futures::future::BoxFuture;
use serde_json::{Value, json};

use accord_core::rpc::{self, PROTOCOL_VERSION, SESSION_HEADER};
use accord_core::{Check, SpecRef};
use accord_probe::{ProbeError, parse_response_body};

use crate::scenario::ClientScenario;

const CHECK_ID: &str = "server-initialize";
const EXPECTED: &[&str] = &[CHECK_ID];

/// Sends a raw `initialize` request and validates the response envelope
/// field by field. Deliberately does not use the full probe handshake, so
/// a server that cannot even mint a session still gets a precise verdict.
pub struct ServerInitializeScenario;

impl ClientScenario for ServerInitializeScenario {
    fn name(&self) -> &'static str {
        "server-initialize"
    }

    fn description(&self) -> &'static str {
        "Validates the server's response to an initialize request"
    }

    fn expected_checks(&self) -> &'static [&'static str] {
        EXPECTED
    }

    fn run<'a>(&'a self, server_url: &'a str) -> BoxFuture<'a, Vec<Check>> {
        Box::pin(async move {
            let check = match fetch_initialize(server_url).await {
                Ok(response) => validate_initialize(&response),
                Err(e) => Check::failure(
                    CHECK_ID,
                    "ServerInitialize",
                    "Server responds to an initialize request",
                    format!("failed to send initialize request: {e}"),
                )
                .with_details(json!({ "serverUrl": server_url })),
            }
            .with_spec_ref(SpecRef::id_only("lifecycle/initialize"));
            vec![check]
        })
    }
}

struct InitializeResponse {
    envelope: Value,
    session_id: Option<String>,
}

async fn fetch_initialize(server_url: &str) -> Result<InitializeResponse, ProbeError> {
    let client = reqwest::Client::new();
    let body = rpc::request(
        1,
        "initialize",
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": "accord-probe", "version": env!("CARGO_PKG_VERSION") },
        }),
    );

    let resp = client
        .post(server_url)
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

    Ok(InitializeResponse {
        envelope: parse_response_body(&text)?,
        session_id,
    })
}

fn validate_initialize(response: &InitializeResponse) -> Check {
    let envelope = &response.envelope;
    let result = envelope.get("result");
    let mut errors = Vec::new();

    if envelope.get("jsonrpc").and_then(Value::as_str) != Some(rpc::JSONRPC_VERSION) {
        errors.push("missing or wrong jsonrpc field".to_string());
    }
    if envelope.get("id").map_or(true, Value::is_null) {
        errors.push("missing id field".to_string());
    }
    match result {
        None => errors.push("missing result field".to_string()),
        Some(result) => {
            match result.get("protocolVersion").and_then(Value::as_str) {
                None => errors.push("missing protocolVersion in result".to_string()),
                Some(version) if version != PROTOCOL_VERSION => errors.push(format!(
                    "protocol version mismatch: expected {PROTOCOL_VERSION}, got {version}"
                )),
                Some(_) => {}
            }
            if result.pointer("/serverInfo/name").and_then(Value::as_str).is_none() {
                errors.push("missing server name in serverInfo".to_string());
            }
            if result.pointer("/serverInfo/version").and_then(Value::as_str).is_none() {
                errors.push("missing server version in serverInfo".to_string());
            }
            if result.get("capabilities").is_none() {
                errors.push("missing capabilities in result".to_string());
            }
        }
    }
    if response.session_id.is_none() {
        errors.push("server did not return a session id header".to_string());
    }

    Check::from_errors(
        CHECK_ID,
        "ServerInitialize",
        "Server responds to an initialize request with a valid envelope",
        errors,
    )
    .with_details(json!({
        "expectedProtocolVersion": PROTOCOL_VERSION,
        "response": envelope,
    }))
}
