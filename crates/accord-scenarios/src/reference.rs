//! A reference protocol engine.
//!
//! This is a test fixture, not a production protocol implementation: just
//! enough surface for scenarios to drive. It answers `initialize` and
//! `tools/list`, and exposes three test tools:
//!
//! - `test_simple_text` returns a text content item
//! - `test_with_logging` pushes three log notifications, then responds
//! - `test_with_progress` pushes progress 10/50/100, then responds
//!
//! When constructed with a ledger, the engine appends scenario checks from
//! inside its handlers, so a client that never triggers a path leaves its
//! check to be synthesized as FAILURE at reconciliation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::{Value, json};

use accord_core::rpc::{self, PROTOCOL_VERSION, error_codes, notifications};
use accord_core::{
    Check, CheckLedger, EngineError, EngineFactory, EngineFuture, ProtocolEngine, PushHandle,
};

/// Progress values emitted by `test_with_progress`, in push order.
const PROGRESS_STEPS: [u64; 3] = [10, 50, 100];

pub struct ReferenceEngine {
    push: Mutex<Option<PushHandle>>,
    ledger: Option<Arc<Mutex<CheckLedger>>>,
    disposed: AtomicBool,
}

impl ReferenceEngine {
    pub fn new() -> Self {
        Self {
            push: Mutex::new(None),
            ledger: None,
            disposed: AtomicBool::new(false),
        }
    }

    /// An engine that appends lifecycle checks into the given ledger.
    pub fn with_ledger(ledger: Arc<Mutex<CheckLedger>>) -> Self {
        Self {
            push: Mutex::new(None),
            ledger: Some(ledger),
            disposed: AtomicBool::new(false),
        }
    }

    /// Factory for ledger-less engines (plain test server).
    pub fn factory() -> Arc<dyn EngineFactory> {
        Arc::new(|| -> Arc<dyn ProtocolEngine> { Arc::new(ReferenceEngine::new()) })
    }

    /// Factory for engines appending checks into a shared ledger.
    pub fn factory_with_ledger(ledger: Arc<Mutex<CheckLedger>>) -> Arc<dyn EngineFactory> {
        Arc::new(move || -> Arc<dyn ProtocolEngine> {
            Arc::new(ReferenceEngine::with_ledger(ledger.clone()))
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn append(ledger: &Option<Arc<Mutex<CheckLedger>>>, check: Check) {
    if let Some(ledger) = ledger {
        ledger.lock().append(check);
    }
}

fn tool_descriptor(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": { "type": "object", "properties": {}, "required": [] },
    })
}

fn text_content(text: &str) -> Value {
    json!({ "content": [ { "type": "text", "text": text } ] })
}

impl ProtocolEngine for ReferenceEngine {
    fn bind(&self, push: PushHandle) {
        *self.push.lock() = Some(push);
    }

    fn handle(&self, request: Value) -> EngineFuture {
        let push = self.push.lock().clone();
        let ledger = self.ledger.clone();

        Box::pin(async move {
            let id = request.get("id").cloned().unwrap_or(Value::Null);
            let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

            match rpc::method(&request) {
                Some("initialize") => {
                    let mut errors = Vec::new();
                    if params.get("protocolVersion").and_then(Value::as_str).is_none() {
                        errors.push("missing protocolVersion".to_string());
                    }
                    if params.pointer("/clientInfo/name").and_then(Value::as_str).is_none() {
                        errors.push("missing clientInfo.name".to_string());
                    }
                    if params.pointer("/clientInfo/version").and_then(Value::as_str).is_none() {
                        errors.push("missing clientInfo.version".to_string());
                    }
                    append(
                        &ledger,
                        Check::from_errors(
                            "initialize-received",
                            "InitializeReceived",
                            "Client sends a well-formed initialize request",
                            errors,
                        ),
                    );
                    Ok(Some(rpc::response(
                        id,
                        json!({
                            "protocolVersion": PROTOCOL_VERSION,
                            "capabilities": { "tools": {}, "logging": {} },
                            "serverInfo": {
                                "name": "accord-reference",
                                "version": env!("CARGO_PKG_VERSION"),
                            },
                        }),
                    )))
                }

                Some("tools/list") => {
                    append(
                        &ledger,
                        Check::success(
                            "tools-listed",
                            "ToolsListed",
                            "Client requests the tool inventory",
                        ),
                    );
                    Ok(Some(rpc::response(
                        id,
                        json!({
                            "tools": [
                                tool_descriptor("test_simple_text", "Returns a short text result"),
                                tool_descriptor("test_with_logging", "Pushes three log notifications while running"),
                                tool_descriptor("test_with_progress", "Pushes three progress notifications while running"),
                            ],
                        }),
                    )))
                }

                Some("tools/call") => {
                    let tool = params.get("name").and_then(Value::as_str).unwrap_or("");
                    match tool {
                        "test_simple_text" => {
                            append(
                                &ledger,
                                Check::success(
                                    "tool-invoked",
                                    "ToolInvoked",
                                    "Client calls a tool and receives its result",
                                ),
                            );
                            Ok(Some(rpc::response(id, text_content("hello from accord"))))
                        }
                        "test_with_logging" => {
                            let push =
                                push.ok_or_else(|| EngineError::new("engine not bound"))?;
                            for i in 0..3 {
                                push.push(rpc::notification(
                                    notifications::LOG,
                                    json!({ "level": "info", "message": format!("log line {i}") }),
                                ));
                            }
                            Ok(Some(rpc::response(id, text_content("logged 3 lines"))))
                        }
                        "test_with_progress" => {
                            let push =
                                push.ok_or_else(|| EngineError::new("engine not bound"))?;
                            let token = params
                                .pointer("/_meta/progressToken")
                                .cloned()
                                .unwrap_or(Value::Null);
                            for step in PROGRESS_STEPS {
                                push.push(rpc::notification(
                                    notifications::PROGRESS,
                                    json!({
                                        "progressToken": token,
                                        "progress": step,
                                        "total": 100,
                                    }),
                                ));
                            }
                            Ok(Some(rpc::response(id, text_content("progress complete"))))
                        }
                        other => Ok(Some(rpc::error_response(
                            id,
                            error_codes::INVALID_PARAMS,
                            &format!("unknown tool: {other}"),
                        ))),
                    }
                }

                Some(_) if rpc::is_notification(&request) => Ok(None),

                Some(method) => Ok(Some(rpc::error_response(
                    id,
                    error_codes::METHOD_NOT_FOUND,
                    &format!("method not found: {method}"),
                ))),

                None => Ok(Some(rpc::error_response(
                    id,
                    error_codes::INVALID_PARAMS,
                    "request has no method",
                ))),
            }
        })
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}
