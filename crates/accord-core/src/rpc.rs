//! JSON-RPC envelope helpers and wire constants.
//!
//! The protocol under test speaks JSON-RPC 2.0 over a stateful HTTP
//! transport. Session binding is carried in the [`SESSION_HEADER`] on every
//! request; the server mints the id on `initialize` and echoes it back in
//! the same header.

use serde_json::{Value, json};

/// JSON-RPC protocol marker.
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision the harness validates against.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Header carrying the opaque session id on every request.
pub const SESSION_HEADER: &str = "x-session-id";

/// Method names for server-push notifications, classified by kind.
pub mod notifications {
    /// `{level, message}` log line pushed during an operation.
    pub const LOG: &str = "notifications/log";
    /// `{progressToken, progress, total}` progress update.
    pub const PROGRESS: &str = "notifications/progress";
    /// Client-to-server acknowledgement after a successful handshake.
    pub const INITIALIZED: &str = "notifications/initialized";
}

/// JSON-RPC error codes used at the transport boundary.
pub mod error_codes {
    /// Session id missing or unknown.
    pub const INVALID_SESSION: i64 = -32000;
    /// Method not recognized by the engine.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal server error.
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Build a request envelope.
pub fn request(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Build a notification envelope (no id, no response expected).
pub fn notification(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
        "params": params,
    })
}

/// Build a success response for the given request id.
pub fn response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    })
}

/// Build an error response. `id` is `null` when the request id is unknown.
pub fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "error": { "code": code, "message": message },
        "id": id,
    })
}

/// Method name of a request or notification body, if present.
pub fn method(body: &Value) -> Option<&str> {
    body.get("method").and_then(Value::as_str)
}

/// Whether a body is an `initialize` request.
///
/// Only a header-less `initialize` may create a session; everything else
/// requires an existing one.
pub fn is_initialize(body: &Value) -> bool {
    method(body) == Some("initialize")
}

/// Whether a body is a notification (carries no id).
pub fn is_notification(body: &Value) -> bool {
    method(body).is_some() && body.get("id").is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_initialize() {
        let body = request(1, "initialize", json!({"protocolVersion": PROTOCOL_VERSION}));
        assert!(is_initialize(&body));
        assert!(!is_notification(&body));
        assert!(!is_initialize(&request(2, "tools/list", json!({}))));
    }

    #[test]
    fn notifications_have_no_id() {
        let note = notification(notifications::INITIALIZED, json!({}));
        assert!(is_notification(&note));
        assert_eq!(method(&note), Some("notifications/initialized"));
    }

    #[test]
    fn error_response_shape() {
        let body = error_response(Value::Null, error_codes::INVALID_SESSION, "Invalid or missing session ID");
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["error"]["code"], -32000);
        assert!(body["id"].is_null());
    }
}
