//! Probe scenarios for the tool surface: inventory, logging pushes,
//! progress pushes.

use futures::future::BoxFuture;
use serde_json::{Value, json};

use accord_core::{Check, SpecRef};
use accord_probe::{DEFAULT_QUIESCENCE_WINDOW, NotificationKind, Probe};

use crate::scenario::ClientScenario;

/// Minimum number of pushed notifications the logging and progress tools
/// are expected to produce.
const MIN_NOTIFICATIONS: usize = 3;

/// Lists tools and validates each entry's structure.
pub struct ToolsListScenario;

impl ClientScenario for ToolsListScenario {
    fn name(&self) -> &'static str {
        "tools-list"
    }

    fn description(&self) -> &'static str {
        "Validates the server's tool inventory structure"
    }

    fn expected_checks(&self) -> &'static [&'static str] {
        &["tools-list"]
    }

    fn run<'a>(&'a self, server_url: &'a str) -> BoxFuture<'a, Vec<Check>> {
        Box::pin(async move {
            let check = match list_tools(server_url).await {
                Ok(check) => check,
                Err(message) => Check::failure(
                    "tools-list",
                    "ToolsList",
                    "Server lists available tools with valid structure",
                    message,
                ),
            }
            .with_spec_ref(SpecRef::id_only("server/tools#list"));
            vec![check]
        })
    }
}

async fn list_tools(server_url: &str) -> Result<Check, String> {
    let probe = Probe::connect(server_url)
        .await
        .map_err(|e| format!("failed to connect: {e}"))?;
    let result = probe
        .request("tools/list", json!({}))
        .await
        .map_err(|e| format!("tools/list failed: {e}"))?;
    let _ = probe.terminate().await;

    let mut errors = Vec::new();
    match result.get("tools").and_then(Value::as_array) {
        None => errors.push("missing tools array".to_string()),
        Some(tools) => {
            for (index, tool) in tools.iter().enumerate() {
                if tool.get("name").and_then(Value::as_str).is_none() {
                    errors.push(format!("tool {index}: missing name"));
                }
                if tool.get("description").and_then(Value::as_str).is_none() {
                    errors.push(format!("tool {index}: missing description"));
                }
                if tool.get("inputSchema").is_none() {
                    errors.push(format!("tool {index}: missing inputSchema"));
                }
            }
        }
    }

    let names: Vec<Value> = result
        .get("tools")
        .and_then(Value::as_array)
        .map(|tools| tools.iter().filter_map(|t| t.get("name").cloned()).collect())
        .unwrap_or_default();

    Ok(Check::from_errors(
        "tools-list",
        "ToolsList",
        "Server lists available tools with valid structure",
        errors,
    )
    .with_details(json!({ "toolCount": names.len(), "tools": names })))
}

/// Calls the logging tool and expects at least three pushed log lines
/// within the quiescence window.
pub struct ToolsCallLoggingScenario;

impl ClientScenario for ToolsCallLoggingScenario {
    fn name(&self) -> &'static str {
        "tools-call-with-logging"
    }

    fn description(&self) -> &'static str {
        "Tool sends log notifications during execution"
    }

    fn expected_checks(&self) -> &'static [&'static str] {
        &["tools-call-with-logging"]
    }

    fn run<'a>(&'a self, server_url: &'a str) -> BoxFuture<'a, Vec<Check>> {
        Box::pin(async move {
            let check = match collect_logs(server_url).await {
                Ok(check) => check,
                Err(message) => Check::failure(
                    "tools-call-with-logging",
                    "ToolsCallWithLogging",
                    "Tool sends log messages during execution",
                    message,
                ),
            }
            .with_spec_ref(SpecRef::id_only("utilities/logging"));
            vec![check]
        })
    }
}

async fn collect_logs(server_url: &str) -> Result<Check, String> {
    let probe = Probe::connect(server_url)
        .await
        .map_err(|e| format!("failed to connect: {e}"))?;
    // The stream must be open before the triggering call, or the pushes
    // have nowhere to go.
    let collector = probe
        .open_stream()
        .await
        .map_err(|e| format!("failed to open push stream: {e}"))?;

    probe
        .request(
            "tools/call",
            json!({ "name": "test_with_logging", "arguments": {} }),
        )
        .await
        .map_err(|e| format!("tools/call failed: {e}"))?;

    let seen = collector
        .wait_for(NotificationKind::Log, MIN_NOTIFICATIONS, DEFAULT_QUIESCENCE_WINDOW)
        .await;
    let _ = probe.terminate().await;

    let mut errors = Vec::new();
    if seen == 0 {
        errors.push("no log notifications received".to_string());
    } else if seen < MIN_NOTIFICATIONS {
        errors.push(format!(
            "expected at least {MIN_NOTIFICATIONS} log messages, got {seen}"
        ));
    }

    Ok(Check::from_errors(
        "tools-call-with-logging",
        "ToolsCallWithLogging",
        "Tool sends log messages during execution",
        errors,
    )
    .with_details(json!({ "logCount": seen, "logs": collector.logs() })))
}

/// Calls the progress tool and validates count and ordering of pushed
/// progress values.
pub struct ToolsCallProgressScenario;

impl ClientScenario for ToolsCallProgressScenario {
    fn name(&self) -> &'static str {
        "tools-call-with-progress"
    }

    fn description(&self) -> &'static str {
        "Tool reports progress notifications with non-decreasing values"
    }

    fn expected_checks(&self) -> &'static [&'static str] {
        &["tools-call-with-progress"]
    }

    fn run<'a>(&'a self, server_url: &'a str) -> BoxFuture<'a, Vec<Check>> {
        Box::pin(async move {
            let check = match collect_progress(server_url).await {
                Ok(check) => check,
                Err(message) => Check::failure(
                    "tools-call-with-progress",
                    "ToolsCallWithProgress",
                    "Tool reports progress notifications",
                    message,
                ),
            }
            .with_spec_ref(SpecRef::id_only("utilities/progress"));
            vec![check]
        })
    }
}

async fn collect_progress(server_url: &str) -> Result<Check, String> {
    let probe = Probe::connect(server_url)
        .await
        .map_err(|e| format!("failed to connect: {e}"))?;
    let collector = probe
        .open_stream()
        .await
        .map_err(|e| format!("failed to open push stream: {e}"))?;

    probe
        .request(
            "tools/call",
            json!({
                "name": "test_with_progress",
                "arguments": {},
                "_meta": { "progressToken": "probe-progress-1" },
            }),
        )
        .await
        .map_err(|e| format!("tools/call failed: {e}"))?;

    let seen = collector
        .wait_for(
            NotificationKind::Progress,
            MIN_NOTIFICATIONS,
            DEFAULT_QUIESCENCE_WINDOW,
        )
        .await;
    let _ = probe.terminate().await;

    let values = collector.progress_values();
    let mut errors = Vec::new();
    if seen == 0 {
        errors.push("no progress notifications received".to_string());
    } else if seen < MIN_NOTIFICATIONS {
        errors.push(format!(
            "expected at least {MIN_NOTIFICATIONS} progress notifications, got {seen}"
        ));
    } else {
        // The ordering rule is only meaningful once enough values arrived;
        // an insufficient count is reported as exactly that, above.
        if values.windows(2).any(|pair| pair[0] > pair[1]) {
            errors.push(format!("progress values must be non-decreasing, got {values:?}"));
        }
    }

    Ok(Check::from_errors(
        "tools-call-with-progress",
        "ToolsCallWithProgress",
        "Tool reports progress notifications",
        errors,
    )
    .with_details(json!({ "progressCount": seen, "progressValues": values })))
}
