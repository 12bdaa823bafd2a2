//! End-to-end scenario tests: the harness probes its own reference server.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};

use accord_core::rpc::{self, PROTOCOL_VERSION, notifications};
use accord_core::{
    Check, CheckLedger, CheckStatus, EngineFactory, EngineFuture, ProtocolEngine, PushHandle,
};
use accord_probe::Probe;
use accord_scenarios::scenarios::{
    ServerInitializeScenario, SessionLifecycleScenario, ToolsCallLoggingScenario,
    ToolsCallProgressScenario, ToolsListScenario,
};
use accord_scenarios::{ClientScenario, Scenario, ServerHarness};

fn find<'a>(checks: &'a [Check], id: &str) -> &'a Check {
    checks
        .iter()
        .find(|c| c.id == id)
        .unwrap_or_else(|| panic!("no check with id {id}"))
}

#[tokio::test]
async fn client_scenarios_pass_against_reference_server() {
    let scenario = SessionLifecycleScenario::new();
    let urls = scenario.start().await.unwrap();

    let initialize = ServerInitializeScenario.run(&urls.server_url).await;
    assert!(
        find(&initialize, "server-initialize").passed(),
        "{:?}",
        initialize[0].error_message
    );

    let tools = ToolsListScenario.run(&urls.server_url).await;
    assert!(find(&tools, "tools-list").passed(), "{:?}", tools[0].error_message);

    let logging = ToolsCallLoggingScenario.run(&urls.server_url).await;
    assert!(
        find(&logging, "tools-call-with-logging").passed(),
        "{:?}",
        logging[0].error_message
    );

    let progress = ToolsCallProgressScenario.run(&urls.server_url).await;
    let progress_check = find(&progress, "tools-call-with-progress");
    assert!(progress_check.passed(), "{:?}", progress_check.error_message);
    assert_eq!(
        progress_check.details.as_ref().unwrap()["progressValues"],
        json!([10.0, 50.0, 100.0])
    );

    // Drive the one remaining expectation and collect the verdict.
    let probe = Probe::connect(&urls.server_url).await.unwrap();
    probe
        .request("tools/call", json!({ "name": "test_simple_text", "arguments": {} }))
        .await
        .unwrap();
    probe.terminate().await.unwrap();

    scenario.stop().await;

    let checks = scenario.checks();
    assert!(find(&checks, "initialize-received").passed());
    assert!(find(&checks, "tools-listed").passed());
    assert!(find(&checks, "tool-invoked").passed());
}

#[tokio::test]
async fn untriggered_paths_are_scored_as_failures_in_declared_order() {
    let scenario = SessionLifecycleScenario::new();
    let urls = scenario.start().await.unwrap();

    // The client only initializes, then walks away.
    let probe = Probe::connect(&urls.server_url).await.unwrap();
    drop(probe);

    scenario.stop().await;

    let checks = scenario.checks();
    assert!(find(&checks, "initialize-received").passed());
    assert_eq!(find(&checks, "incoming-request").status, CheckStatus::Info);
    assert_eq!(find(&checks, "tools-listed").status, CheckStatus::Failure);
    assert_eq!(find(&checks, "tool-invoked").status, CheckStatus::Failure);

    // Synthesized entries trail the observed ones, in declared order.
    let ids: Vec<&str> = checks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "incoming-request",
            "initialize-received",
            "tools-listed",
            "tool-invoked"
        ]
    );
}

#[tokio::test]
async fn stop_is_idempotent_and_safe_without_start() {
    let never_started = SessionLifecycleScenario::new();
    never_started.stop().await;
    never_started.stop().await;

    let scenario = SessionLifecycleScenario::new();
    let urls = scenario.start().await.unwrap();
    let _probe = Probe::connect(&urls.server_url).await.unwrap();
    assert_eq!(scenario.harness().live_sessions(), 1);

    scenario.stop().await;
    assert_eq!(scenario.harness().live_sessions(), 0);
    scenario.stop().await;
    assert_eq!(scenario.harness().live_sessions(), 0);

    // The port is released: the endpoint no longer answers.
    let err = reqwest::Client::new()
        .post(&urls.server_url)
        .json(&rpc::request(1, "initialize", json!({})))
        .send()
        .await;
    assert!(err.is_err());
}

#[tokio::test]
async fn checks_without_any_observation_are_all_failure() {
    let scenario = SessionLifecycleScenario::new();
    let checks = scenario.checks();
    assert_eq!(checks.len(), 3);
    assert!(checks.iter().all(|c| c.status == CheckStatus::Failure));
}

#[tokio::test]
async fn concurrent_runs_share_no_state() {
    let a = SessionLifecycleScenario::new();
    let b = SessionLifecycleScenario::new();
    let (urls_a, urls_b) = tokio::join!(a.start(), b.start());
    let urls_a = urls_a.unwrap();
    let urls_b = urls_b.unwrap();
    assert_ne!(urls_a.server_url, urls_b.server_url);

    // Only run A gets a client.
    let probe = Probe::connect(&urls_a.server_url).await.unwrap();
    probe.request("tools/list", json!({})).await.unwrap();
    probe.terminate().await.unwrap();

    a.stop().await;
    b.stop().await;

    assert!(find(&a.checks(), "tools-listed").passed());
    assert_eq!(find(&b.checks(), "tools-listed").status, CheckStatus::Failure);
}

/// Engine whose progress tool pushes a caller-chosen value sequence.
struct ScriptedProgressEngine {
    push: Mutex<Option<PushHandle>>,
    values: Vec<u64>,
}

impl ProtocolEngine for ScriptedProgressEngine {
    fn bind(&self, push: PushHandle) {
        *self.push.lock() = Some(push);
    }

    fn handle(&self, request: Value) -> EngineFuture {
        let push = self.push.lock().clone();
        let values = self.values.clone();
        Box::pin(async move {
            let id = request.get("id").cloned().unwrap_or(Value::Null);
            match rpc::method(&request) {
                Some("initialize") => Ok(Some(rpc::response(
                    id,
                    json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {},
                        "serverInfo": { "name": "scripted", "version": "0" },
                    }),
                ))),
                Some("tools/call") => {
                    if let Some(push) = push {
                        for value in values {
                            push.push(rpc::notification(
                                notifications::PROGRESS,
                                json!({ "progressToken": "t", "progress": value, "total": 100 }),
                            ));
                        }
                    }
                    Ok(Some(rpc::response(id, json!({ "content": [] }))))
                }
                _ => Ok(None),
            }
        })
    }

    fn dispose(&self) {}
}

fn scripted_factory(values: Vec<u64>) -> Arc<dyn EngineFactory> {
    Arc::new(move || -> Arc<dyn ProtocolEngine> {
        Arc::new(ScriptedProgressEngine {
            push: Mutex::new(None),
            values: values.clone(),
        })
    })
}

async fn run_progress_probe(values: Vec<u64>) -> Check {
    let harness = ServerHarness::new(
        &[],
        Arc::new(Mutex::new(CheckLedger::new())),
        scripted_factory(values),
    );
    let urls = harness.start().await.unwrap();
    let mut checks = ToolsCallProgressScenario.run(&urls.server_url).await;
    harness.stop().await;
    checks.remove(0)
}

#[tokio::test]
async fn decreasing_progress_values_fail_the_ordering_rule() {
    let check = run_progress_probe(vec![50, 10, 100]).await;
    assert_eq!(check.status, CheckStatus::Failure);
    assert!(check.error_message.unwrap().contains("non-decreasing"));
}

#[tokio::test]
async fn too_few_progress_notifications_report_the_count_deficit() {
    let check = run_progress_probe(vec![10, 50]).await;
    assert_eq!(check.status, CheckStatus::Failure);
    let message = check.error_message.unwrap();
    assert!(message.contains("got 2"), "unexpected message: {message}");
    // The ordering rule is not evaluated on an insufficient sample.
    assert!(!message.contains("non-decreasing"));
}

#[tokio::test]
async fn no_progress_notifications_report_that_specifically() {
    let check = run_progress_probe(Vec::new()).await;
    assert_eq!(check.status, CheckStatus::Failure);
    assert!(check.error_message.unwrap().contains("no progress notifications"));
}
