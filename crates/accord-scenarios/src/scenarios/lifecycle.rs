//! Host scenario: serve the reference engine and score what an external
//! client actually does with it.

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use accord_core::{Check, CheckLedger, StartError};

use crate::harness::ServerHarness;
use crate::reference::ReferenceEngine;
use crate::scenario::{Scenario, ScenarioUrls};

/// Declared output contract, in report order.
const EXPECTED: &[&str] = &["initialize-received", "tools-listed", "tool-invoked"];

/// Hosts a reference server and expects the client to initialize, list
/// tools and call `test_simple_text`. Whatever the client skips shows up
/// as a synthesized FAILURE at reconciliation.
pub struct SessionLifecycleScenario {
    harness: ServerHarness,
}

impl SessionLifecycleScenario {
    pub fn new() -> Self {
        let ledger = Arc::new(Mutex::new(CheckLedger::new()));
        let factory = ReferenceEngine::factory_with_ledger(ledger.clone());
        Self {
            harness: ServerHarness::new(EXPECTED, ledger, factory),
        }
    }

    pub fn harness(&self) -> &ServerHarness {
        &self.harness
    }
}

impl Default for SessionLifecycleScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario for SessionLifecycleScenario {
    fn name(&self) -> &'static str {
        "session-lifecycle"
    }

    fn description(&self) -> &'static str {
        "Hosts a reference server; the client must initialize, list tools and call one"
    }

    fn expected_checks(&self) -> &'static [&'static str] {
        EXPECTED
    }

    fn start(&self) -> BoxFuture<'_, Result<ScenarioUrls, StartError>> {
        Box::pin(self.harness.start())
    }

    fn stop(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.harness.stop())
    }

    fn checks(&self) -> Vec<Check> {
        self.harness.checks()
    }
}
