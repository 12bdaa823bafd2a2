//! The two scenario contracts.

use futures::future::BoxFuture;

use accord_core::{Check, StartError};

/// Externally reachable endpoint(s) of a started host-role scenario.
#[derive(Debug, Clone)]
pub struct ScenarioUrls {
    pub server_url: String,
}

/// A host-role scenario: the harness serves the endpoint, an external
/// client drives it.
///
/// `stop` must be idempotent and safe to call even when `start` was never
/// called or failed midway. `checks` never panics; with no observations it
/// returns the reconciled all-FAILURE set.
pub trait Scenario: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// The scenario's complete output contract, in report order.
    fn expected_checks(&self) -> &'static [&'static str];

    /// Allocate the endpoint and begin serving. Returns the reachable URL.
    fn start(&self) -> BoxFuture<'_, Result<ScenarioUrls, StartError>>;

    /// Release every resource: sessions, listener, port.
    fn stop(&self) -> BoxFuture<'_, ()>;

    /// The finalized check ledger (observed plus synthesized failures).
    fn checks(&self) -> Vec<Check>;
}

/// A probe-role scenario: drives an external endpoint and reports checks.
///
/// `run` never panics past its boundary; a total failure yields exactly
/// one FAILURE check carrying the causal error message.
pub trait ClientScenario: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// The scenario's complete output contract, in report order.
    fn expected_checks(&self) -> &'static [&'static str];

    fn run<'a>(&'a self, server_url: &'a str) -> BoxFuture<'a, Vec<Check>>;
}
