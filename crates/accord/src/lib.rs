//! accord: conformance harness for a JSON-RPC protocol over stateful
//! streamable HTTP.
//!
//! The harness runs in two symmetric roles:
//!
//! - **host**: serve a scenario endpoint and score what an external client
//!   does with it (`accord serve --scenario <name>`)
//! - **probe**: drive an external server endpoint with scripted client
//!   scenarios (`accord probe --server-url <url>`)
//!
//! Either way the output is a finalized check ledger: one check per
//! declared expectation, with untriggered paths scored as FAILURE rather
//! than silently omitted.
//!
//! This crate re-exports the public surface of the workspace members and
//! hosts the `accord` binary.

#![forbid(unsafe_code)]

pub mod runner;

pub use accord_core::{
    Check, CheckLedger, CheckStatus, EngineError, EngineFactory, EngineFuture, ProtocolEngine,
    PushHandle, SessionError, SpecRef, StartError, rpc,
};
pub use accord_http::{RPC_PATH, SessionRegistry, TransportState, router, serve};
pub use accord_probe::{
    DEFAULT_QUIESCENCE_WINDOW, NotificationCollector, NotificationKind, Probe, ProbeError,
};
pub use accord_scenarios::{
    ClientScenario, ReferenceEngine, Scenario, ScenarioRegistry, ScenarioUrls, ServerHarness,
};
pub use runner::{Summary, run_client_scenario, summarize, write_artifact};
