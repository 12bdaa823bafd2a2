//! accord-scenarios: scenario contracts and built-in scenarios.
//!
//! A scenario is a named, self-contained test unit. Two roles exist:
//!
//! - [`Scenario`] (host role): owns a server endpoint through a
//!   [`ServerHarness`]; checks accumulate while an external client drives
//!   it, and [`Scenario::checks`] reconciles them against the declared
//!   expectation set.
//! - [`ClientScenario`] (probe role): drives an external endpoint through
//!   [`accord_probe::Probe`] and returns its checks directly.
//!
//! The [`ScenarioRegistry`] maps names to factories; it is built once at
//! process start and passed by reference, never global.

#![forbid(unsafe_code)]

pub mod harness;
pub mod reference;
pub mod registry;
pub mod scenario;
pub mod scenarios;

pub use harness::ServerHarness;
pub use reference::ReferenceEngine;
pub use registry::ScenarioRegistry;
pub use scenario::{ClientScenario, Scenario, ScenarioUrls};
