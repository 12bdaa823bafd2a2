//! accord-core: shared types for the accord conformance harness.
//!
//! This crate holds everything the server harness and the client probe have
//! in common:
//!
//! - [`Check`] and [`CheckLedger`] - the observation record and the
//!   append-only store that reconciles observations against a declared
//!   expectation set.
//! - [`ProtocolEngine`] and [`EngineFactory`] - the collaborator contract
//!   for the message-level protocol implementation bound to each session.
//! - [`rpc`] - JSON-RPC envelope helpers and wire constants.
//! - Error types for the session and lifecycle layers.
//!
//! The transport adapter ([`accord-http`]), the probe driver
//! ([`accord-probe`]) and the scenario layer all build on these types; none
//! of them re-defines a check or an engine seam of its own.

#![forbid(unsafe_code)]

pub mod check;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod rpc;

pub use check::{Check, CheckStatus, SpecRef};
pub use engine::{EngineFactory, EngineFuture, ProtocolEngine, PushHandle};
pub use error::{EngineError, SessionError, StartError};
pub use ledger::CheckLedger;
