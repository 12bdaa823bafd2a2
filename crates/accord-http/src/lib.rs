//! accord-http: session registry and streamable HTTP transport adapter.
//!
//! This crate implements the stateful three-operation transport the
//! harness hosts scenarios on:
//!
//! - `POST` carries the protocol body: a header-less `initialize` creates
//!   a session, anything else continues an existing one.
//! - `GET` opens the session's server-push stream (SSE).
//! - `DELETE` terminates the session.
//!
//! One [`SessionRegistry`] per scenario run owns all session state; the
//! axum router built by [`router`] is the only way in. Two runs never
//! share a registry.

#![forbid(unsafe_code)]

pub mod server;
pub mod session;

pub use server::{RPC_PATH, TransportState, router, serve};
pub use session::{Session, SessionRegistry, StreamLease};
