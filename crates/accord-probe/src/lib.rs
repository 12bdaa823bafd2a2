//! accord-probe: the client-role driver.
//!
//! A [`Probe`] performs the handshake against a remote endpoint, issues
//! operations over the stateful HTTP transport, and collects server-push
//! notifications through a bounded quiescence window. Scenario code turns
//! what the probe observes into checks; the probe itself never panics past
//! its boundary and never retries a failed operation.

#![forbid(unsafe_code)]

pub mod collector;
pub mod probe;
pub mod sse;

pub use collector::{DEFAULT_QUIESCENCE_WINDOW, NotificationCollector, NotificationKind};
pub use probe::{Probe, ProbeError, parse_response_body};
