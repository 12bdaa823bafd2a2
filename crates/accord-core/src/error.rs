//! Error taxonomy for the scenario engine.
//!
//! Probe-level failures are deliberately absent here: an observed protocol
//! response that fails an expected property becomes a FAILURE [`Check`],
//! never an error value.
//!
//! [`Check`]: crate::check::Check

use core::fmt;

/// A session id was missing or is not present in the registry.
///
/// Surfaced as an HTTP 4xx at the transport boundary; never propagates
/// past the transport adapter as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session header was supplied where one is required.
    Missing,
    /// A session header was supplied but no live session has that id.
    Unknown(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing session id"),
            Self::Unknown(id) => write!(f, "unknown session id: {id}"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Resource allocation failure while starting a scenario.
///
/// Propagates from `start()`; `stop()` must remain safe to call after it.
#[derive(Debug)]
pub enum StartError {
    /// Binding the ephemeral listener failed.
    Bind(std::io::Error),
    /// The bound listener has no resolvable local address.
    LocalAddr(std::io::Error),
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(e) => write!(f, "failed to bind listener: {e}"),
            Self::LocalAddr(e) => write!(f, "failed to resolve local address: {e}"),
        }
    }
}

impl std::error::Error for StartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind(e) | Self::LocalAddr(e) => Some(e),
        }
    }
}

/// Internal fault inside a protocol engine.
///
/// Surfaced as an HTTP 500 at the boundary; terminates only the offending
/// request, never the run.
#[derive(Debug, Clone)]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine error: {}", self.message)
    }
}

impl std::error::Error for EngineError {}

impl From<String> for EngineError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for EngineError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
