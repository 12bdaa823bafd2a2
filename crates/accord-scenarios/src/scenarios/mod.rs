//! Built-in scenarios.
//!
//! Probe role: [`ServerInitializeScenario`], [`ToolsListScenario`],
//! [`ToolsCallLoggingScenario`], [`ToolsCallProgressScenario`].
//! Host role: [`SessionLifecycleScenario`].

pub mod initialize;
pub mod lifecycle;
pub mod tools;

pub use initialize::ServerInitializeScenario;
pub use lifecycle::SessionLifecycleScenario;
pub use tools::{ToolsCallLoggingScenario, ToolsCallProgressScenario, ToolsListScenario};
