//! Explicit scenario registry.
//!
//! Built once at process start and passed by reference into the runner.
//! Host-role scenarios are registered as factories because each run needs
//! a fresh ledger and registry; probe-role scenarios are stateless and
//! registered as shared instances.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::scenario::{ClientScenario, Scenario};
use crate::scenarios::{
    ServerInitializeScenario, SessionLifecycleScenario, ToolsCallLoggingScenario,
    ToolsCallProgressScenario, ToolsListScenario,
};

type ServerBuild = Box<dyn Fn() -> Arc<dyn Scenario> + Send + Sync>;

struct ServerEntry {
    description: &'static str,
    build: ServerBuild,
}

#[derive(Default)]
pub struct ScenarioRegistry {
    server: BTreeMap<&'static str, ServerEntry>,
    client: BTreeMap<&'static str, Arc<dyn ClientScenario>>,
}

impl ScenarioRegistry {
    /// An empty registry, for tests and embedders.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with every built-in scenario.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_server(
            "session-lifecycle",
            "Hosts a reference server; the client must initialize, list tools and call one",
            || Arc::new(SessionLifecycleScenario::new()),
        );
        registry.register_client(Arc::new(ServerInitializeScenario));
        registry.register_client(Arc::new(ToolsListScenario));
        registry.register_client(Arc::new(ToolsCallLoggingScenario));
        registry.register_client(Arc::new(ToolsCallProgressScenario));
        registry
    }

    pub fn register_server(
        &mut self,
        name: &'static str,
        description: &'static str,
        build: impl Fn() -> Arc<dyn Scenario> + Send + Sync + 'static,
    ) {
        self.server.insert(
            name,
            ServerEntry {
                description,
                build: Box::new(build),
            },
        );
    }

    pub fn register_client(&mut self, scenario: Arc<dyn ClientScenario>) {
        self.client.insert(scenario.name(), scenario);
    }

    /// Instantiate a fresh run of a host-role scenario.
    pub fn server(&self, name: &str) -> Option<Arc<dyn Scenario>> {
        self.server.get(name).map(|entry| (entry.build)())
    }

    pub fn client(&self, name: &str) -> Option<Arc<dyn ClientScenario>> {
        self.client.get(name).cloned()
    }

    /// `(name, description)` pairs of host-role scenarios, sorted by name.
    pub fn server_scenarios(&self) -> Vec<(&'static str, &'static str)> {
        self.server
            .iter()
            .map(|(name, entry)| (*name, entry.description))
            .collect()
    }

    /// `(name, description)` pairs of probe-role scenarios, sorted by name.
    pub fn client_scenarios(&self) -> Vec<(&'static str, &'static str)> {
        self.client
            .iter()
            .map(|(name, scenario)| (*name, scenario.description()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_resolves_every_listed_name() {
        let registry = ScenarioRegistry::builtin();
        for (name, _) in registry.server_scenarios() {
            assert!(registry.server(name).is_some());
        }
        for (name, _) in registry.client_scenarios() {
            assert!(registry.client(name).is_some());
        }
        assert!(registry.server("nope").is_none());
        assert!(registry.client("nope").is_none());
    }

    #[test]
    fn server_lookup_builds_fresh_instances() {
        let registry = ScenarioRegistry::builtin();
        let a = registry.server("session-lifecycle").unwrap();
        let b = registry.server("session-lifecycle").unwrap();
        // Independent runs: appending to one ledger must not leak into the
        // other.
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
