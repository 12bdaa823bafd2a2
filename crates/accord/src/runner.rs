//! Batch execution and report output.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use accord_core::check::now_rfc3339;
use accord_core::{Check, CheckLedger, CheckStatus};
use accord_scenarios::ClientScenario;

/// Pass/fail tally over a finalized check list.
///
/// Only SUCCESS and FAILURE count toward the denominator; WARNING, SKIPPED
/// and INFO are advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
}

impl Summary {
    pub fn scored(&self) -> usize {
        self.passed + self.failed
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub fn summarize(checks: &[Check]) -> Summary {
    let passed = checks
        .iter()
        .filter(|c| c.status == CheckStatus::Success)
        .count();
    let failed = checks
        .iter()
        .filter(|c| c.status == CheckStatus::Failure)
        .count();
    Summary { passed, failed }
}

/// Run one probe-role scenario and return its finalized check list.
///
/// The scenario contract says `run` never panics past its boundary; if an
/// implementation breaks that promise anyway, the panic is contained here
/// and becomes a single FAILURE check, so a batch keeps going. The
/// observed checks are then reconciled against the scenario's declared
/// expectation set.
pub async fn run_client_scenario(
    scenario: Arc<dyn ClientScenario>,
    server_url: &str,
) -> Vec<Check> {
    let name = scenario.name();
    let expected = scenario.expected_checks();
    let url = server_url.to_string();
    let task = tokio::spawn(async move { scenario.run(&url).await });

    let observed = match task.await {
        Ok(checks) => checks,
        Err(e) => {
            tracing::error!(scenario = name, error = %e, "scenario aborted");
            vec![Check::failure(
                format!("{name}-run"),
                "ScenarioRun",
                "Scenario completes without an internal fault",
                format!("scenario aborted: {e}"),
            )]
        }
    };

    let mut ledger = CheckLedger::new();
    for check in observed {
        ledger.append(check);
    }
    ledger.finalized(expected)
}

/// Write the finalized ledger to a fresh per-run directory.
///
/// The directory is named `<role>-<scenario>-<timestamp>` with `:` and `.`
/// replaced by `-`, which keeps names collision-free and lexically
/// sortable. Returns the created directory.
pub fn write_artifact(
    results_root: &Path,
    role: &str,
    scenario: &str,
    checks: &[Check],
) -> io::Result<PathBuf> {
    let timestamp = now_rfc3339().replace([':', '.'], "-");
    let dir = results_root.join(format!("{role}-{scenario}-{timestamp}"));
    std::fs::create_dir_all(&dir)?;

    let json = serde_json::to_vec_pretty(checks).map_err(io::Error::other)?;
    std::fs::write(dir.join("checks.json"), json)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;

    #[test]
    fn summary_counts_only_scored_statuses() {
        let checks = vec![
            Check::success("a", "A", "d"),
            Check::failure("b", "B", "d", "boom"),
            Check::new("c", "C", "d", CheckStatus::Skipped),
            Check::new("d", "D", "d", CheckStatus::Info),
        ];
        let summary = summarize(&checks);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.scored(), 2);
        assert!(!summary.all_passed());
    }

    #[test]
    fn artifact_directory_is_filesystem_safe() {
        let root = tempfile::tempdir().unwrap();
        let checks = vec![Check::success("a", "A", "d")];
        let dir = write_artifact(root.path(), "client", "tools-list", &checks).unwrap();

        let name = dir.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("client-tools-list-"));
        assert!(!name.contains(':'));
        assert!(!name.contains('.'));

        let written: Vec<Check> =
            serde_json::from_slice(&std::fs::read(dir.join("checks.json")).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].id, "a");
    }

    struct PanickingScenario;

    impl ClientScenario for PanickingScenario {
        fn name(&self) -> &'static str {
            "panics"
        }

        fn description(&self) -> &'static str {
            "misbehaving scenario used to test batch isolation"
        }

        fn expected_checks(&self) -> &'static [&'static str] {
            &["never-produced"]
        }

        fn run<'a>(&'a self, _server_url: &'a str) -> BoxFuture<'a, Vec<Check>> {
            Box::pin(async { panic!("scenario bug") })
        }
    }

    #[tokio::test]
    async fn a_panicking_scenario_becomes_one_failure_plus_reconciliation() {
        let checks = run_client_scenario(Arc::new(PanickingScenario), "http://unused").await;
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].id, "panics-run");
        assert_eq!(checks[0].status, CheckStatus::Failure);
        assert_eq!(checks[1].id, "never-produced");
        assert_eq!(checks[1].status, CheckStatus::Failure);
    }
}
