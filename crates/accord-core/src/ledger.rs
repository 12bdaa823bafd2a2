//! Append-only check ledger with expectation reconciliation.

use std::collections::HashSet;

use crate::check::{Check, CheckStatus};

/// Standard description for a check that was declared but never observed.
const UNPRODUCED_DESCRIPTION: &str =
    "expected check not produced — likely untriggered code path";

/// Ordered, append-only store of [`Check`]s for one scenario run.
///
/// Two rules make a finalized ledger a complete, trustworthy report:
///
/// 1. **First append wins.** A second check with an id already present is
///    rejected, so a retried or duplicated observation can never overwrite
///    an earlier authoritative result.
/// 2. **Reconciliation.** [`CheckLedger::finalized`] synthesizes a FAILURE
///    for every declared-but-unobserved id, so a crash, an uncalled tool or
///    a skipped step is scored as failure rather than silently missing from
///    the report.
#[derive(Debug, Default)]
pub struct CheckLedger {
    checks: Vec<Check>,
    ids: HashSet<String>,
}

impl CheckLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a check. Returns `false` (and discards the check) when a
    /// check with the same id was appended earlier.
    ///
    /// Timestamps are clamped monotone in append order.
    pub fn append(&mut self, mut check: Check) -> bool {
        if self.ids.contains(&check.id) {
            tracing::debug!(id = %check.id, "duplicate check id, first append wins");
            return false;
        }
        if let Some(last) = self.checks.last() {
            if check.timestamp < last.timestamp {
                check.timestamp = last.timestamp.clone();
            }
        }
        self.ids.insert(check.id.clone());
        self.checks.push(check);
        true
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// The observed checks, in append order.
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Reconcile against the declared expectation set.
    ///
    /// Returns the observed checks followed by one synthesized FAILURE per
    /// id in `expected` that was never observed, in the declared order. The
    /// relative order of synthesized entries is part of the report contract;
    /// consumers may index by position.
    pub fn finalized(&self, expected: &[&str]) -> Vec<Check> {
        let mut out = self.checks.clone();
        for id in expected {
            if !self.ids.contains(*id) {
                out.push(Check::new(
                    *id,
                    unproduced_name(id),
                    UNPRODUCED_DESCRIPTION,
                    CheckStatus::Failure,
                ));
            }
        }
        out
    }
}

/// Display name for a synthesized check, derived from its slug.
fn unproduced_name(id: &str) -> String {
    id.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(id: &str) -> Check {
        Check::success(id, id.to_uppercase(), format!("check {id}"))
    }

    #[test]
    fn first_append_wins() {
        let mut ledger = CheckLedger::new();
        assert!(ledger.append(check("a")));
        let mut dup = Check::failure("a", "A", "later duplicate", "should be discarded");
        dup.description = "changed".into();
        assert!(!ledger.append(dup));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.checks()[0].status, CheckStatus::Success);
    }

    #[test]
    fn reconciliation_is_complete() {
        let mut ledger = CheckLedger::new();
        ledger.append(check("observed-1"));
        ledger.append(check("observed-2"));

        let expected = ["observed-1", "missing-1", "missing-2"];
        let finalized = ledger.finalized(&expected);

        // One check per id in the union of expected and observed.
        assert_eq!(finalized.len(), 4);
        // Observed entries come first, in append order.
        assert_eq!(finalized[0].id, "observed-1");
        assert_eq!(finalized[1].id, "observed-2");
        // Synthesized entries follow, in declared order, as failures.
        assert_eq!(finalized[2].id, "missing-1");
        assert_eq!(finalized[3].id, "missing-2");
        assert_eq!(finalized[2].status, CheckStatus::Failure);
        assert_eq!(finalized[3].status, CheckStatus::Failure);
    }

    #[test]
    fn finalized_with_no_observations_is_all_failure() {
        let ledger = CheckLedger::new();
        let finalized = ledger.finalized(&["a", "b"]);
        assert_eq!(finalized.len(), 2);
        assert!(finalized.iter().all(|c| c.status == CheckStatus::Failure));
    }

    #[test]
    fn finalized_is_repeatable() {
        let mut ledger = CheckLedger::new();
        ledger.append(check("a"));
        let first = ledger.finalized(&["a", "b"]);
        let second = ledger.finalized(&["a", "b"]);
        assert_eq!(first.len(), second.len());
        assert_eq!(ledger.len(), 1, "finalized must not mutate the ledger");
    }

    #[test]
    fn timestamps_non_decreasing() {
        let mut ledger = CheckLedger::new();
        let newer = check("a");
        let mut older = check("b");
        older.timestamp = "1999-01-01T00:00:00.000Z".into();
        ledger.append(newer);
        ledger.append(older);
        let checks = ledger.checks();
        assert!(checks[0].timestamp <= checks[1].timestamp);
    }

    #[test]
    fn synthesized_name_from_slug() {
        assert_eq!(unproduced_name("tools-call-with-logging"), "ToolsCallWithLogging");
    }
}
