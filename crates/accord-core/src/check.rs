//! The check record: one immutable, uniquely-identified observation.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single conformance observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Success,
    Failure,
    Warning,
    Skipped,
    Info,
}

impl CheckStatus {
    /// Whether this status counts toward the pass/fail denominator.
    ///
    /// WARNING, SKIPPED and INFO are advisory and never fail a run.
    pub fn is_scored(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

/// Reference to the protocol specification section a check validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl SpecRef {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: Some(url.into()),
        }
    }

    pub fn id_only(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: None,
        }
    }
}

/// One conformance observation.
///
/// A check is immutable once appended to a ledger; builders below exist to
/// assemble it beforehand. The JSON field names are camelCase because the
/// serialized ledger (`checks.json`) is an external contract consumed by
/// other tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    /// Stable slug, unique within one scenario's expected set.
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: CheckStatus,
    /// RFC 3339 UTC timestamp, millisecond precision.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_references: Option<Vec<SpecRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
}

impl Check {
    /// Create a check with the given status, stamped now.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        status: CheckStatus,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            status,
            timestamp: now_rfc3339(),
            spec_references: None,
            details: None,
            error_message: None,
            logs: None,
        }
    }

    /// Create a passing check.
    pub fn success(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(id, name, description, CheckStatus::Success)
    }

    /// Create a failing check carrying the causal error message.
    pub fn failure(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(id, name, description, CheckStatus::Failure).with_error(error)
    }

    /// Build a check from a list of validation errors: SUCCESS when the
    /// list is empty, FAILURE with the errors joined by `; ` otherwise.
    pub fn from_errors(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        errors: Vec<String>,
    ) -> Self {
        if errors.is_empty() {
            Self::success(id, name, description)
        } else {
            let joined = errors.join("; ");
            Self::new(id, name, description, CheckStatus::Failure)
                .with_error(joined)
                .with_logs(errors)
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_spec_ref(mut self, spec_ref: SpecRef) -> Self {
        self.spec_references.get_or_insert_with(Vec::new).push(spec_ref);
        self
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = Some(logs);
        self
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Success
    }
}

/// Current time as RFC 3339 with millisecond precision (trailing `Z`).
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
