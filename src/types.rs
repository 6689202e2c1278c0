use serde::{Deserialize, Serialize};

/// One managed database instance to inspect.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            region: None,
        }
    }
}

/// Capacity result for one successfully inspected instance.
///
/// `available_slots` is signed: an over-provisioned instance reports a
/// negative value, which is valid data rather than an error.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CapacityReport {
    pub host: String,
    pub schema_count: usize,
    pub schemas: Vec<String>,
    pub available_slots: i64,
}

/// Why one endpoint's inspection did not produce a capacity report.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connection,
    Query,
    Timeout,
    Cancelled,
    /// Task vanished without reporting (e.g. panicked); back-filled so the
    /// completeness invariant still holds.
    Lost,
}

/// Per-endpoint failure, carried in the report as data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub host: String,
    pub kind: FailureKind,
    pub error: String,
}

/// Aggregate outcome of one scan invocation.
///
/// Invariant: `reports.len() + failures.len() == dispatched`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AggregateReport {
    pub started_at: String,
    pub dispatched: u64,
    pub skipped: u64,
    pub reports: Vec<CapacityReport>,
    pub failures: Vec<ScanFailure>,
}
