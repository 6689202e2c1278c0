use crate::config::ScanConfig;
use crate::error::ConfigError;
use crate::inspector::SchemaInspector;
use crate::types::{AggregateReport, CapacityReport, Endpoint, FailureKind, ScanFailure};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ::time::{format_description::well_known, OffsetDateTime};

/// Inspect all qualifying endpoints concurrently and aggregate one report.
///
/// - Filters endpoints by the configured host prefix; non-matching hosts are
///   skipped before any task is spawned.
/// - Limits concurrent inspections with a `Semaphore` sized by
///   `config.concurrency`.
/// - Bounds each inspection with `tokio::time::timeout`; a timeout becomes a
///   failure entry for that endpoint, never a hung join.
/// - Produces exactly one outcome per dispatched endpoint: results and
///   failures together always add up to the dispatched count.
pub async fn scan(
    endpoints: &[Endpoint],
    inspector: Arc<dyn SchemaInspector>,
    config: &ScanConfig,
) -> Result<AggregateReport, ConfigError> {
    scan_internal(endpoints, inspector, config, None).await
}

/// Variant that accepts a `CancellationToken`, for callers running under an
/// external deadline. On cancellation the scan still returns a complete
/// report: finished endpoints keep their results, unfinished ones are
/// recorded as `cancelled` failures.
pub async fn scan_with_cancel(
    endpoints: &[Endpoint],
    inspector: Arc<dyn SchemaInspector>,
    config: &ScanConfig,
    cancel: CancellationToken,
) -> Result<AggregateReport, ConfigError> {
    scan_internal(endpoints, inspector, config, Some(cancel)).await
}

#[derive(Debug, Clone)]
enum Outcome {
    Report(CapacityReport),
    Failure(ScanFailure),
}

impl Outcome {
    fn host(&self) -> &str {
        match self {
            Outcome::Report(r) => &r.host,
            Outcome::Failure(f) => &f.host,
        }
    }
}

async fn scan_internal(
    endpoints: &[Endpoint],
    inspector: Arc<dyn SchemaInspector>,
    config: &ScanConfig,
    cancel_opt: Option<CancellationToken>,
) -> Result<AggregateReport, ConfigError> {
    config.validate()?;
    let started_at = now_rfc3339();

    let qualifying: Vec<Endpoint> = endpoints
        .iter()
        .filter(|e| e.host.starts_with(&config.host_prefix))
        .cloned()
        .collect();
    let skipped = (endpoints.len() - qualifying.len()) as u64;
    let dispatched = qualifying.len() as u64;
    info!(
        candidates = endpoints.len(),
        dispatched, skipped, "starting scan"
    );

    if qualifying.is_empty() {
        return Ok(AggregateReport {
            started_at,
            dispatched: 0,
            skipped,
            reports: Vec::new(),
            failures: Vec::new(),
        });
    }

    let outcomes: Arc<Mutex<Vec<Outcome>>> =
        Arc::new(Mutex::new(Vec::with_capacity(qualifying.len())));
    let sem = Arc::new(Semaphore::new(config.concurrency.clamp(1, 1024)));
    let mut set = JoinSet::new();
    let cancel = cancel_opt.unwrap_or_default();

    // Dispatched host occurrence counts, for the post-join reconciliation.
    let mut pending: HashMap<String, usize> = HashMap::new();

    for ep in qualifying {
        let permit = sem
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore in scope");
        *pending.entry(ep.host.clone()).or_insert(0) += 1;

        let outcomes = outcomes.clone();
        let inspector = inspector.clone();
        let cancel = cancel.clone();
        let marker = config.schema_marker.clone();
        let max_schema_count = config.max_schema_count;
        let timeout = config.inspect_timeout;

        set.spawn(async move {
            let _permit = permit; // keep permit until task completes

            let outcome = if cancel.is_cancelled() {
                Outcome::Failure(ScanFailure {
                    host: ep.host.clone(),
                    kind: FailureKind::Cancelled,
                    error: "scan cancelled before inspection".to_string(),
                })
            } else {
                // Cancellation interrupts an in-flight inspection too;
                // otherwise a slow endpoint would pin the join barrier for
                // the full timeout after Ctrl-C.
                let inspected = tokio::select! {
                    _ = cancel.cancelled() => None,
                    res = time::timeout(timeout, inspector.inspect(&ep)) => Some(res),
                };
                match inspected {
                    None => {
                        Outcome::Failure(ScanFailure {
                            host: ep.host.clone(),
                            kind: FailureKind::Cancelled,
                            error: "scan cancelled during inspection".to_string(),
                        })
                    }
                    Some(Ok(Ok(names))) => {
                        let schemas: Vec<String> = names
                            .into_iter()
                            .filter(|n| n.contains(&marker))
                            .collect();
                        let schema_count = schemas.len();
                        // Signed on purpose: over-provisioned instances go negative.
                        let available_slots = max_schema_count - schema_count as i64;
                        debug!(host = %ep.host, schema_count, available_slots, "inspected");
                        Outcome::Report(CapacityReport {
                            host: ep.host.clone(),
                            schema_count,
                            schemas,
                            available_slots,
                        })
                    }
                    Some(Ok(Err(e))) => {
                        warn!(host = %ep.host, error = %e, "inspection failed");
                        Outcome::Failure(ScanFailure {
                            host: ep.host.clone(),
                            kind: e.kind(),
                            error: e.to_string(),
                        })
                    }
                    Some(Err(_)) => {
                        warn!(host = %ep.host, ?timeout, "inspection timed out");
                        Outcome::Failure(ScanFailure {
                            host: ep.host.clone(),
                            kind: FailureKind::Timeout,
                            error: format!("no response within {timeout:?}"),
                        })
                    }
                }
            };

            let mut guard = outcomes.lock().await;
            guard.push(outcome);
        });
    }

    // Count-based join: wait for every spawned task, not for a fixed delay.
    while set.join_next().await.is_some() {}

    let collected = match Arc::try_unwrap(outcomes) {
        Ok(m) => m.into_inner(),
        // All tasks are joined, so this branch only fires if a clone leaked;
        // fall back to copying out the contents.
        Err(arc) => arc.lock().await.clone(),
    };

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for outcome in collected {
        if let Some(n) = pending.get_mut(outcome.host()) {
            *n = n.saturating_sub(1);
        }
        match outcome {
            Outcome::Report(r) => reports.push(r),
            Outcome::Failure(f) => failures.push(f),
        }
    }

    // A task that panicked never pushed an outcome. Back-fill so the report
    // still accounts for every dispatched endpoint.
    for (host, n) in pending {
        for _ in 0..n {
            warn!(host = %host, "inspection task vanished without reporting");
            failures.push(ScanFailure {
                host: host.clone(),
                kind: FailureKind::Lost,
                error: "inspection task terminated abnormally".to_string(),
            });
        }
    }

    info!(
        ok = reports.len(),
        failed = failures.len(),
        "scan finished"
    );
    Ok(AggregateReport {
        started_at,
        dispatched,
        skipped,
        reports,
        failures,
    })
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
