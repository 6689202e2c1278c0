use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use schema_scan_rs::config::{ConnectionSettings, ScanConfig};
use schema_scan_rs::directory::{HttpDirectory, InstanceDirectory, StaticDirectory};
use schema_scan_rs::inspector::PgCatalogInspector;
use schema_scan_rs::server::{self, AppState};
use schema_scan_rs::types::AggregateReport;
use schema_scan_rs::{endpoints, scanner};
use std::fs::File;

use anyhow::{bail, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// schema-scan-rs — concurrent tenant-schema capacity scanner for managed Postgres fleets.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "schema-scan-rs",
    version,
    about = "Concurrent tenant-schema capacity scanner for managed Postgres fleets.",
    long_about = None
)]
struct Cli {
    /// Path to an endpoints file (one `host` or `host:port` per line).
    #[arg(long)]
    endpoints: Option<PathBuf>,

    /// Inventory API URL listing database instances. Ignored if --endpoints is set.
    #[arg(long = "directory-url")]
    directory_url: Option<String>,

    /// Region passed to the inventory API.
    #[arg(long)]
    region: Option<String>,

    /// Host prefix marking tenant-hosting instances.
    #[arg(long = "host-prefix", default_value = "db-")]
    host_prefix: String,

    /// Substring marking a schema name as tenant-owned (case-sensitive).
    #[arg(long = "schema-marker", default_value = "dg")]
    schema_marker: String,

    /// Tenant schemas an instance is sized for.
    #[arg(long = "max-schemas", default_value_t = 5)]
    max_schemas: i64,

    /// Max concurrent inspections.
    #[arg(long, default_value_t = 16)]
    concurrency: usize,

    /// Per-endpoint inspection timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 5000)]
    timeout_ms: u64,

    /// Postgres user for inspection connections.
    #[arg(long = "pg-user", default_value = "postgres")]
    pg_user: String,

    /// Default Postgres port for endpoints without an explicit one.
    #[arg(long = "pg-port", default_value_t = 5432)]
    pg_port: u16,

    /// Database to connect to for catalog introspection.
    #[arg(long = "pg-database", default_value = "postgres")]
    pg_database: String,

    /// Write the report as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Serve the scan API over HTTP instead of running one scan.
    #[arg(long, default_value_t = false)]
    serve: bool,

    /// Bind address for --serve.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = ScanConfig {
        max_schema_count: cli.max_schemas,
        host_prefix: cli.host_prefix.clone(),
        schema_marker: cli.schema_marker.clone(),
        inspect_timeout: Duration::from_millis(cli.timeout_ms),
        concurrency: cli.concurrency,
    };
    config.validate()?;

    println!("schema-scan-rs configuration:");
    println!(
        "  endpoints    : {}",
        cli.endpoints
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| cli
                .directory_url
                .clone()
                .unwrap_or_else(|| "<none>".to_string()))
    );
    println!("  host_prefix  : {}", config.host_prefix);
    println!("  schema_marker: {}", config.schema_marker);
    println!("  max_schemas  : {}", config.max_schema_count);
    println!("  concurrency  : {}", config.concurrency);
    println!("  timeout_ms   : {}", cli.timeout_ms);

    // Password comes from PGPASSWORD; it is never a flag so it cannot leak
    // into shell history or process listings.
    let settings = ConnectionSettings {
        user: cli.pg_user.clone(),
        password: std::env::var("PGPASSWORD").unwrap_or_default(),
        port: cli.pg_port,
        database: cli.pg_database.clone(),
    };
    let inspector = Arc::new(PgCatalogInspector::new(settings));

    let directory: Arc<dyn InstanceDirectory> = if let Some(path) = cli.endpoints.as_ref() {
        Arc::new(StaticDirectory::new(endpoints::load_endpoints_from_path(
            path,
        )?))
    } else if let Some(url) = cli.directory_url.as_deref() {
        Arc::new(HttpDirectory::new(url, cli.region.clone()))
    } else if cli.serve {
        // The API accepts inline endpoint lists, so a serve-only process
        // does not need a directory of its own.
        Arc::new(StaticDirectory::new(Vec::new()))
    } else {
        bail!("either --endpoints or --directory-url is required");
    };

    if cli.serve {
        let state = AppState {
            config,
            directory,
            inspector,
        };
        println!("Scan API starting at http://{} (Ctrl+C to stop)", cli.bind);
        server::spawn_server(&cli.bind, state).await?;
        return Ok(());
    }

    // Ctrl-C turns into a cancellation: the scan returns whatever finished,
    // with the rest recorded as cancelled failures.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel_ctrlc.cancel();
    });

    let listed = directory.list_endpoints().await?;
    let report = scanner::scan_with_cancel(&listed, inspector, &config, cancel).await?;

    print_report_table(&report);
    if let Some(path) = cli.output.as_deref() {
        if let Err(e) = write_report_json(path, &report) {
            eprintln!("Failed to write JSON to {}: {}", path.display(), e);
        } else {
            println!("Wrote JSON report to {}", path.display());
        }
    }

    Ok(())
}

fn print_report_table(report: &AggregateReport) {
    let mut host_w = "host".len();
    let mut schemas_w = "schemas".len();
    for r in &report.reports {
        host_w = host_w.max(r.host.len());
        schemas_w = schemas_w.max(r.schemas.join(",").len().min(60));
    }
    let count_w = "count".len();
    let slots_w = "slots".len();

    println!(
        "\nInstances inspected: {} (skipped: {}, failed: {})",
        report.dispatched,
        report.skipped,
        report.failures.len()
    );
    println!(
        "{:<host_w$}  {:>count_w$}  {:>slots_w$}  {:<schemas_w$}",
        "host",
        "count",
        "slots",
        "schemas",
        host_w = host_w,
        count_w = count_w,
        slots_w = slots_w,
        schemas_w = schemas_w
    );
    println!(
        "{:-<host_w$}  {:-<count_w$}  {:-<slots_w$}  {:-<schemas_w$}",
        "",
        "",
        "",
        "",
        host_w = host_w,
        count_w = count_w,
        slots_w = slots_w,
        schemas_w = schemas_w
    );
    for r in &report.reports {
        let mut names = r.schemas.join(",");
        truncate_for_display(&mut names, 60);
        println!(
            "{:<host_w$}  {:>count_w$}  {:>slots_w$}  {:<schemas_w$}",
            r.host,
            r.schema_count,
            r.available_slots,
            names,
            host_w = host_w,
            count_w = count_w,
            slots_w = slots_w,
            schemas_w = schemas_w
        );
    }
    for f in &report.failures {
        eprintln!("failed: {} ({:?}): {}", f.host, f.kind, f.error);
    }
}

/// Truncate to at most `max` bytes without splitting a multibyte character.
fn truncate_for_display(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

fn write_report_json(path: &std::path::Path, report: &AggregateReport) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_stops_at_char_boundaries() {
        // "é" straddles the byte budget: byte 60 is mid-character.
        let mut names = format!("{},é_tenant", "a".repeat(58));
        truncate_for_display(&mut names, 60);
        assert!(names.len() <= 60);
        assert!(names.ends_with(','));

        let mut short = String::from("dg_one,dg_two");
        truncate_for_display(&mut short, 60);
        assert_eq!(short, "dg_one,dg_two");

        let mut ascii = "x".repeat(70);
        truncate_for_display(&mut ascii, 60);
        assert_eq!(ascii.len(), 60);
    }
}
