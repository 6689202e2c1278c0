use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection};

use crate::config::ConnectionSettings;
use crate::error::InspectError;
use crate::types::Endpoint;

/// Introspects one database instance and returns all schema names found.
///
/// The scanner treats this as an opaque, potentially slow, potentially
/// failing remote call; marker filtering and slot arithmetic happen in the
/// scanner, not here.
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    async fn inspect(&self, endpoint: &Endpoint) -> Result<Vec<String>, InspectError>;
}

/// Inspector that opens one Postgres connection per inspection and lists
/// databases from `pg_catalog`. The connection lives only for the duration
/// of the query.
#[derive(Debug, Clone)]
pub struct PgCatalogInspector {
    settings: ConnectionSettings,
}

const INTROSPECTION_QUERY: &str = "SELECT datname FROM pg_catalog.pg_database";

impl PgCatalogInspector {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    fn connect_options(&self, endpoint: &Endpoint) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&endpoint.host)
            .port(endpoint.port.unwrap_or(self.settings.port))
            .username(&self.settings.user)
            .password(&self.settings.password)
            .database(&self.settings.database)
    }
}

#[async_trait]
impl SchemaInspector for PgCatalogInspector {
    async fn inspect(&self, endpoint: &Endpoint) -> Result<Vec<String>, InspectError> {
        let mut conn = self
            .connect_options(endpoint)
            .connect()
            .await
            .map_err(|e| InspectError::Connection(e.to_string()))?;

        // A decode error on any row is this endpoint's failure, nothing more.
        let names: Vec<String> = sqlx::query_scalar(INTROSPECTION_QUERY)
            .fetch_all(&mut conn)
            .await
            .map_err(|e| InspectError::Query(e.to_string()))?;

        let _ = conn.close().await;
        Ok(names)
    }
}
