use async_trait::async_trait;
use serde::Deserialize;

use crate::error::DirectoryError;
use crate::types::Endpoint;

/// Lists the candidate database endpoints for one scan.
///
/// A failure here is fatal to the invocation: with no endpoint list there is
/// nothing to report, so the error propagates before the scanner runs.
#[async_trait]
pub trait InstanceDirectory: Send + Sync {
    async fn list_endpoints(&self) -> Result<Vec<Endpoint>, DirectoryError>;
}

/// Directory backed by a fixed, pre-parsed endpoint list (CLI file input,
/// inline request payloads, tests).
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    endpoints: Vec<Endpoint>,
}

impl StaticDirectory {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl InstanceDirectory for StaticDirectory {
    async fn list_endpoints(&self) -> Result<Vec<Endpoint>, DirectoryError> {
        Ok(self.endpoints.clone())
    }
}

#[derive(Debug, Deserialize)]
struct InventoryResponse {
    instances: Vec<Endpoint>,
}

/// Directory backed by a cloud inventory HTTP API returning
/// `{ "instances": [ { "host": ..., "port": ..., "region": ... } ] }`.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    url: String,
    region: Option<String>,
}

impl HttpDirectory {
    pub fn new(url: impl Into<String>, region: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            region,
        }
    }
}

#[async_trait]
impl InstanceDirectory for HttpDirectory {
    async fn list_endpoints(&self) -> Result<Vec<Endpoint>, DirectoryError> {
        let mut req = self.client.get(&self.url);
        if let Some(region) = &self.region {
            req = req.query(&[("region", region.as_str())]);
        }
        let resp = req.send().await?.error_for_status()?;
        let body: InventoryResponse = resp
            .json()
            .await
            .map_err(|e| DirectoryError::Malformed(e.to_string()))?;
        Ok(body.instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_directory_returns_its_list() {
        let dir = StaticDirectory::new(vec![Endpoint::new("db-a"), Endpoint::new("db-b")]);
        let eps = dir.list_endpoints().await.unwrap();
        assert_eq!(eps.len(), 2);
        assert_eq!(eps[0].host, "db-a");
    }

    #[test]
    fn inventory_body_deserializes() {
        let body = r#"{"instances":[{"host":"db-a","port":5433,"region":"us-east-1"},{"host":"db-b"}]}"#;
        let parsed: InventoryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.instances.len(), 2);
        assert_eq!(parsed.instances[0].port, Some(5433));
        assert_eq!(parsed.instances[1].port, None);
    }
}
