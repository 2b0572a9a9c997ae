use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::config::{BackendTarget, HarnessConfig, WorkerTarget};
use crate::dispatch::Endpoint;
use crate::errors::{FixtureError, Result};

/// Header carrying the admin secret on every engine request.
pub const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

/// Long-lived connection context to the engine under test and its backing
/// database. One per worker; read-only during a test run.
#[derive(Debug, Clone)]
pub struct ServerCtx {
    http: reqwest::Client,
    server_url: String,
    database_url: String,
    backend: BackendTarget,
    admin_secret: Option<String>,
}

impl ServerCtx {
    /// Build the context for one parallel worker from the process config.
    pub fn new(config: &HarnessConfig, worker: usize) -> Result<Self> {
        let target = config.worker_target(worker)?;
        Ok(Self::for_target(
            target,
            config.backend_target(),
            config.admin_secret.clone(),
        ))
    }

    pub fn for_target(
        target: WorkerTarget,
        backend: BackendTarget,
        admin_secret: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_url: target.server_url.trim_end_matches('/').to_string(),
            database_url: target.database_url,
            backend,
            admin_secret,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn backend(&self) -> &BackendTarget {
        &self.backend
    }

    /// POST the YAML document in `file` as JSON to an engine endpoint and
    /// return the status code plus response body. Non-2xx statuses are not
    /// errors at this layer; callers interpret them.
    pub async fn post_yaml_file(&self, endpoint: Endpoint, file: &Path) -> Result<(u16, Value)> {
        let doc = read_yaml(file)?;
        let url = format!("{}{}", self.server_url, endpoint.path());
        debug!(endpoint = endpoint.path(), file = %file.display(), "posting fixture file");

        let mut request = self.http.post(&url).json(&doc);
        if let Some(secret) = &self.admin_secret {
            request = request.header(ADMIN_SECRET_HEADER, secret);
        }

        let response = request.send().await.map_err(|source| FixtureError::Http {
            endpoint: endpoint.path().to_string(),
            source,
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|source| FixtureError::Http {
                endpoint: endpoint.path().to_string(),
                source,
            })?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, body))
    }

    /// Shorthand for the legacy combined query endpoint.
    pub async fn v1q_file(&self, file: &Path) -> Result<(u16, Value)> {
        self.post_yaml_file(Endpoint::LegacyQuery, file).await
    }

    /// Shorthand for the raw-schema endpoint.
    pub async fn v2q_file(&self, file: &Path) -> Result<(u16, Value)> {
        self.post_yaml_file(Endpoint::RawSchema, file).await
    }

    /// Shorthand for the metadata endpoint.
    pub async fn metadata_file(&self, file: &Path) -> Result<(u16, Value)> {
        self.post_yaml_file(Endpoint::Metadata, file).await
    }
}

/// Read a YAML fixture file into a JSON value ready for posting.
pub fn read_yaml(file: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(file).map_err(|e| FixtureError::InvalidFixtureFile {
        file: file.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_yaml::from_str(&raw).map_err(|e| FixtureError::InvalidFixtureFile {
        file: file.to_path_buf(),
        reason: e.to_string(),
    })
}
