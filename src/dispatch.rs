use std::path::{Path, PathBuf};

use tracing::debug;

use crate::context::ServerCtx;
use crate::errors::{FixtureError, Result};

/// Remote operation endpoints a fixture file can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Legacy combined query endpoint, default-backend v1 protocol only.
    LegacyQuery,
    /// Raw-schema (DDL) endpoint.
    RawSchema,
    /// Metadata/config endpoint.
    Metadata,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::LegacyQuery => "/v1/query",
            Endpoint::RawSchema => "/v2/query",
            Endpoint::Metadata => "/v1/metadata",
        }
    }
}

/// Require every declared fixture file to exist on disk. Called before any
/// HTTP request is issued, so a missing declared file fails the group setup
/// immediately.
pub fn check_files_exist<'a>(lists: impl IntoIterator<Item = &'a [PathBuf]>) -> Result<()> {
    for list in lists {
        for file in list {
            if !file.is_file() {
                return Err(FixtureError::MissingFixtureFile { path: file.clone() });
            }
        }
    }
    Ok(())
}

/// Routes resolved fixture files to engine endpoints and checks statuses.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    ctx: &'a ServerCtx,
}

impl<'a> Dispatcher<'a> {
    pub fn new(ctx: &'a ServerCtx) -> Self {
        Self { ctx }
    }

    /// Apply one fixture file to an endpoint, expecting status 200. Files
    /// missing on disk are silently skipped: a role with no file on disk is
    /// simply not applicable to this group.
    pub async fn apply(&self, endpoint: Endpoint, file: &Path) -> Result<()> {
        if !file.is_file() {
            debug!(file = %file.display(), "fixture file not present, skipping");
            return Ok(());
        }

        let (status, body) = self.ctx.post_yaml_file(endpoint, file).await?;
        if status != 200 {
            return Err(FixtureError::UnexpectedStatus {
                endpoint: endpoint.path().to_string(),
                file: file.to_path_buf(),
                expected: 200,
                actual: status,
                body,
            });
        }
        Ok(())
    }

    /// Apply every file of an ordered list to one endpoint, in order,
    /// stopping at the first failure.
    pub async fn apply_each(&self, endpoint: Endpoint, files: &[PathBuf]) -> Result<()> {
        for file in files {
            self.apply(endpoint, file).await?;
        }
        Ok(())
    }
}
