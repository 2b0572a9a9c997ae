use clap::Args;

/// Backend name for which the legacy combined `/v1/query` protocol is valid.
pub const DEFAULT_BACKEND: &str = "postgres";

/// Process-wide harness configuration.
///
/// Built once at startup from the command line (or assembled directly in
/// tests) and passed by reference into every component that needs it. There
/// is no ambient global lookup; whoever owns the value decides its lifetime.
#[derive(Debug, Clone, Args)]
pub struct HarnessConfig {
    /// GraphQL engine URLs, one per parallel worker
    #[arg(long = "server-url", required = true, num_args = 1..)]
    pub server_urls: Vec<String>,

    /// Database URLs, one per parallel worker
    #[arg(long = "database-url", required = true, num_args = 1..)]
    pub database_urls: Vec<String>,

    /// Backend the engine under test is configured for
    #[arg(long, default_value = DEFAULT_BACKEND)]
    pub backend: String,

    /// Admin secret sent with every request to the engine
    #[arg(long)]
    pub admin_secret: Option<String>,

    /// Skip setting up schema/metadata before test groups
    #[arg(long, default_value_t = false)]
    pub skip_schema_setup: bool,

    /// Skip tearing down schema/metadata after test groups
    #[arg(long, default_value_t = false)]
    pub skip_schema_teardown: bool,

    /// Require every declared fixture file to exist before setup starts
    #[arg(long, default_value_t = false)]
    pub check_file_exists: bool,
}

impl HarnessConfig {
    pub fn backend_target(&self) -> BackendTarget {
        BackendTarget::new(&self.backend)
    }

    /// Resolve the exclusive (engine URL, database URL) pair for a parallel
    /// worker. Each worker owns its pair for the whole run; asking for a
    /// worker beyond the configured URLs is a configuration error reported
    /// before any test runs.
    pub fn worker_target(&self, worker: usize) -> crate::errors::Result<WorkerTarget> {
        let server_url = self.server_urls.get(worker).ok_or_else(|| {
            crate::errors::FixtureError::NotEnoughTargets {
                resource: "server URLs".to_string(),
                required: worker + 1,
                available: self.server_urls.len(),
            }
        })?;
        let database_url = self.database_urls.get(worker).ok_or_else(|| {
            crate::errors::FixtureError::NotEnoughTargets {
                resource: "database URLs".to_string(),
                required: worker + 1,
                available: self.database_urls.len(),
            }
        })?;

        Ok(WorkerTarget {
            server_url: server_url.clone(),
            database_url: database_url.clone(),
        })
    }
}

/// The database backend variant a test run targets. Immutable for the
/// process lifetime once resolved from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    name: String,
}

impl BackendTarget {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The default backend keeps the legacy combined v1 protocol path; every
    /// other backend goes through the three-endpoint protocol.
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_BACKEND
    }

    /// Default fixture filename for a role stem. Non-default backends read
    /// backend-suffixed files, e.g. `setup_citus.yaml`.
    pub fn default_filename(&self, stem: &str) -> String {
        if self.is_default() {
            format!("{stem}.yaml")
        } else {
            format!("{stem}_{}.yaml", self.name)
        }
    }
}

/// The engine/database pair exclusively owned by one parallel worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerTarget {
    pub server_url: String,
    pub database_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_urls(servers: &[&str], databases: &[&str]) -> HarnessConfig {
        HarnessConfig {
            server_urls: servers.iter().map(|s| s.to_string()).collect(),
            database_urls: databases.iter().map(|s| s.to_string()).collect(),
            backend: DEFAULT_BACKEND.to_string(),
            admin_secret: None,
            skip_schema_setup: false,
            skip_schema_teardown: false,
            check_file_exists: false,
        }
    }

    #[test]
    fn test_worker_targets_are_distinct_pairs() {
        let config = config_with_urls(
            &["http://localhost:8080", "http://localhost:8081"],
            &["postgres://one", "postgres://two"],
        );

        let first = config.worker_target(0).unwrap();
        let second = config.worker_target(1).unwrap();
        assert_eq!(first.server_url, "http://localhost:8080");
        assert_eq!(second.database_url, "postgres://two");
        assert_ne!(first, second);
    }

    #[test]
    fn test_worker_beyond_configured_urls_is_an_error() {
        let config = config_with_urls(&["http://localhost:8080"], &["postgres://one"]);

        let err = config.worker_target(1).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("required 2"));
    }

    #[test]
    fn test_default_backend_filenames_are_unsuffixed() {
        let backend = BackendTarget::new(DEFAULT_BACKEND);
        assert!(backend.is_default());
        assert_eq!(backend.default_filename("setup"), "setup.yaml");
    }

    #[test]
    fn test_non_default_backend_filenames_carry_suffix() {
        let backend = BackendTarget::new("citus");
        assert!(!backend.is_default());
        assert_eq!(
            backend.default_filename("schema_setup"),
            "schema_setup_citus.yaml"
        );
    }
}
