use std::path::PathBuf;

use crate::config::BackendTarget;

/// Logical role of a fixture file within a test group's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    PreSetup,
    SchemaSetup,
    Setup,
    ValuesSetup,
    ValuesTeardown,
    Teardown,
    SchemaTeardown,
    PostTeardown,
}

impl FileRole {
    /// Default filename stem for the role, before any backend suffix.
    pub fn stem(self) -> &'static str {
        match self {
            FileRole::PreSetup => "pre_setup",
            FileRole::SchemaSetup => "schema_setup",
            FileRole::Setup => "setup",
            FileRole::ValuesSetup => "values_setup",
            FileRole::ValuesTeardown => "values_teardown",
            FileRole::Teardown => "teardown",
            FileRole::SchemaTeardown => "schema_teardown",
            FileRole::PostTeardown => "post_teardown",
        }
    }
}

/// Which metadata API protocol a test group declares. V1 is the legacy
/// combined path, valid only on the default backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataApiVersion {
    #[default]
    V1,
    V2,
}

/// A class- or function-scoped collection of test cases sharing one
/// setup/teardown lifecycle: a fixture directory, optional explicit file
/// lists per role and the declared metadata API version.
#[derive(Debug, Clone, Default)]
pub struct TestGroup {
    dir: PathBuf,
    metadata_api_version: MetadataApiVersion,
    setup_files: Option<Vec<PathBuf>>,
    teardown_files: Option<Vec<PathBuf>>,
    schema_setup_files: Option<Vec<PathBuf>>,
    schema_teardown_files: Option<Vec<PathBuf>>,
    values_setup_files: Option<Vec<PathBuf>>,
    values_teardown_files: Option<Vec<PathBuf>>,
}

impl TestGroup {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn metadata_api_version(&self) -> MetadataApiVersion {
        self.metadata_api_version
    }

    pub fn with_metadata_api_version(mut self, version: MetadataApiVersion) -> Self {
        self.metadata_api_version = version;
        self
    }

    pub fn with_setup_files(mut self, files: Vec<PathBuf>) -> Self {
        self.setup_files = Some(files);
        self
    }

    pub fn with_teardown_files(mut self, files: Vec<PathBuf>) -> Self {
        self.teardown_files = Some(files);
        self
    }

    pub fn with_schema_setup_files(mut self, files: Vec<PathBuf>) -> Self {
        self.schema_setup_files = Some(files);
        self
    }

    pub fn with_schema_teardown_files(mut self, files: Vec<PathBuf>) -> Self {
        self.schema_teardown_files = Some(files);
        self
    }

    pub fn with_values_setup_files(mut self, files: Vec<PathBuf>) -> Self {
        self.values_setup_files = Some(files);
        self
    }

    pub fn with_values_teardown_files(mut self, files: Vec<PathBuf>) -> Self {
        self.values_teardown_files = Some(files);
        self
    }

    fn explicit(&self, role: FileRole) -> Option<&[PathBuf]> {
        let files = match role {
            FileRole::Setup => &self.setup_files,
            FileRole::Teardown => &self.teardown_files,
            FileRole::SchemaSetup => &self.schema_setup_files,
            FileRole::SchemaTeardown => &self.schema_teardown_files,
            FileRole::ValuesSetup => &self.values_setup_files,
            FileRole::ValuesTeardown => &self.values_teardown_files,
            // Bracketing files are always resolved from the directory.
            FileRole::PreSetup | FileRole::PostTeardown => &None,
        };
        files.as_deref()
    }

    /// Resolve the ordered fixture files for a role: an explicit per-group
    /// file list always wins over the directory-relative default filename.
    /// Pure lookup, no side effects.
    pub fn resolve(&self, role: FileRole, backend: &BackendTarget) -> Vec<PathBuf> {
        self.resolve_or(role, role, backend)
    }

    /// Like [Self::resolve], but fall back to another role's default
    /// filename. The mutation-schema lifecycle declares its metadata pair as
    /// `schema_setup_files`/`schema_teardown_files` while defaulting to the
    /// plain `setup.yaml`/`teardown.yaml` under the v2 protocol.
    pub fn resolve_or(
        &self,
        role: FileRole,
        default_role: FileRole,
        backend: &BackendTarget,
    ) -> Vec<PathBuf> {
        match self.explicit(role) {
            Some(files) => files.to_vec(),
            None => vec![self.default_file(default_role, backend)],
        }
    }

    /// The directory-relative default file for a role, ignoring any explicit
    /// list. Raw-schema and bracketing pre/post files are always read from
    /// here.
    pub fn default_file(&self, role: FileRole, backend: &BackendTarget) -> PathBuf {
        self.dir.join(backend.default_filename(role.stem()))
    }
}
