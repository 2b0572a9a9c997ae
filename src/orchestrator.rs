use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::{BackendTarget, HarnessConfig};
use crate::context::ServerCtx;
use crate::dispatch::{check_files_exist, Dispatcher, Endpoint};
use crate::errors::Result;
use crate::resolver::{FileRole, MetadataApiVersion, TestGroup};

/// Per-group lifecycle options, derived from the process config.
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    pub skip_setup: bool,
    pub skip_teardown: bool,
    pub check_file_exists: bool,
}

impl From<&HarnessConfig> for SetupOptions {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            skip_setup: config.skip_schema_setup,
            skip_teardown: config.skip_schema_teardown,
            check_file_exists: config.check_file_exists,
        }
    }
}

/// The protocol a group runs, fixed before any request is issued and never
/// changed mid-group. V1 is the single combined file list against the legacy
/// endpoint; V2 is the six-phase file set across three endpoints.
#[derive(Debug, Clone)]
enum Plan {
    V1 {
        setup: Vec<PathBuf>,
        teardown: Vec<PathBuf>,
    },
    V2 {
        pre_setup: Vec<PathBuf>,
        schema_setup: Vec<PathBuf>,
        setup: Vec<PathBuf>,
        teardown: Vec<PathBuf>,
        schema_teardown: Vec<PathBuf>,
        post_teardown: Vec<PathBuf>,
    },
}

impl Plan {
    /// Select the protocol and resolve every phase's files. The metadata
    /// pair honors explicit per-group file lists; raw-schema and bracketing
    /// files always come from the group directory.
    fn build(
        backend: &BackendTarget,
        group: &TestGroup,
        primary_setup: FileRole,
        primary_teardown: FileRole,
    ) -> Self {
        let legacy =
            backend.is_default() && group.metadata_api_version() == MetadataApiVersion::V1;
        if legacy {
            Plan::V1 {
                setup: group.resolve(primary_setup, backend),
                teardown: group.resolve(primary_teardown, backend),
            }
        } else {
            Plan::V2 {
                pre_setup: vec![group.default_file(FileRole::PreSetup, backend)],
                schema_setup: vec![group.default_file(FileRole::SchemaSetup, backend)],
                setup: group.resolve_or(primary_setup, FileRole::Setup, backend),
                teardown: group.resolve_or(primary_teardown, FileRole::Teardown, backend),
                schema_teardown: vec![group.default_file(FileRole::SchemaTeardown, backend)],
                post_teardown: vec![group.default_file(FileRole::PostTeardown, backend)],
            }
        }
    }

    /// Declared files that must exist when existence checking is on. The
    /// bracketing pre/post files stay optional either way.
    fn check_files(&self) -> Result<()> {
        match self {
            Plan::V1 { setup, teardown } => {
                check_files_exist([setup.as_slice(), teardown.as_slice()])
            }
            Plan::V2 {
                schema_setup,
                setup,
                teardown,
                schema_teardown,
                ..
            } => check_files_exist([
                setup.as_slice(),
                teardown.as_slice(),
                schema_setup.as_slice(),
                schema_teardown.as_slice(),
            ]),
        }
    }
}

/// Scoped guard over a group's database/metadata state.
///
/// [DbState::setup] runs the setup phases; the caller must hand the guard
/// back through [DbState::finish] on every exit path, passing whether any
/// enclosed test failed. Teardown is never unconditionally skipped in the
/// presence of failures: a true `tests_failed` overrides `skip_teardown`.
#[derive(Debug)]
pub struct DbState<'a> {
    ctx: &'a ServerCtx,
    plan: Plan,
    skip_teardown: bool,
    finished: bool,
}

impl<'a> DbState<'a> {
    /// Set up database/metadata state for a group of tests. Uses the group's
    /// `setup`/`teardown` file pair as the primary pair.
    pub async fn setup(
        ctx: &'a ServerCtx,
        group: &TestGroup,
        opts: &SetupOptions,
    ) -> Result<DbState<'a>> {
        Self::setup_with_roles(ctx, group, opts, FileRole::Setup, FileRole::Teardown).await
    }

    /// Set up the database schema for mutation tests. Same lifecycle as
    /// [DbState::setup] but keyed on the `schema_setup`/`schema_teardown`
    /// file pair, so data-changing tests can re-seed values per test while
    /// sharing one schema per class.
    pub async fn setup_schema(
        ctx: &'a ServerCtx,
        group: &TestGroup,
        opts: &SetupOptions,
    ) -> Result<DbState<'a>> {
        Self::setup_with_roles(
            ctx,
            group,
            opts,
            FileRole::SchemaSetup,
            FileRole::SchemaTeardown,
        )
        .await
    }

    async fn setup_with_roles(
        ctx: &'a ServerCtx,
        group: &TestGroup,
        opts: &SetupOptions,
        primary_setup: FileRole,
        primary_teardown: FileRole,
    ) -> Result<DbState<'a>> {
        let plan = Plan::build(ctx.backend(), group, primary_setup, primary_teardown);
        if opts.check_file_exists {
            plan.check_files()?;
        }

        let mut state = DbState {
            ctx,
            plan,
            skip_teardown: opts.skip_teardown,
            finished: false,
        };
        if !opts.skip_setup {
            if let Err(err) = state.run_setup().await {
                // Compensation already ran inside run_setup; the group is
                // dead, so there is nothing left to tear down later.
                state.finished = true;
                return Err(err);
            }
        }
        Ok(state)
    }

    async fn run_setup(&self) -> Result<()> {
        let dispatcher = Dispatcher::new(self.ctx);
        match &self.plan {
            Plan::V1 { setup, .. } => dispatcher.apply_each(Endpoint::LegacyQuery, setup).await,
            Plan::V2 {
                pre_setup,
                schema_setup,
                setup,
                schema_teardown,
                post_teardown,
                ..
            } => {
                dispatcher.apply_each(Endpoint::Metadata, pre_setup).await?;

                if let Err(err) = dispatcher.apply_each(Endpoint::RawSchema, schema_setup).await {
                    warn!(error = %err, "schema setup failed, running post-teardown");
                    dispatcher
                        .apply_each(Endpoint::Metadata, post_teardown)
                        .await?;
                    return Err(err);
                }

                if let Err(err) = dispatcher.apply_each(Endpoint::Metadata, setup).await {
                    // Metadata setup failed: drop the schema applied above,
                    // run post-teardown, then surface the original failure.
                    // Rollback is best-effort, once; a rollback failure
                    // propagates without further compensation.
                    warn!(error = %err, "metadata setup failed, rolling back schema");
                    dispatcher
                        .apply_each(Endpoint::RawSchema, schema_teardown)
                        .await?;
                    dispatcher
                        .apply_each(Endpoint::Metadata, post_teardown)
                        .await?;
                    return Err(err);
                }

                Ok(())
            }
        }
    }

    /// Tear down whatever setup applied. Runs even when `skip_teardown` is
    /// set if any enclosed test failed. Every teardown phase is attempted
    /// even when an earlier phase fails; the first error is returned after
    /// all phases ran.
    pub async fn finish(mut self, tests_failed: bool) -> Result<()> {
        self.finished = true;
        if self.skip_teardown && !tests_failed {
            info!("teardown skipped by configuration");
            return Ok(());
        }

        let dispatcher = Dispatcher::new(self.ctx);
        match &self.plan {
            Plan::V1 { teardown, .. } => {
                dispatcher.apply_each(Endpoint::LegacyQuery, teardown).await
            }
            Plan::V2 {
                teardown,
                schema_teardown,
                post_teardown,
                ..
            } => {
                let phases = [
                    (Endpoint::Metadata, teardown.as_slice()),
                    (Endpoint::RawSchema, schema_teardown.as_slice()),
                    (Endpoint::Metadata, post_teardown.as_slice()),
                ];

                let mut first_error = None;
                for (endpoint, files) in phases {
                    if let Err(err) = dispatcher.apply_each(endpoint, files).await {
                        warn!(error = %err, "teardown phase failed, continuing cleanup");
                        first_error.get_or_insert(err);
                    }
                }
                match first_error {
                    Some(err) => Err(err),
                    None => Ok(()),
                }
            }
        }
    }
}

impl Drop for DbState<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("DbState dropped without finish, engine state was not torn down");
        }
    }
}

/// Function-scoped guard over per-test data files, layered on top of a
/// class-scoped [DbState] built with [DbState::setup_schema]. Data files use
/// the legacy endpoint on the default backend and the raw-schema endpoint
/// otherwise; they are never existence-checked and teardown always runs.
#[derive(Debug)]
pub struct ValuesState<'a> {
    ctx: &'a ServerCtx,
    endpoint: Endpoint,
    teardown: Vec<PathBuf>,
    finished: bool,
}

impl<'a> ValuesState<'a> {
    pub async fn setup(ctx: &'a ServerCtx, group: &TestGroup) -> Result<ValuesState<'a>> {
        let backend = ctx.backend();
        let endpoint = if backend.is_default() {
            Endpoint::LegacyQuery
        } else {
            Endpoint::RawSchema
        };
        let setup = group.resolve(FileRole::ValuesSetup, backend);
        let teardown = group.resolve(FileRole::ValuesTeardown, backend);

        Dispatcher::new(ctx).apply_each(endpoint, &setup).await?;
        Ok(ValuesState {
            ctx,
            endpoint,
            teardown,
            finished: false,
        })
    }

    pub async fn finish(mut self) -> Result<()> {
        self.finished = true;
        Dispatcher::new(self.ctx)
            .apply_each(self.endpoint, &self.teardown)
            .await
    }
}

impl Drop for ValuesState<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("ValuesState dropped without finish, test data was not torn down");
        }
    }
}
