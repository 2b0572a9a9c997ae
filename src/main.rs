use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gqlfix::{DbState, HarnessConfig, MetadataApiVersion, ServerCtx, SetupOptions, TestGroup};
use tracing_subscriber::EnvFilter;

/// gqlfix fixture runner
///
/// Applies a fixture directory's setup or teardown files against a running
/// GraphQL engine, using the same lifecycle the integration-test suite runs.
#[derive(Parser)]
#[command(name = "gqlfix")]
#[command(about = "File-driven fixture runner for GraphQL engine test state")]
struct Args {
    #[command(flatten)]
    config: HarnessConfig,

    /// Fixture directory holding the setup/teardown YAML files
    #[arg(long)]
    dir: std::path::PathBuf,

    /// Use the v2 metadata API protocol (three-endpoint path)
    #[arg(long, default_value_t = false)]
    metadata_api_v2: bool,

    /// Which side of the lifecycle to run
    #[arg(long, value_enum, default_value = "setup")]
    phase: Phase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Phase {
    /// Apply the setup phases and leave the state in place
    Setup,
    /// Run the teardown phases only
    Teardown,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let ctx = ServerCtx::new(&args.config, 0).context("Failed to build server context")?;

    let version = if args.metadata_api_v2 {
        MetadataApiVersion::V2
    } else {
        MetadataApiVersion::V1
    };
    let group = TestGroup::new(&args.dir).with_metadata_api_version(version);

    match args.phase {
        Phase::Setup => {
            // skip_teardown leaves the applied state in place; finish then
            // only releases the guard.
            let opts = SetupOptions {
                skip_setup: false,
                skip_teardown: true,
                check_file_exists: args.config.check_file_exists,
            };
            let state = DbState::setup(&ctx, &group, &opts)
                .await
                .context("Fixture setup failed")?;
            state.finish(false).await?;
        }
        Phase::Teardown => {
            let opts = SetupOptions {
                skip_setup: true,
                skip_teardown: false,
                check_file_exists: args.config.check_file_exists,
            };
            let state = DbState::setup(&ctx, &group, &opts)
                .await
                .context("Failed to plan teardown")?;
            state.finish(true).await.context("Fixture teardown failed")?;
        }
    }

    Ok(())
}
