// Process-wide configuration and worker target assignment
pub mod config;

// Long-lived connection context to the engine under test
pub mod context;

// Fixture file -> endpoint routing
pub mod dispatch;

// Harness error types
pub mod errors;

// Setup/teardown lifecycle guards
pub mod orchestrator;

// Fixture file resolution per test group
pub mod resolver;

// Auxiliary loopback webhook servers
pub mod webhook;

// Re-export key types for convenience
pub use config::{BackendTarget, HarnessConfig, WorkerTarget, DEFAULT_BACKEND};
pub use context::{ServerCtx, ADMIN_SECRET_HEADER};
pub use dispatch::{check_files_exist, Dispatcher, Endpoint};
pub use errors::{FixtureError, Result};
pub use orchestrator::{DbState, SetupOptions, ValuesState};
pub use resolver::{FileRole, MetadataApiVersion, TestGroup};
pub use webhook::{
    RecordedRequest, WebhookServer, ACTIONS_WEBHOOK_PORT, EVENTS_WEBHOOK_PORT,
    SCHEDULED_EVENTS_WEBHOOK_PORT,
};
