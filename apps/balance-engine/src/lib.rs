// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Balance Engine - Rust Core Library
//!
//! Booking balance reconciliation engine for the rental platform.
//!
//! The platform denormalizes each booking's outstanding balance onto the
//! booking row; payments and refunds mutate it, so it can drift from the
//! amount derivable from the payment ledger. This crate detects that
//! drift, classifies it into alert severities, auto-corrects sub-threshold
//! discrepancies, and serves the admin/health HTTP surfaces on top.
//!
//! # Modules
//!
//! - [`models`]: shared value objects (validations, log entries, stats)
//! - [`backend`]: port + REST adapter for the hosted database collaborator
//! - [`reconciliation`]: validator, log reader, alert classifier, sweep job
//! - [`server`]: admin and health HTTP endpoints
//! - [`config`]: YAML configuration with env interpolation
//! - [`observability`] / [`telemetry`]: Prometheus metrics and OTEL tracing

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod reconciliation;
pub mod server;
pub mod telemetry;

pub use backend::{BackendError, BackendPort, RestBackend, RestBackendConfig};
pub use config::{Config, load_config};
pub use error::{EngineError, ErrorCode};
pub use models::{BalanceValidation, PaymentStats, ValidationLogEntry};
pub use reconciliation::{
    AlertMonitor, AlertSeverity, BalanceValidator, ReconciliationJob, ReconciliationSummary,
    RunOptions, ValidationLogReader, ValidationOutcome,
};
pub use server::{AppState, create_router};
