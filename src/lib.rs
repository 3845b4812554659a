//! Scriptline — role-gated clinical prescription workflow.
//!
//! The core of a clinical portal: an access gate every protected
//! operation passes through, the prescription lifecycle state machine
//! (active → stopped), and an append-only dispense ledger with a
//! derived "last dispensed" projection. Views, routing, and rendering
//! live outside this crate; it exposes the workflow service they call.

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod lifecycle;
pub mod models;
pub mod workflow;

pub use access::{CallerContext, Decision, DenyReason};
pub use error::WorkflowError;
pub use workflow::PrescriptionWorkflowService;

use tracing_subscriber::EnvFilter;

/// Initialize tracing from RUST_LOG, falling back to the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
