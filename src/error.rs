//! Workflow-level error taxonomy.

use thiserror::Error;

use crate::access::DenyReason;
use crate::db::DatabaseError;
use crate::identity::AuthError;
use crate::lifecycle::ValidationError;

/// A failed workflow action. Every failure leaves the store as it was
/// before the attempt: validation runs before any write, and each
/// mutation is a single atomic insert or update.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No session, or the identity provider rejected the credentials.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Authenticated, but the gate denied the action.
    #[error("access denied: {0}")]
    Forbidden(DenyReason),

    /// Malformed input, rejected before any store call.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The external store failed; the action terminates without retry.
    /// The caller may re-invoke the same action manually.
    #[error("store error: {0}")]
    Store(#[from] DatabaseError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}
