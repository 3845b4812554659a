//! Repository layer — entity-scoped database operations.

mod dispense;
mod patient;
mod prescription;
mod profile;

use uuid::Uuid;

use super::DatabaseError;

pub use dispense::*;
pub use patient::*;
pub use prescription::*;
pub use profile::*;

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
