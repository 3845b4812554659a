//! Append-only dispense ledger.
//!
//! Events are only ever appended; "last dispensed" is derived at read
//! time as the maximum event timestamp per prescription, never stored.
//! A stopped prescription may still be dispensed against (a final batch
//! may go out after the stop) — forbidding that is a workflow policy
//! decision, not a ledger rule.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::access::{CallerContext, DenyReason};
use crate::db::repository;
use crate::error::WorkflowError;
use crate::models::enums::Role;
use crate::models::DispenseEvent;

/// Append a dispense event for a prescription. Pharmacist-only; the
/// role comes from the gate, never from client input.
pub fn record_dispense(
    conn: &Connection,
    prescription_id: &Uuid,
    pharmacist: &CallerContext,
) -> Result<DispenseEvent, WorkflowError> {
    if pharmacist.role != Role::Pharmacist {
        return Err(WorkflowError::Forbidden(DenyReason::RoleNotPermitted));
    }

    if repository::get_prescription(conn, prescription_id)?.is_none() {
        return Err(WorkflowError::NotFound {
            entity: "prescription",
            id: prescription_id.to_string(),
        });
    }

    let event = repository::insert_dispense(
        conn,
        &Uuid::new_v4(),
        prescription_id,
        &pharmacist.user_id,
    )?;
    tracing::info!(
        prescription_id = %prescription_id,
        dispense_id = %event.id,
        "dispense recorded"
    );
    Ok(event)
}

/// Latest dispense time per prescription; ids with no events are absent
/// from the result.
pub fn latest_dispense_times(
    conn: &Connection,
    prescription_ids: &[Uuid],
) -> Result<HashMap<Uuid, NaiveDateTime>, WorkflowError> {
    Ok(repository::latest_dispense_times(conn, prescription_ids)?)
}

/// Full dispense history for one prescription, newest first.
pub fn dispense_history(
    conn: &Connection,
    prescription_id: &Uuid,
) -> Result<Vec<DispenseEvent>, WorkflowError> {
    Ok(repository::list_dispenses_for_prescription(conn, prescription_id)?)
}
