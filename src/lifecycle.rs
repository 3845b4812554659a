//! Prescription lifecycle: creation and the active → stopped machine.
//!
//! Two states, one transition. `stopped` is terminal: no path re-enters
//! `active`. Validation always runs before any store write.

use rusqlite::Connection;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::access::{CallerContext, DenyReason};
use crate::db::repository::{
    get_prescription, insert_prescription, set_prescription_status, NewPrescriptionRow,
};
use crate::error::WorkflowError;
use crate::models::enums::{PrescriptionStatus, Role};
use crate::models::Prescription;

/// Local input rejection; nothing reaches the store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("medication_name_required")]
    MedicationNameRequired,
    #[error("repeats_not_numeric")]
    RepeatsNotNumeric,
    #[error("full_name_required")]
    FullNameRequired,
    #[error("date_of_birth_invalid")]
    DateOfBirthInvalid,
}

/// Raw prescription form fields, exactly as bound from the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrescriptionDraft {
    pub medication_name: String,
    pub dose: String,
    pub route: String,
    pub frequency: String,
    pub instructions: String,
    pub indication: String,
    /// Free text: blank means "not specified", never zero.
    pub repeats: String,
}

/// Trim a free-text field, normalizing empty to absent. Empty strings
/// are never stored.
pub(crate) fn normalize(field: &str) -> Option<String> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_repeats(raw: &str) -> Result<Option<u32>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ValidationError::RepeatsNotNumeric)
}

/// Create a prescription for a patient. The prescriber must have passed
/// the gate as a doctor; status is always `active` at creation.
pub fn create(
    conn: &Connection,
    patient_id: &Uuid,
    prescriber: &CallerContext,
    draft: &PrescriptionDraft,
) -> Result<Prescription, WorkflowError> {
    if prescriber.role != Role::Doctor {
        return Err(WorkflowError::Forbidden(DenyReason::RoleNotPermitted));
    }

    let medication_name =
        normalize(&draft.medication_name).ok_or(ValidationError::MedicationNameRequired)?;
    let repeats = parse_repeats(&draft.repeats)?;

    let row = NewPrescriptionRow {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        prescriber_user_id: &prescriber.user_id,
        medication_name,
        dose: normalize(&draft.dose),
        route: normalize(&draft.route),
        frequency: normalize(&draft.frequency),
        instructions: normalize(&draft.instructions),
        indication: normalize(&draft.indication),
        repeats,
    };

    let rx = insert_prescription(conn, &row)?;
    tracing::info!(prescription_id = %rx.id, patient_id = %patient_id, "prescription created");
    Ok(rx)
}

/// Stop a prescription. Idempotent: stopping an already-stopped
/// prescription is a no-op success — the terminal state is identical
/// either way, so the store is not touched again.
pub fn stop(
    conn: &Connection,
    prescription_id: &Uuid,
    caller: &CallerContext,
) -> Result<Prescription, WorkflowError> {
    if caller.role != Role::Doctor {
        return Err(WorkflowError::Forbidden(DenyReason::RoleNotPermitted));
    }

    let rx = get_prescription(conn, prescription_id)?.ok_or_else(|| WorkflowError::NotFound {
        entity: "prescription",
        id: prescription_id.to_string(),
    })?;

    if rx.status == PrescriptionStatus::Stopped {
        return Ok(rx);
    }

    set_prescription_status(conn, prescription_id, &PrescriptionStatus::Stopped)?;
    tracing::info!(prescription_id = %prescription_id, "prescription stopped");

    get_prescription(conn, prescription_id)?.ok_or_else(|| WorkflowError::NotFound {
        entity: "prescription",
        id: prescription_id.to_string(),
    })
}
