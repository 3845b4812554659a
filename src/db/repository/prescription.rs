use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::PrescriptionStatus;
use crate::models::Prescription;

use super::parse_uuid;

/// Validated, normalized prescription fields ready to persist.
pub struct NewPrescriptionRow<'a> {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub prescriber_user_id: &'a str,
    pub medication_name: String,
    pub dose: Option<String>,
    pub route: Option<String>,
    pub frequency: Option<String>,
    pub instructions: Option<String>,
    pub indication: Option<String>,
    pub repeats: Option<u32>,
}

/// Insert a prescription. Status always starts as `active`; `created_at`
/// is assigned by the store and read back with the stored row.
pub fn insert_prescription(
    conn: &Connection,
    rx: &NewPrescriptionRow<'_>,
) -> Result<Prescription, DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (id, patient_id, prescriber_user_id, medication_name,
         dose, route, frequency, instructions, indication, repeats, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'active')",
        params![
            rx.id.to_string(),
            rx.patient_id.to_string(),
            rx.prescriber_user_id,
            rx.medication_name,
            rx.dose,
            rx.route,
            rx.frequency,
            rx.instructions,
            rx.indication,
            rx.repeats,
        ],
    )?;

    get_prescription(conn, &rx.id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "prescription".into(),
        id: rx.id.to_string(),
    })
}

pub fn get_prescription(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Prescription>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, prescriber_user_id, medication_name, dose, route,
             frequency, instructions, indication, repeats, status, created_at
             FROM prescriptions WHERE id = ?1",
            params![id.to_string()],
            prescription_row,
        )
        .optional()?;
    row.map(prescription_from_row).transpose()
}

/// Prescriptions for one patient, newest-created first. Dispense
/// recency plays no part in the ordering.
pub fn list_prescriptions_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, prescriber_user_id, medication_name, dose, route,
         frequency, instructions, indication, repeats, status, created_at
         FROM prescriptions WHERE patient_id = ?1
         ORDER BY created_at DESC, id",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], prescription_row)?;

    let mut prescriptions = Vec::new();
    for row in rows {
        prescriptions.push(prescription_from_row(row?)?);
    }
    Ok(prescriptions)
}

/// Most recent prescriptions across all patients, joined with the
/// patient's full name. Bounded: rows beyond `limit` simply fall off.
pub fn recent_prescriptions_with_patient(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<(Prescription, String)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.patient_id, p.prescriber_user_id, p.medication_name, p.dose,
                p.route, p.frequency, p.instructions, p.indication, p.repeats,
                p.status, p.created_at, t.full_name
         FROM prescriptions p
         JOIN patients t ON p.patient_id = t.id
         ORDER BY p.created_at DESC, p.id
         LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], |row| {
        Ok((prescription_row(row)?, row.get::<_, String>(12)?))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (rx_row, patient_name) = row?;
        out.push((prescription_from_row(rx_row)?, patient_name));
    }
    Ok(out)
}

/// Field-level status update; no other column changes.
pub fn set_prescription_status(
    conn: &Connection,
    id: &Uuid,
    status: &PrescriptionStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE prescriptions SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "prescription".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for Prescription mapping
struct PrescriptionRow {
    id: String,
    patient_id: String,
    prescriber_user_id: String,
    medication_name: String,
    dose: Option<String>,
    route: Option<String>,
    frequency: Option<String>,
    instructions: Option<String>,
    indication: Option<String>,
    repeats: Option<u32>,
    status: String,
    created_at: NaiveDateTime,
}

fn prescription_row(row: &rusqlite::Row<'_>) -> Result<PrescriptionRow, rusqlite::Error> {
    Ok(PrescriptionRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        prescriber_user_id: row.get(2)?,
        medication_name: row.get(3)?,
        dose: row.get(4)?,
        route: row.get(5)?,
        frequency: row.get(6)?,
        instructions: row.get(7)?,
        indication: row.get(8)?,
        repeats: row.get(9)?,
        status: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn prescription_from_row(row: PrescriptionRow) -> Result<Prescription, DatabaseError> {
    Ok(Prescription {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        prescriber_user_id: row.prescriber_user_id,
        medication_name: row.medication_name,
        dose: row.dose,
        route: row.route,
        frequency: row.frequency,
        instructions: row.instructions,
        indication: row.indication,
        repeats: row.repeats,
        status: PrescriptionStatus::from_str(&row.status)?,
        created_at: row.created_at,
    })
}
