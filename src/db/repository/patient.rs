use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::Patient;

use super::parse_uuid;

/// Insert a patient. `created_at` is assigned by the store; the stored
/// row is read back and returned.
pub fn insert_patient(
    conn: &Connection,
    id: &Uuid,
    full_name: &str,
    date_of_birth: Option<NaiveDate>,
    nhi: Option<&str>,
    created_by: &str,
) -> Result<Patient, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, full_name, date_of_birth, nhi, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id.to_string(),
            full_name,
            date_of_birth.map(|d| d.to_string()),
            nhi,
            created_by,
        ],
    )?;

    get_patient(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "patient".into(),
        id: id.to_string(),
    })
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, full_name, date_of_birth, nhi, created_by, created_at
             FROM patients WHERE id = ?1",
            params![id.to_string()],
            patient_row,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

/// All patients, most recently registered first.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, date_of_birth, nhi, created_by, created_at
         FROM patients ORDER BY created_at DESC, id",
    )?;

    let rows = stmt.query_map([], patient_row)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

// Internal row type for Patient mapping
struct PatientRow {
    id: String,
    full_name: String,
    date_of_birth: Option<String>,
    nhi: Option<String>,
    created_by: String,
    created_at: NaiveDateTime,
}

fn patient_row(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        full_name: row.get(1)?,
        date_of_birth: row.get(2)?,
        nhi: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid(&row.id)?,
        full_name: row.full_name,
        date_of_birth: row
            .date_of_birth
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        nhi: row.nhi,
        created_by: row.created_by,
        created_at: row.created_at,
    })
}
