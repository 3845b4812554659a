use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::DispenseEvent;

use super::parse_uuid;

/// Append one dispense event. The ledger is append-only: rows are never
/// updated or deleted. `dispensed_at` is assigned by the store.
pub fn insert_dispense(
    conn: &Connection,
    id: &Uuid,
    prescription_id: &Uuid,
    pharmacist_user_id: &str,
) -> Result<DispenseEvent, DatabaseError> {
    conn.execute(
        "INSERT INTO dispenses (id, prescription_id, pharmacist_user_id)
         VALUES (?1, ?2, ?3)",
        params![
            id.to_string(),
            prescription_id.to_string(),
            pharmacist_user_id,
        ],
    )?;

    get_dispense(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "dispense".into(),
        id: id.to_string(),
    })
}

pub fn get_dispense(conn: &Connection, id: &Uuid) -> Result<Option<DispenseEvent>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, prescription_id, pharmacist_user_id, dispensed_at
             FROM dispenses WHERE id = ?1",
            params![id.to_string()],
            dispense_row,
        )
        .optional()?;
    row.map(dispense_from_row).transpose()
}

/// Full event history for one prescription, newest first.
pub fn list_dispenses_for_prescription(
    conn: &Connection,
    prescription_id: &Uuid,
) -> Result<Vec<DispenseEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, prescription_id, pharmacist_user_id, dispensed_at
         FROM dispenses WHERE prescription_id = ?1
         ORDER BY dispensed_at DESC, id",
    )?;

    let rows = stmt.query_map(params![prescription_id.to_string()], dispense_row)?;

    let mut events = Vec::new();
    for row in rows {
        events.push(dispense_from_row(row?)?);
    }
    Ok(events)
}

/// Latest dispense time per prescription id. Ids with no events are
/// absent from the result. An empty input returns an empty map without
/// contacting the store.
pub fn latest_dispense_times(
    conn: &Connection,
    prescription_ids: &[Uuid],
) -> Result<HashMap<Uuid, NaiveDateTime>, DatabaseError> {
    if prescription_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = (1..=prescription_ids.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT prescription_id, MAX(dispensed_at) FROM dispenses
         WHERE prescription_id IN ({placeholders})
         GROUP BY prescription_id"
    );

    let id_strings: Vec<String> = prescription_ids.iter().map(|id| id.to_string()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(id_strings.iter()), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, NaiveDateTime>(1)?))
    })?;

    let mut times = HashMap::new();
    for row in rows {
        let (id, dispensed_at) = row?;
        times.insert(parse_uuid(&id)?, dispensed_at);
    }
    Ok(times)
}

// Internal row type for DispenseEvent mapping
struct DispenseRow {
    id: String,
    prescription_id: String,
    pharmacist_user_id: String,
    dispensed_at: NaiveDateTime,
}

fn dispense_row(row: &rusqlite::Row<'_>) -> Result<DispenseRow, rusqlite::Error> {
    Ok(DispenseRow {
        id: row.get(0)?,
        prescription_id: row.get(1)?,
        pharmacist_user_id: row.get(2)?,
        dispensed_at: row.get(3)?,
    })
}

fn dispense_from_row(row: DispenseRow) -> Result<DispenseEvent, DatabaseError> {
    Ok(DispenseEvent {
        id: parse_uuid(&row.id)?,
        prescription_id: parse_uuid(&row.prescription_id)?,
        pharmacist_user_id: row.pharmacist_user_id,
        dispensed_at: row.dispensed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::testutil::{backdate, seed_patient, seed_prescription, seed_user, test_db};
    use crate::models::enums::Role;

    #[test]
    fn insert_then_get_round_trips() {
        let conn = test_db();
        let doctor = seed_user(&conn, Role::Doctor, "Dr. Grey");
        let pharmacist = seed_user(&conn, Role::Pharmacist, "Phil");
        let patient = seed_patient(&conn, "Alex Smith", &doctor);
        let rx = seed_prescription(&conn, &patient.id, &doctor, "Amoxicillin");

        let id = Uuid::new_v4();
        let event = insert_dispense(&conn, &id, &rx.id, &pharmacist).unwrap();

        assert_eq!(event.id, id);
        assert_eq!(event.prescription_id, rx.id);
        assert_eq!(event.pharmacist_user_id, pharmacist);
    }

    #[test]
    fn empty_input_returns_empty_map_without_store_access() {
        // No schema at all: any query would fail, so an Ok result
        // proves the store was never contacted.
        let conn = Connection::open_in_memory().unwrap();
        let times = latest_dispense_times(&conn, &[]).unwrap();
        assert!(times.is_empty());
    }

    #[test]
    fn latest_time_is_the_maximum() {
        let conn = test_db();
        let doctor = seed_user(&conn, Role::Doctor, "Dr. Grey");
        let pharmacist = seed_user(&conn, Role::Pharmacist, "Phil");
        let patient = seed_patient(&conn, "Alex Smith", &doctor);
        let rx = seed_prescription(&conn, &patient.id, &doctor, "Amoxicillin");

        let first = insert_dispense(&conn, &Uuid::new_v4(), &rx.id, &pharmacist).unwrap();
        let second = insert_dispense(&conn, &Uuid::new_v4(), &rx.id, &pharmacist).unwrap();
        backdate(&conn, "dispenses", "dispensed_at", &first.id, "2026-01-01 09:00:00.000");
        backdate(&conn, "dispenses", "dispensed_at", &second.id, "2026-01-02 09:00:00.000");

        let times = latest_dispense_times(&conn, &[rx.id]).unwrap();
        let latest = times.get(&rx.id).unwrap();
        assert_eq!(latest.to_string(), "2026-01-02 09:00:00");
    }

    #[test]
    fn ids_without_events_are_absent() {
        let conn = test_db();
        let doctor = seed_user(&conn, Role::Doctor, "Dr. Grey");
        let pharmacist = seed_user(&conn, Role::Pharmacist, "Phil");
        let patient = seed_patient(&conn, "Alex Smith", &doctor);
        let dispensed = seed_prescription(&conn, &patient.id, &doctor, "Amoxicillin");
        let untouched = seed_prescription(&conn, &patient.id, &doctor, "Paracetamol");

        insert_dispense(&conn, &Uuid::new_v4(), &dispensed.id, &pharmacist).unwrap();

        let times = latest_dispense_times(&conn, &[dispensed.id, untouched.id]).unwrap();
        assert!(times.contains_key(&dispensed.id));
        assert!(!times.contains_key(&untouched.id));
    }

    #[test]
    fn history_is_newest_first() {
        let conn = test_db();
        let doctor = seed_user(&conn, Role::Doctor, "Dr. Grey");
        let pharmacist = seed_user(&conn, Role::Pharmacist, "Phil");
        let patient = seed_patient(&conn, "Alex Smith", &doctor);
        let rx = seed_prescription(&conn, &patient.id, &doctor, "Amoxicillin");

        let first = insert_dispense(&conn, &Uuid::new_v4(), &rx.id, &pharmacist).unwrap();
        let second = insert_dispense(&conn, &Uuid::new_v4(), &rx.id, &pharmacist).unwrap();
        backdate(&conn, "dispenses", "dispensed_at", &first.id, "2026-01-01 09:00:00.000");
        backdate(&conn, "dispenses", "dispensed_at", &second.id, "2026-01-02 09:00:00.000");

        let events = list_dispenses_for_prescription(&conn, &rx.id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, second.id);
        assert_eq!(events[1].id, first.id);
    }
}
