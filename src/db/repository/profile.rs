use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::Profile;

/// Insert or replace a user's profile row.
pub fn upsert_profile(conn: &Connection, profile: &Profile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO profiles (user_id, display_name, role) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
             display_name = excluded.display_name,
             role = excluded.role",
        params![profile.user_id, profile.display_name, profile.role.as_str()],
    )?;
    Ok(())
}

pub fn get_profile(conn: &Connection, user_id: &str) -> Result<Option<Profile>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT user_id, display_name, role FROM profiles WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((user_id, display_name, role)) => Ok(Some(Profile {
            user_id,
            display_name,
            role: Role::from_str(&role)?,
        })),
        None => Ok(None),
    }
}

/// Update the subject's display name only (self-service path).
pub fn update_display_name(
    conn: &Connection,
    user_id: &str,
    display_name: &str,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE profiles SET display_name = ?1 WHERE user_id = ?2",
        params![display_name, user_id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "profile".into(),
            id: user_id.into(),
        });
    }
    Ok(())
}

/// Assign a role. Administrative path only — role changes never flow
/// through the clinical workflow and are never accepted from the subject.
pub fn assign_role(conn: &Connection, user_id: &str, role: &Role) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE profiles SET role = ?1 WHERE user_id = ?2",
        params![role.as_str(), user_id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "profile".into(),
            id: user_id.into(),
        });
    }
    Ok(())
}
