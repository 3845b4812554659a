use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A patient record. Immutable once created — the clinical workflow has
/// no edit or delete path for patients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    /// National health identifier, normalized to uppercase on intake.
    pub nhi: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}
