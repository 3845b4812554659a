use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One immutable entry in the dispense ledger: a pharmacist supplied
/// medication against a prescription at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseEvent {
    pub id: Uuid,
    pub prescription_id: Uuid,
    pub pharmacist_user_id: String,
    pub dispensed_at: NaiveDateTime,
}
