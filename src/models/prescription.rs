use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PrescriptionStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub prescriber_user_id: String,
    pub medication_name: String,
    pub dose: Option<String>,
    pub route: Option<String>,
    pub frequency: Option<String>,
    pub instructions: Option<String>,
    pub indication: Option<String>,
    /// Authorized repeat count. `None` means the prescriber did not
    /// specify, which is distinct from an explicit zero.
    pub repeats: Option<u32>,
    pub status: PrescriptionStatus,
    pub created_at: NaiveDateTime,
}
