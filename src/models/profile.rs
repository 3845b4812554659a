use serde::{Deserialize, Serialize};

use super::enums::Role;

/// One row per user: display name plus the role that governs which
/// operations the user may invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    pub role: Role,
}
