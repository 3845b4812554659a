use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Role {
    Doctor => "doctor",
    Pharmacist => "pharmacist",
    Nurse => "nurse",
    Patient => "patient",
});

impl Role {
    /// All clinical roles, for gates open to any signed-in user.
    pub const ALL: [Role; 4] = [Role::Doctor, Role::Pharmacist, Role::Nurse, Role::Patient];
}

str_enum!(PrescriptionStatus {
    Active => "active",
    Stopped => "stopped",
});
