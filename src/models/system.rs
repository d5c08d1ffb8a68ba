//! System variants and their per-system policies

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One of the three parallel equipment-tracking subsystems
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum System {
    /// Common-use terminal equipment (check-in desks, gates)
    Cute,
    /// Flight information display system
    Fids,
    /// Self-service bag drop and boarding gates
    Zamar,
}

/// Capabilities that differ between systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemPolicy {
    pub serial_required: bool,
    pub serial_unique: bool,
    /// At most one non-decommissioned item of each type per installation (admins may bypass)
    pub duplicate_type_enforced: bool,
}

const CUTE_POLICY: SystemPolicy = SystemPolicy {
    serial_required: false,
    serial_unique: false,
    duplicate_type_enforced: true,
};

const FIDS_POLICY: SystemPolicy = SystemPolicy {
    serial_required: false,
    serial_unique: false,
    duplicate_type_enforced: false,
};

const ZAMAR_POLICY: SystemPolicy = SystemPolicy {
    serial_required: true,
    serial_unique: true,
    duplicate_type_enforced: false,
};

impl System {
    pub const ALL: [System; 3] = [System::Cute, System::Fids, System::Zamar];

    pub fn as_str(&self) -> &'static str {
        match self {
            System::Cute => "cute",
            System::Fids => "fids",
            System::Zamar => "zamar",
        }
    }

    /// Name used on printed repair acts
    pub fn display_name(&self) -> &'static str {
        match self {
            System::Cute => "CUTE",
            System::Fids => "FIDS",
            System::Zamar => "Zamar",
        }
    }

    pub fn policy(&self) -> &'static SystemPolicy {
        match self {
            System::Cute => &CUTE_POLICY,
            System::Fids => &FIDS_POLICY,
            System::Zamar => &ZAMAR_POLICY,
        }
    }
}

impl std::fmt::Display for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for System {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cute" => Ok(System::Cute),
            "fids" => Ok(System::Fids),
            "zamar" => Ok(System::Zamar),
            _ => Err(format!("Invalid system: {}", s)),
        }
    }
}

pg_text_enum!(System);

/// Kind-discriminated reference to an equipment row, e.g. `{"system": "fids", "id": 12}`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
pub struct EquipmentRef {
    pub system: System,
    pub id: i64,
}

impl EquipmentRef {
    pub fn new(system: System, id: i64) -> Self {
        Self { system, id }
    }
}

impl std::fmt::Display for EquipmentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} equipment {}", self.system, self.id)
    }
}
