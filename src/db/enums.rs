use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical lifecycle state of a machine.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "machine_status_enum")]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    #[sea_orm(string_value = "deployed")]
    Deployed,
    #[sea_orm(string_value = "storage")]
    Storage,
    #[sea_orm(string_value = "repair")]
    Repair,
    #[sea_orm(string_value = "decommissioned")]
    Decommissioned,
}

impl Default for MachineStatus {
    fn default() -> Self {
        MachineStatus::Storage
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MachineStatus::Deployed => "deployed",
            MachineStatus::Storage => "storage",
            MachineStatus::Repair => "repair",
            MachineStatus::Decommissioned => "decommissioned",
        };
        write!(f, "{s}")
    }
}

impl MachineStatus {
    /// Parses a query-string value. Unknown values are rejected rather than
    /// silently matching nothing.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "deployed" => Some(MachineStatus::Deployed),
            "storage" => Some(MachineStatus::Storage),
            "repair" => Some(MachineStatus::Repair),
            "decommissioned" => Some(MachineStatus::Decommissioned),
            _ => None,
        }
    }
}

/// Kind of service event recorded in a maintenance log.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "maintenance_type_enum")]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceType {
    #[sea_orm(string_value = "preventive")]
    Preventive,
    #[sea_orm(string_value = "repair")]
    Repair,
    #[sea_orm(string_value = "install")]
    Install,
    #[sea_orm(string_value = "move")]
    Move,
    #[sea_orm(string_value = "other")]
    Other,
}

impl fmt::Display for MaintenanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MaintenanceType::Preventive => "preventive",
            MaintenanceType::Repair => "repair",
            MaintenanceType::Install => "install",
            MaintenanceType::Move => "move",
            MaintenanceType::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl MaintenanceType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "preventive" => Some(MaintenanceType::Preventive),
            "repair" => Some(MaintenanceType::Repair),
            "install" => Some(MaintenanceType::Install),
            "move" => Some(MaintenanceType::Move),
            "other" => Some(MaintenanceType::Other),
            _ => None,
        }
    }
}

/// An asset tag is either waiting in the pool or bound 1:1 to a machine.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "tag_status_enum")]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    #[sea_orm(string_value = "unlinked")]
    Unlinked,
    #[sea_orm(string_value = "linked")]
    Linked,
}

impl fmt::Display for TagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TagStatus::Unlinked => "unlinked",
            TagStatus::Linked => "linked",
        };
        write!(f, "{s}")
    }
}

impl TagStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unlinked" => Some(TagStatus::Unlinked),
            "linked" => Some(TagStatus::Linked),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maintenance_type_rejects_unknown_values() {
        assert_eq!(MaintenanceType::parse("repair"), Some(MaintenanceType::Repair));
        assert_eq!(MaintenanceType::parse("upgrade"), None);
        assert_eq!(MaintenanceType::parse(""), None);
        assert_eq!(MaintenanceType::parse("Preventive"), None); // case-sensitive
    }

    #[test]
    fn machine_status_round_trips_through_serde() {
        let json = serde_json::to_string(&MachineStatus::Decommissioned).unwrap();
        assert_eq!(json, "\"decommissioned\"");
        let back: MachineStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MachineStatus::Decommissioned);
        assert!(serde_json::from_str::<MachineStatus>("\"broken\"").is_err());
    }

    #[test]
    fn tag_status_parses_both_states_only() {
        assert_eq!(TagStatus::parse("unlinked"), Some(TagStatus::Unlinked));
        assert_eq!(TagStatus::parse("linked"), Some(TagStatus::Linked));
        assert_eq!(TagStatus::parse("pending"), None);
    }
}
