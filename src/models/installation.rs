//! Installation (site) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{normalize_text, System};

/// Physical terminal zones of the airport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    TerminalA,
    TerminalB,
    TerminalC,
    TerminalD,
    TerminalE,
    TerminalF,
}

impl Terminal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Terminal::TerminalA => "terminal_a",
            Terminal::TerminalB => "terminal_b",
            Terminal::TerminalC => "terminal_c",
            Terminal::TerminalD => "terminal_d",
            Terminal::TerminalE => "terminal_e",
            Terminal::TerminalF => "terminal_f",
        }
    }

    /// Single-letter name, as printed on repair acts
    pub fn name(&self) -> &'static str {
        match self {
            Terminal::TerminalA => "A",
            Terminal::TerminalB => "B",
            Terminal::TerminalC => "C",
            Terminal::TerminalD => "D",
            Terminal::TerminalE => "E",
            Terminal::TerminalF => "F",
        }
    }
}

impl std::str::FromStr for Terminal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "terminal_a" => Ok(Terminal::TerminalA),
            "terminal_b" => Ok(Terminal::TerminalB),
            "terminal_c" => Ok(Terminal::TerminalC),
            "terminal_d" => Ok(Terminal::TerminalD),
            "terminal_e" => Ok(Terminal::TerminalE),
            "terminal_f" => Ok(Terminal::TerminalF),
            _ => Err(format!("Invalid terminal: {}", s)),
        }
    }
}

pg_text_enum!(Terminal);

/// Installation site record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Installation {
    pub id: i64,
    pub system: System,
    pub name: String,
    /// Installation type code from the installation type catalog
    pub installation_type: String,
    pub terminal: Option<Terminal>,
    /// Optional site identifier, unique within the system
    pub identifier: Option<String>,
    pub owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installation {
    pub fn terminal_name(&self) -> Option<&'static str> {
        self.terminal.map(|t| t.name())
    }
}

/// Installation with the number of equipment items bound to it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InstallationDetails {
    pub installation: Installation,
    pub equipment_count: i64,
}

/// Create installation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInstallation {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Installation type must be 1-100 characters"))]
    pub installation_type: String,
    pub terminal: Option<Terminal>,
    #[validate(length(max = 100, message = "Identifier must be at most 100 characters"))]
    pub identifier: Option<String>,
}

impl CreateInstallation {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            installation_type: self.installation_type.trim().to_string(),
            terminal: self.terminal,
            identifier: normalize_text(self.identifier),
        }
    }
}

/// Update installation request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateInstallation {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Installation type must be 1-100 characters"))]
    pub installation_type: Option<String>,
    /// `null` clears the terminal, absent leaves it unchanged
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Terminal>)]
    pub terminal: Option<Option<Terminal>>,
    /// Blank clears the identifier
    #[validate(length(max = 100, message = "Identifier must be at most 100 characters"))]
    pub identifier: Option<String>,
}

impl UpdateInstallation {
    /// Trim the required fields so blank values fail validation instead of being stored
    pub fn normalized(mut self) -> Self {
        self.name = self.name.map(|v| v.trim().to_string());
        self.installation_type = self.installation_type.map(|v| v.trim().to_string());
        self
    }
}

impl Installation {
    /// Copy of this installation with the requested changes applied
    pub fn apply_update(&self, data: &UpdateInstallation) -> Installation {
        let mut next = self.clone();
        if let Some(name) = &data.name {
            next.name = name.trim().to_string();
        }
        if let Some(installation_type) = &data.installation_type {
            next.installation_type = installation_type.trim().to_string();
        }
        if let Some(terminal) = data.terminal {
            next.terminal = terminal;
        }
        if data.identifier.is_some() {
            next.identifier = normalize_text(data.identifier.clone());
        }
        next
    }
}

/// Installation list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct InstallationQuery {
    pub terminal: Option<Terminal>,
    pub installation_type: Option<String>,
    /// Case-insensitive name search
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installation() -> Installation {
        Installation {
            id: 1,
            system: System::Cute,
            name: "Desk 12".into(),
            installation_type: "check_in_desk".into(),
            terminal: Some(Terminal::TerminalB),
            identifier: Some("CKI-12".into()),
            owner_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_terminal_name_is_letter() {
        assert_eq!(installation().terminal_name(), Some("B"));
        assert_eq!("terminal_f".parse::<Terminal>().unwrap().name(), "F");
    }

    #[test]
    fn test_update_can_clear_terminal_and_identifier() {
        let update: UpdateInstallation =
            serde_json::from_str(r#"{"terminal": null, "identifier": " "}"#).unwrap();
        let next = installation().apply_update(&update);
        assert_eq!(next.terminal, None);
        assert_eq!(next.identifier, None);
        assert_eq!(next.name, "Desk 12");
    }

    #[test]
    fn test_update_absent_terminal_is_unchanged() {
        let update: UpdateInstallation = serde_json::from_str(r#"{"name": "Desk 13"}"#).unwrap();
        let next = installation().apply_update(&update);
        assert_eq!(next.terminal, Some(Terminal::TerminalB));
        assert_eq!(next.name, "Desk 13");
    }

    #[test]
    fn test_blank_name_fails_after_trim() {
        let create = CreateInstallation {
            name: "  ".into(),
            installation_type: "check_in_desk".into(),
            terminal: None,
            identifier: None,
        };
        assert!(create.normalized().validate().is_err());

        let update: UpdateInstallation = serde_json::from_str(r#"{"name": " "}"#).unwrap();
        assert!(update.normalized().validate().is_err());
    }
}
