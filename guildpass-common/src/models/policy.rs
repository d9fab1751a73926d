// File: guildpass-common/src/models/policy.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of bot commands an operator can configure per server.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ConfigurableCommand {
    AddProduct,
    RemoveProduct,
    ListProducts,
    EditProduct,
    ListWhitelist,
    AddWhitelist,
    RemoveWhitelist,
    CopyConfig,
}

impl ConfigurableCommand {
    pub const ALL: [ConfigurableCommand; 8] = [
        ConfigurableCommand::AddProduct,
        ConfigurableCommand::RemoveProduct,
        ConfigurableCommand::ListProducts,
        ConfigurableCommand::EditProduct,
        ConfigurableCommand::ListWhitelist,
        ConfigurableCommand::AddWhitelist,
        ConfigurableCommand::RemoveWhitelist,
        ConfigurableCommand::CopyConfig,
    ];

    /// Human-readable description, used only for display.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigurableCommand::AddProduct => "Add a product configuration to this server",
            ConfigurableCommand::RemoveProduct => "Remove a product configuration",
            ConfigurableCommand::ListProducts => "List the products configured on this server",
            ConfigurableCommand::EditProduct => "Edit an existing product configuration",
            ConfigurableCommand::ListWhitelist => "List whitelisted members for a product",
            ConfigurableCommand::AddWhitelist => "Manually whitelist a member",
            ConfigurableCommand::RemoveWhitelist => "Remove a member from the whitelist",
            ConfigurableCommand::CopyConfig => "Copy a product configuration to another server",
        }
    }
}

impl fmt::Display for ConfigurableCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurableCommand::AddProduct => write!(f, "add-product"),
            ConfigurableCommand::RemoveProduct => write!(f, "remove-product"),
            ConfigurableCommand::ListProducts => write!(f, "list-products"),
            ConfigurableCommand::EditProduct => write!(f, "edit-product"),
            ConfigurableCommand::ListWhitelist => write!(f, "list-whitelist"),
            ConfigurableCommand::AddWhitelist => write!(f, "add-whitelist"),
            ConfigurableCommand::RemoveWhitelist => write!(f, "remove-whitelist"),
            ConfigurableCommand::CopyConfig => write!(f, "copy-config"),
        }
    }
}

impl FromStr for ConfigurableCommand {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add-product" => Ok(ConfigurableCommand::AddProduct),
            "remove-product" => Ok(ConfigurableCommand::RemoveProduct),
            "list-products" => Ok(ConfigurableCommand::ListProducts),
            "edit-product" => Ok(ConfigurableCommand::EditProduct),
            "list-whitelist" => Ok(ConfigurableCommand::ListWhitelist),
            "add-whitelist" => Ok(ConfigurableCommand::AddWhitelist),
            "remove-whitelist" => Ok(ConfigurableCommand::RemoveWhitelist),
            "copy-config" => Ok(ConfigurableCommand::CopyConfig),
            _ => Err(format!("Unknown command: {}", s)),
        }
    }
}

/// Per-server authorization policy for one command.
///
/// A stored row overrides the synthesized default field-by-field; when no row
/// exists the default applies: enabled, admin-only, no explicit roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandPolicy {
    pub server_id: Uuid,
    pub command: ConfigurableCommand,
    pub enabled: bool,
    pub require_admin: bool,
    pub allowed_role_ids: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl CommandPolicy {
    pub fn default_for(server_id: Uuid, command: ConfigurableCommand) -> Self {
        Self {
            server_id,
            command,
            enabled: true,
            require_admin: true,
            allowed_role_ids: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names_round_trip() {
        for cmd in ConfigurableCommand::ALL {
            let parsed: ConfigurableCommand = cmd.to_string().parse().unwrap();
            assert_eq!(parsed, cmd);
        }
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!("nuke-everything".parse::<ConfigurableCommand>().is_err());
    }
}
