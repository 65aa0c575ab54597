//! Configuration management for cmdmux.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::alias::DEFAULT_NAMESPACE_SEPARATOR;

/// Name of the project-local config file.
pub const LOCAL_CONFIG_FILE: &str = ".cmdmux.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Command manager settings
    pub manager: ManagerConfig,

    /// Commands served by the scripted registrar
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<ScriptedCommandConfig>,
}

/// Command manager settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Separator between plugin id and command name in fallback aliases
    pub namespace_separator: char,

    /// Release aliases even when the registrar's cleanup fails
    pub release_on_notify_failure: bool,

    /// Maximum number of top-level alias suggestions (0 = unlimited)
    pub max_suggestions: usize,

    /// Attach "did you mean" hints to not-found results
    pub did_you_mean: bool,
}

/// A command declared in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedCommandConfig {
    /// Plugin the command is registered for
    pub plugin: String,

    /// Preferred command name
    pub name: String,

    /// Additional aliases, most preferred first
    pub aliases: Vec<String>,

    /// One-line description shown by help
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Response template; supports {args}, {alias} and {subject}
    pub response: String,

    /// Permission required to run the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,

    /// Report the rendered response as a failure instead of a success
    pub fail: bool,
}

impl ScriptedCommandConfig {
    /// Create a scripted command.
    pub fn new(
        plugin: impl Into<String>,
        name: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            name: name.into(),
            response: response.into(),
            ..Self::default()
        }
    }

    /// Add an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Require a permission.
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    /// Check the entry can be registered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidCommand {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.plugin.trim().is_empty() {
            return Err(invalid("plugin is empty"));
        }
        if self.plugin.trim().contains(char::is_whitespace) {
            return Err(invalid("plugin contains whitespace"));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(invalid("name contains whitespace"));
        }
        if self.aliases.iter().any(|a| a.trim().is_empty() || a.trim().contains(char::is_whitespace)) {
            return Err(invalid("aliases must be single words"));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from the default locations.
    pub fn load() -> Result<Self, ConfigError> {
        // Try local config first
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        // Try global config
        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        // Return defaults
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Self = toml::from_str(&content)?;

        for command in &config.commands {
            command.validate()?;
        }

        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Ok(())
    }

    /// Get the global configuration directory.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cmdmux"))
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            namespace_separator: DEFAULT_NAMESPACE_SEPARATOR,
            release_on_notify_failure: true,
            max_suggestions: 0,
            did_you_mean: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.manager.namespace_separator, ':');
        assert!(config.manager.release_on_notify_failure);
        assert_eq!(config.manager.max_suggestions, 0);
        assert!(config.commands.is_empty());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
[manager]
namespace_separator = "/"
release_on_notify_failure = false

[[commands]]
plugin = "greeter"
name = "hello"
aliases = ["hi", "hey"]
description = "Say hello"
response = "Hello, {args}!"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.manager.namespace_separator, '/');
        assert!(!config.manager.release_on_notify_failure);
        assert!(config.manager.did_you_mean);
        assert_eq!(config.commands.len(), 1);
        assert_eq!(config.commands[0].aliases, vec!["hi", "hey"]);
        assert!(!config.commands[0].fail);
    }

    #[test]
    fn test_load_from_file_rejects_invalid_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[[commands]]\nplugin = \"p\"\nname = \"two words\"\n").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCommand { .. }));
    }

    #[test]
    fn test_validate_rejects_plugin_with_whitespace() {
        let err = ScriptedCommandConfig::new("my plugin", "motd", "Welcome!").validate().unwrap_err();
        assert!(err.to_string().contains("plugin contains whitespace"));

        assert!(ScriptedCommandConfig::new(" greeter ", "motd", "Welcome!").validate().is_ok());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.commands.push(
            ScriptedCommandConfig::new("greeter", "hello", "Hello!").with_alias("hi"),
        );
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.commands.len(), 1);
        assert_eq!(loaded.commands[0].name, "hello");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load_from_file(Path::new("/nonexistent/cmdmux.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
