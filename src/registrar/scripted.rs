//! Commands declared in the configuration file.
//!
//! Each `[[commands]]` entry becomes one mapping whose response is a small
//! template rendered against the invocation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::{
    CommandManager, CommandMapping, CommandResult, CommandTreeNode, InvocationContext, PluginId,
    RegistrarId, ScriptedCommandConfig, TreeScope,
};
use crate::error::{CommandExecutionError, ConfigError, NotificationError, RegistrationError};

use super::CommandRegistrar;

/// Registrar serving [`ScriptedCommandConfig`] entries.
#[derive(Debug)]
pub struct ScriptedRegistrar {
    commands: RwLock<HashMap<String, ScriptedCommandConfig>>,
}

impl ScriptedRegistrar {
    /// Identity shared by every scripted registrar.
    pub fn registrar_id() -> RegistrarId {
        RegistrarId::new("cmdmux", "scripted")
    }

    /// Create an empty registrar.
    pub fn new() -> Arc<Self> {
        Arc::new(Self { commands: RwLock::new(HashMap::new()) })
    }

    /// Validate and register every entry.
    ///
    /// Stops at the first entry that cannot be registered; entries
    /// registered before it stay live.
    pub fn install(
        self: &Arc<Self>,
        manager: &CommandManager,
        commands: &[ScriptedCommandConfig],
    ) -> Result<Vec<String>, ConfigError> {
        let mut primaries = Vec::with_capacity(commands.len());

        for command in commands {
            command.validate()?;
            let plugin = PluginId::new(&command.plugin);
            let registration = manager
                .register_command_with(
                    self.clone(),
                    &plugin,
                    &command.name,
                    command.aliases.as_slice(),
                    |mapping| {
                        self.commands
                            .write()
                            .insert(mapping.primary_alias().to_string(), command.clone());
                    },
                )
                .map_err(|err: RegistrationError| ConfigError::InvalidCommand {
                    name: command.name.clone(),
                    reason: err.to_string(),
                })?;

            primaries.push(registration.primary_alias().to_string());
        }

        Ok(primaries)
    }

    fn command(&self, primary: &str) -> Option<ScriptedCommandConfig> {
        self.commands.read().get(primary).cloned()
    }
}

fn permitted(command: &ScriptedCommandConfig, cause: &InvocationContext) -> bool {
    command.permission.as_deref().map_or(true, |p| cause.has_permission(p))
}

/// Expand `{args}`, `{alias}` and `{subject}` in a response template.
fn render(template: &str, alias: &str, arguments: &str, cause: &InvocationContext) -> String {
    template
        .replace("{args}", arguments.trim())
        .replace("{alias}", alias)
        .replace("{subject}", cause.subject())
}

impl CommandRegistrar for ScriptedRegistrar {
    fn id(&self) -> RegistrarId {
        Self::registrar_id()
    }

    fn process(
        &self,
        cause: &InvocationContext,
        command: &str,
        arguments: &str,
    ) -> Result<CommandResult, CommandExecutionError> {
        let Some(entry) = self.command(command) else {
            return Err(CommandExecutionError::new(format!("Command '{command}' is not available")));
        };
        if !permitted(&entry, cause) {
            return Err(CommandExecutionError::new(
                "You do not have permission to use this command",
            ));
        }

        let message = render(&entry.response, command, arguments, cause);
        if entry.fail {
            return Err(CommandExecutionError::new(message));
        }
        if message.is_empty() {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::success_with(message))
        }
    }

    fn help(&self, cause: &InvocationContext, command: &str) -> Option<String> {
        let entry = self.command(command)?;
        if !permitted(&entry, cause) {
            return None;
        }
        entry.description.map(|description| format!("{command}\n  {description}"))
    }

    fn unregister(&self, mapping: &CommandMapping) -> Result<(), NotificationError> {
        self.commands.write().remove(mapping.primary_alias());
        Ok(())
    }

    fn complete_command_tree(&self, cause: &InvocationContext, scope: &mut TreeScope) {
        for alias in scope.aliases() {
            let Some(entry) = self.command(&alias) else {
                continue;
            };
            if !permitted(&entry, cause) {
                scope.hide(&alias);
                continue;
            }

            if let Some(node) = scope.node_mut(&alias) {
                node.set_executable(true);
                if entry.response.contains("{args}") {
                    node.add_child(CommandTreeNode::argument("args", "greedy_string").executable());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands() -> Vec<ScriptedCommandConfig> {
        vec![
            ScriptedCommandConfig::new("greeter", "hello", "Hello {args}, from {subject} via {alias}")
                .with_alias("hi")
                .with_description("Say hello"),
            ScriptedCommandConfig::new("greeter", "motd", "Welcome!"),
            ScriptedCommandConfig::new("admin", "shutdown", "Shutting down")
                .with_permission("admin.shutdown"),
        ]
    }

    fn setup() -> CommandManager {
        let manager = CommandManager::new();
        ScriptedRegistrar::new().install(&manager, &commands()).unwrap();
        manager
    }

    #[test]
    fn test_render_template() {
        let manager = setup();
        let cause = InvocationContext::new("alice").with_permission("*");
        let result = manager.dispatch(&cause, "hi  bob ");
        assert_eq!(result.message.as_deref(), Some("Hello bob, from alice via hello"));
    }

    #[test]
    fn test_fail_flag_reports_failure() {
        let manager = CommandManager::new();
        let mut entry = ScriptedCommandConfig::new("demo", "broken", "Nope: {args}");
        entry.fail = true;
        ScriptedRegistrar::new().install(&manager, &[entry]).unwrap();

        let result = manager.dispatch(&InvocationContext::console(), "broken now");
        assert!(result.is_failure());
        assert_eq!(result.message.as_deref(), Some("Nope: now"));
    }

    #[test]
    fn test_permission_hides_from_tree() {
        let manager = setup();
        let tree = manager.build_command_tree(&InvocationContext::new("guest"));

        assert!(tree.get("shutdown").is_none());
        assert!(tree.get("motd").unwrap().is_executable());
        assert!(tree.get("hello").unwrap().child("args").is_some());
    }

    #[test]
    fn test_help_from_description() {
        let manager = setup();
        let cause = InvocationContext::console();
        assert_eq!(manager.help(&cause, "hi").as_deref(), Some("hello\n  Say hello"));
        assert_eq!(manager.help(&cause, "motd"), None);
    }

    #[test]
    fn test_install_rejects_invalid_entry() {
        let manager = CommandManager::new();
        let entry = ScriptedCommandConfig::new("", "oops", "");
        let err = ScriptedRegistrar::new().install(&manager, &[entry]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCommand { .. }));
    }

    #[test]
    fn test_install_rejects_plugin_with_whitespace() {
        let manager = CommandManager::new();
        let entry = ScriptedCommandConfig::new("my plugin", "motd", "Welcome!");
        let err = ScriptedRegistrar::new().install(&manager, &[entry]).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidCommand { .. }));
        assert!(manager.aliases().is_empty());
    }

    #[test]
    fn test_separate_instances_keep_their_own_permissions_in_tree() {
        let manager = CommandManager::new();
        ScriptedRegistrar::new()
            .install(&manager, &[ScriptedCommandConfig::new("p1", "motd", "Welcome!")])
            .unwrap();
        ScriptedRegistrar::new()
            .install(
                &manager,
                &[ScriptedCommandConfig::new("p2", "shutdown", "Shutting down")
                    .with_permission("admin.shutdown")],
            )
            .unwrap();

        let tree = manager.build_command_tree(&InvocationContext::new("guest"));
        assert!(tree.get("shutdown").is_none());
        assert!(tree.get("motd").unwrap().is_executable());

        let tree = manager.build_command_tree(&InvocationContext::new("admin").with_permission("admin.*"));
        assert!(tree.get("shutdown").unwrap().is_executable());
    }
}
