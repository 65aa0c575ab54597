//! A minimal command framework backed by closures.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::{
    CommandManager, CommandMapping, CommandResult, CommandTreeNode, InvocationContext, PluginId,
    Registration, RegistrarId, TreeScope,
};
use crate::error::{CommandExecutionError, NotificationError, RegistrationResult};

use super::CommandRegistrar;

/// Closure executing a simple command with its raw argument string.
pub type CommandHandler = Arc<
    dyn Fn(&InvocationContext, &str) -> Result<CommandResult, CommandExecutionError> + Send + Sync,
>;

/// A command served by [`SimpleRegistrar`].
#[derive(Clone)]
pub struct SimpleCommand {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    usage: Option<String>,
    permission: Option<String>,
    completions: Vec<String>,
    arguments: Vec<(String, String)>,
    handler: CommandHandler,
}

impl SimpleCommand {
    /// Create a command with its preferred name and handler.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&InvocationContext, &str) -> Result<CommandResult, CommandExecutionError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            usage: None,
            permission: None,
            completions: Vec::new(),
            arguments: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Add a secondary alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set the description shown by help.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the usage string shown by help, e.g. `<target> [reason]`.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Require a permission to run the command.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    /// Offer fixed completions for the first argument.
    pub fn completions<I, S>(mut self, completions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.completions.extend(completions.into_iter().map(Into::into));
        self
    }

    /// Declare a positional argument for the completion tree.
    pub fn argument(mut self, name: impl Into<String>, parser: impl Into<String>) -> Self {
        self.arguments.push((name.into(), parser.into()));
        self
    }

    /// Preferred name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn permitted(&self, cause: &InvocationContext) -> bool {
        self.permission.as_deref().map_or(true, |p| cause.has_permission(p))
    }

    fn tree_arguments(&self) -> Option<CommandTreeNode> {
        self.arguments.iter().rev().fold(None, |next, (name, parser)| {
            let mut node = CommandTreeNode::argument(name, parser);
            match next {
                Some(child) => {
                    node.add_child(child);
                }
                None => {
                    node.set_executable(true);
                }
            }
            Some(node)
        })
    }
}

impl fmt::Debug for SimpleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleCommand")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("permission", &self.permission)
            .finish()
    }
}

/// Registrar for closure-backed commands.
pub struct SimpleRegistrar {
    id: RegistrarId,
    /// Commands keyed by the primary alias the manager granted.
    commands: RwLock<HashMap<String, Arc<SimpleCommand>>>,
}

impl SimpleRegistrar {
    /// Create a registrar with the given identity.
    pub fn new(id: RegistrarId) -> Arc<Self> {
        Arc::new(Self { id, commands: RwLock::new(HashMap::new()) })
    }

    /// Register `command` with the manager on behalf of `plugin`.
    pub fn register(
        self: &Arc<Self>,
        manager: &CommandManager,
        plugin: &PluginId,
        command: SimpleCommand,
    ) -> RegistrationResult<Registration> {
        let command = Arc::new(command);
        manager.register_command_with(
            self.clone(),
            plugin,
            &command.name,
            command.aliases.as_slice(),
            |mapping| {
                self.commands
                    .write()
                    .insert(mapping.primary_alias().to_string(), Arc::clone(&command));
            },
        )
    }

    /// Number of commands this registrar currently serves.
    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    fn command(&self, primary: &str) -> Option<Arc<SimpleCommand>> {
        self.commands.read().get(primary).cloned()
    }
}

impl fmt::Debug for SimpleRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleRegistrar")
            .field("id", &self.id)
            .field("commands", &self.commands.read().len())
            .finish()
    }
}

impl CommandRegistrar for SimpleRegistrar {
    fn id(&self) -> RegistrarId {
        self.id.clone()
    }

    fn process(
        &self,
        cause: &InvocationContext,
        command: &str,
        arguments: &str,
    ) -> Result<CommandResult, CommandExecutionError> {
        let Some(cmd) = self.command(command) else {
            return Err(CommandExecutionError::new(format!("Command '{command}' is not available")));
        };

        if !cmd.permitted(cause) {
            return Err(CommandExecutionError::new(
                "You do not have permission to use this command",
            ));
        }

        (cmd.handler)(cause, arguments)
    }

    fn suggestions(&self, cause: &InvocationContext, command: &str, arguments: &str) -> Vec<String> {
        let Some(cmd) = self.command(command) else {
            return Vec::new();
        };
        if !cmd.permitted(cause) || arguments.contains(char::is_whitespace) {
            return Vec::new();
        }

        let prefix = arguments.to_lowercase();
        let mut matches: Vec<String> = cmd
            .completions
            .iter()
            .filter(|c| c.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        matches.sort();
        matches
    }

    fn help(&self, cause: &InvocationContext, command: &str) -> Option<String> {
        let cmd = self.command(command)?;
        if !cmd.permitted(cause) {
            return None;
        }

        let usage = match &cmd.usage {
            Some(usage) => format!("{command} {usage}"),
            None => command.to_string(),
        };
        Some(match &cmd.description {
            Some(description) => format!("{usage}\n  {description}"),
            None => usage,
        })
    }

    fn unregister(&self, mapping: &CommandMapping) -> Result<(), NotificationError> {
        self.commands.write().remove(mapping.primary_alias());
        Ok(())
    }

    fn complete_command_tree(&self, cause: &InvocationContext, scope: &mut TreeScope) {
        for alias in scope.aliases() {
            let Some(cmd) = self.command(&alias) else {
                continue;
            };
            if !cmd.permitted(cause) {
                scope.hide(&alias);
                continue;
            }

            if let Some(node) = scope.node_mut(&alias) {
                match cmd.tree_arguments() {
                    Some(arguments) => {
                        node.add_child(arguments);
                    }
                    None => {
                        node.set_executable(true);
                    }
                }
            }
        }
    }
}
