//! Core types and functionality for cmdmux.
//!
//! This module contains the fundamental data structures used throughout
//! the crate: the alias table, command mappings, invocation context,
//! results, the completion tree, configuration, and the manager itself.

mod alias;
mod cause;
mod config;
mod manager;
mod mapping;
mod result;
mod tree;

pub use alias::{
    candidate_aliases, normalize, validate_candidates, AliasTable, Reservation,
    DEFAULT_NAMESPACE_SEPARATOR,
};
pub use cause::{InvocationContext, COMMAND_STRING, CONSOLE_SUBJECT, ORIGIN};
pub use config::{Config, ManagerConfig, ScriptedCommandConfig, LOCAL_CONFIG_FILE};
pub use manager::{CommandManager, NotificationFailure, Registration, UnregisterReport};
pub use mapping::{CommandMapping, MappingId, PluginId, RegistrarId};
pub use result::{CommandResult, ResultKind};
pub use tree::{CommandTree, CommandTreeNode, NodeKind, TreeScope};
