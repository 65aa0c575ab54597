//! # cmdmux
//!
//! Command multiplexing and dispatch for hosts that run many independent
//! command frameworks side by side.
//!
//! Each framework implements [`CommandRegistrar`] and claims aliases through
//! the [`CommandManager`]. Callers hand the manager a raw command line; it
//! resolves the first word to the owning registrar and forwards the call
//! with the command's primary alias, so callers never need to know which
//! framework implements what.
//!
//! ## Features
//!
//! - **Conflict-tolerant registration**: aliases are claimed in priority
//!   order, and taken names fall back to a namespaced `plugin:command` form
//! - **Canonical routing**: registrars only ever see primary aliases
//! - **Snapshot reads**: dispatch never blocks on, or observes half of, a
//!   concurrent registration
//! - **Suggestions, help and completion trees** aggregated across frameworks
//!
//! ## Quick Start
//!
//! ```
//! use cmdmux::{
//!     CommandManager, CommandResult, InvocationContext, PluginId, RegistrarId, SimpleCommand,
//!     SimpleRegistrar,
//! };
//!
//! let manager = CommandManager::new();
//! let registrar = SimpleRegistrar::new(RegistrarId::new("demo", "simple"));
//! registrar
//!     .register(
//!         &manager,
//!         &PluginId::new("demo"),
//!         SimpleCommand::new("echo", |_, args| Ok(CommandResult::success_with(args))).alias("say"),
//!     )
//!     .unwrap();
//!
//! let result = manager.dispatch(&InvocationContext::console(), "say hello");
//! assert_eq!(result.message.as_deref(), Some("hello"));
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::new_ret_no_self)]

pub mod core;
pub mod error;
pub mod registrar;

// Re-export commonly used types
pub use crate::core::{
    CommandManager, CommandMapping, CommandResult, CommandTree, CommandTreeNode, Config,
    InvocationContext, PluginId, RegistrarId, Registration, ResultKind, UnregisterReport,
};
pub use error::{
    CommandExecutionError, ConfigError, NotificationError, RegistrationError, RegistrationResult,
};
pub use registrar::{CommandRegistrar, ScriptedRegistrar, SimpleCommand, SimpleRegistrar};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "cmdmux";
