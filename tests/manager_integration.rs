//! Command Manager Integration Tests
//!
//! Tests routing, conflict resolution and unregistration across several
//! registrars and plugins.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use cmdmux::core::{CommandTreeNode, TreeScope};
use cmdmux::{
    CommandExecutionError, CommandManager, CommandMapping, CommandRegistrar, CommandResult,
    InvocationContext, NotificationError, PluginId, RegistrarId, RegistrationError, ResultKind,
};

/// Registrar that records everything the manager forwards to it.
struct Recorder {
    name: &'static str,
    processed: Mutex<Vec<(String, String, Option<String>)>>,
    unregistered: Mutex<Vec<String>>,
    tree_calls: Mutex<Vec<Vec<String>>>,
    help_calls: AtomicUsize,
}

impl Recorder {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            processed: Mutex::new(Vec::new()),
            unregistered: Mutex::new(Vec::new()),
            tree_calls: Mutex::new(Vec::new()),
            help_calls: AtomicUsize::new(0),
        })
    }
}

impl CommandRegistrar for Recorder {
    fn id(&self) -> RegistrarId {
        RegistrarId::new("test", self.name)
    }

    fn process(
        &self,
        cause: &InvocationContext,
        command: &str,
        arguments: &str,
    ) -> Result<CommandResult, CommandExecutionError> {
        self.processed.lock().push((
            command.to_string(),
            arguments.to_string(),
            cause.command_string().map(str::to_string),
        ));
        match arguments {
            "explode" => Err(CommandExecutionError::new("Boom: the command exploded")),
            _ => Ok(CommandResult::success_with(format!("{}:{}", self.name, command))),
        }
    }

    fn help(&self, _cause: &InvocationContext, command: &str) -> Option<String> {
        self.help_calls.fetch_add(1, Ordering::SeqCst);
        (command != "nohelp").then(|| format!("help for {command}"))
    }

    fn unregister(&self, mapping: &CommandMapping) -> Result<(), NotificationError> {
        self.unregistered.lock().push(mapping.primary_alias().to_string());
        Ok(())
    }

    fn complete_command_tree(&self, _cause: &InvocationContext, scope: &mut TreeScope) {
        let aliases = scope.aliases();
        self.tree_calls.lock().push(aliases.clone());
        for alias in aliases {
            if let Some(node) = scope.node_mut(&alias) {
                node.add_child(CommandTreeNode::argument("args", "string").executable());
            }
        }
    }
}

fn cause() -> InvocationContext {
    InvocationContext::console()
}

// ============================================================================
// Registration
// ============================================================================

mod registration {
    use super::*;

    #[test]
    fn test_priority_fallback() {
        let manager = CommandManager::new();
        let original = Recorder::new("original");
        let newcomer = Recorder::new("newcomer");

        manager.register_alias(original, &PluginId::new("essentials"), &["tp"]).unwrap();
        let registration = manager
            .register_alias(newcomer, &PluginId::new("plugin"), &["tp", "plugin:tp"])
            .unwrap();

        assert_eq!(registration.primary_alias(), "plugin:tp");
        assert_eq!(registration.skipped, vec!["tp".to_string()]);
        assert!(!registration.is_complete());

        let result = manager.dispatch(&cause(), "tp");
        assert_eq!(result.message.as_deref(), Some("original:tp"));
        let result = manager.dispatch(&cause(), "plugin:tp");
        assert_eq!(result.message.as_deref(), Some("newcomer:plugin:tp"));
    }

    #[test]
    fn test_register_command_builds_fallbacks() {
        let manager = CommandManager::new();
        manager
            .register_command(Recorder::new("a"), &PluginId::new("alpha"), "Home", &["h"])
            .unwrap();
        let registration = manager
            .register_command(Recorder::new("b"), &PluginId::new("beta"), "home", &["h"])
            .unwrap();

        assert_eq!(registration.primary_alias(), "beta:home");
        let aliases: BTreeSet<String> = registration.mapping.aliases().clone();
        assert_eq!(
            aliases,
            ["beta:home", "beta:h"].iter().map(|s| (*s).to_string()).collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn test_all_candidates_taken() {
        let manager = CommandManager::new();
        manager
            .register_alias(Recorder::new("a"), &PluginId::new("demo"), &["tp", "demo:tp"])
            .unwrap();

        let err = manager
            .register_alias(Recorder::new("b"), &PluginId::new("demo"), &["tp", "demo:tp"])
            .unwrap_err();
        assert!(matches!(err, RegistrationError::NoAliasAvailable { .. }));
        assert_eq!(manager.mappings().len(), 1);
    }

    #[test]
    fn test_invalid_alias_spec() {
        let manager = CommandManager::new();
        let plugin = PluginId::new("demo");

        for bad in [vec!["Tp"], vec!["tp", "tp"], vec!["two words"], vec![""]] {
            let err = manager.register_alias(Recorder::new("a"), &plugin, bad.as_slice()).unwrap_err();
            assert!(matches!(err, RegistrationError::InvalidAliasSpec(_)), "{bad:?}");
        }
        assert!(manager.aliases().is_empty());
    }

    #[test]
    fn test_alias_uniqueness_across_registrations() {
        let manager = CommandManager::new();
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            let plugin = PluginId::new(format!("p{i}"));
            manager
                .register_command(Recorder::new(name), &plugin, "shared", &["s", "common"])
                .unwrap();
        }

        let mut seen = BTreeSet::new();
        for mapping in manager.mappings() {
            assert!(mapping.contains_alias(mapping.primary_alias()));
            for alias in mapping.aliases() {
                assert!(seen.insert(alias.clone()), "alias {alias} owned twice");
            }
        }
        assert_eq!(seen.len(), manager.aliases().len());
    }
}

// ============================================================================
// Dispatch
// ============================================================================

mod dispatch {
    use super::*;

    #[test]
    fn test_canonical_forwarding() {
        let manager = CommandManager::new();
        let recorder = Recorder::new("r");
        manager
            .register_alias(recorder.clone(), &PluginId::new("demo"), &["tp", "teleport"])
            .unwrap();

        manager.dispatch(&cause(), "teleport foo bar");
        let processed = recorder.processed.lock();
        assert_eq!(processed[0].0, "tp");
        assert_eq!(processed[0].1, "foo bar");
    }

    #[test]
    fn test_context_passes_through() {
        let manager = CommandManager::new();
        let recorder = Recorder::new("r");
        manager.register_alias(recorder.clone(), &PluginId::new("demo"), &["tp"]).unwrap();

        let cause = InvocationContext::new("alice").with_command_string("/TP bob");
        manager.dispatch(&cause, "TP bob");

        assert_eq!(recorder.processed.lock()[0].2.as_deref(), Some("/TP bob"));
    }

    #[test]
    fn test_not_found_is_a_result() {
        let manager = CommandManager::new();
        let result = manager.dispatch(&cause(), "missing arg");
        assert_eq!(result.kind, ResultKind::NotFound);
    }

    #[test]
    fn test_execution_error_message_is_verbatim() {
        let manager = CommandManager::new();
        manager.register_alias(Recorder::new("r"), &PluginId::new("demo"), &["tp"]).unwrap();

        let result = manager.dispatch(&cause(), "tp explode");
        assert_eq!(result.kind, ResultKind::Failure);
        assert_eq!(result.message.as_deref(), Some("Boom: the command exploded"));
    }

    #[test]
    fn test_help_forwards_and_degrades() {
        let manager = CommandManager::new();
        let recorder = Recorder::new("r");
        manager
            .register_alias(recorder.clone(), &PluginId::new("demo"), &["tp", "teleport"])
            .unwrap();
        manager.register_alias(recorder.clone(), &PluginId::new("demo"), &["nohelp"]).unwrap();

        assert_eq!(manager.help(&cause(), "teleport extra").as_deref(), Some("help for tp"));
        assert_eq!(manager.help(&cause(), "nohelp"), None);
        assert_eq!(manager.help(&cause(), "unknown"), None);
        assert_eq!(recorder.help_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_top_level_suggestions() {
        let manager = CommandManager::new();
        let plugin = PluginId::new("demo");
        manager
            .register_alias(Recorder::new("r"), &plugin, &["tp", "teleport", "tphere"])
            .unwrap();
        manager.register_alias(Recorder::new("r"), &plugin, &["time"]).unwrap();

        let suggestions = manager.suggest(&cause(), "t");
        assert_eq!(suggestions, vec!["time".to_string(), "tp".to_string()]);

        let suggestions = manager.suggest(&cause(), "tph");
        assert_eq!(suggestions, vec!["tphere".to_string()]);
    }
}

// ============================================================================
// Unregistration
// ============================================================================

mod unregistration {
    use super::*;

    #[test]
    fn test_unregister_then_dispatch() {
        let manager = CommandManager::new();
        let first = Recorder::new("first");
        let registration = manager
            .register_alias(first.clone(), &PluginId::new("demo"), &["tp", "teleport"])
            .unwrap();

        let report = manager.unregister(&registration.mapping);
        assert_eq!(report.released, vec!["teleport".to_string(), "tp".to_string()]);
        assert_eq!(*first.unregistered.lock(), vec!["tp".to_string()]);
        assert!(manager.dispatch(&cause(), "tp").is_not_found());
        assert!(manager.dispatch(&cause(), "teleport").is_not_found());

        let second = Recorder::new("second");
        manager.register_alias(second, &PluginId::new("other"), &["tp"]).unwrap();
        let result = manager.dispatch(&cause(), "tp");
        assert_eq!(result.message.as_deref(), Some("second:tp"));
    }

    #[test]
    fn test_unregister_all_is_scoped() {
        let manager = CommandManager::new();
        let a = Recorder::new("a");
        let b = Recorder::new("b");
        let plugin_a = PluginId::new("plugin-a");
        let plugin_b = PluginId::new("plugin-b");

        manager.register_alias(a.clone(), &plugin_a, &["one", "1"]).unwrap();
        manager.register_alias(a.clone(), &plugin_a, &["two"]).unwrap();
        manager.register_alias(b.clone(), &plugin_b, &["three"]).unwrap();

        let report = manager.unregister_all(&plugin_a);
        assert_eq!(
            report.released,
            vec!["1".to_string(), "one".to_string(), "two".to_string()]
        );
        assert_eq!(report.removed.len(), 2);
        assert!(report.failures.is_empty());

        assert_eq!(a.unregistered.lock().len(), 2);
        assert!(b.unregistered.lock().is_empty());
        assert!(manager.is_registered("three"));
        assert!(manager.mappings_for_plugin(&plugin_a).is_empty());
    }
}

// ============================================================================
// Command Tree
// ============================================================================

mod command_tree {
    use super::*;

    #[test]
    fn test_each_registrar_asked_once() {
        let manager = CommandManager::new();
        let a = Recorder::new("a");
        let b = Recorder::new("b");
        let plugin = PluginId::new("demo");

        manager.register_alias(a.clone(), &plugin, &["zeta", "z"]).unwrap();
        manager.register_alias(a.clone(), &plugin, &["alpha"]).unwrap();
        manager.register_alias(b.clone(), &plugin, &["mid"]).unwrap();

        let tree = manager.build_command_tree(&cause());

        assert_eq!(*a.tree_calls.lock(), vec![vec!["alpha".to_string(), "zeta".to_string()]]);
        assert_eq!(b.tree_calls.lock().len(), 1);

        let names: Vec<&str> = tree.commands().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert!(tree.get("z").is_none());
        assert!(tree.get("zeta").unwrap().child("args").unwrap().is_executable());
    }

    #[test]
    fn test_instances_sharing_an_id_are_asked_separately() {
        let manager = CommandManager::new();
        let first = Recorder::new("same");
        let second = Recorder::new("same");
        let plugin = PluginId::new("demo");

        manager.register_alias(first.clone(), &plugin, &["motd"]).unwrap();
        manager.register_alias(second.clone(), &plugin, &["shutdown"]).unwrap();
        manager.register_alias(first.clone(), &plugin, &["rules"]).unwrap();

        let tree = manager.build_command_tree(&cause());

        assert_eq!(*first.tree_calls.lock(), vec![vec!["motd".to_string(), "rules".to_string()]]);
        assert_eq!(*second.tree_calls.lock(), vec![vec!["shutdown".to_string()]]);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_empty_manager_builds_empty_tree() {
        let manager = CommandManager::new();
        assert!(manager.build_command_tree(&cause()).is_empty());
    }
}
