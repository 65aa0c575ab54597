//! The command manager: single point of truth for command routing.
//!
//! Readers (dispatch, suggestion, help, tree building) take a snapshot of
//! the alias table and work against it for the whole call. Writers
//! (registration, unregistration) are serialized by a separate lock, build
//! a modified copy of the table, and publish it as the next snapshot.
//!
//! An in-flight dispatch therefore finishes against the mapping it
//! resolved, while any call that starts after an unregistration has
//! returned can no longer see the released aliases.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nucleo::pattern::{CaseMatching, Normalization, Pattern};
use nucleo::{Config as MatcherConfig, Matcher};
use parking_lot::{Mutex, RwLock};

use crate::error::{NotificationError, RegistrationResult};
use crate::registrar::CommandRegistrar;

use super::alias::{candidate_aliases, normalize, validate_candidates, AliasTable};
use super::cause::InvocationContext;
use super::config::ManagerConfig;
use super::mapping::{CommandMapping, MappingId, PluginId, RegistrarId};
use super::result::CommandResult;
use super::tree::{CommandTree, TreeScope};

/// Maximum number of aliases listed in a "did you mean" hint.
const DID_YOU_MEAN_LIMIT: usize = 3;

/// Groups mappings by registrar instance, ordered by id.
type RegistrarKey = (RegistrarId, usize);

/// Address of the registrar instance behind a trait object.
fn registrar_addr(registrar: &Arc<dyn CommandRegistrar>) -> usize {
    Arc::as_ptr(registrar).cast::<()>() as usize
}

/// A granted registration.
#[derive(Debug, Clone)]
pub struct Registration {
    /// The mapping that now routes to the registrar.
    pub mapping: Arc<CommandMapping>,
    /// Candidates that were already claimed by other mappings.
    pub skipped: Vec<String>,
}

impl Registration {
    /// The primary alias the registrar must use from now on.
    pub fn primary_alias(&self) -> &str {
        self.mapping.primary_alias()
    }

    /// Whether every candidate was granted.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// A registrar cleanup failure observed during unregistration.
#[derive(Debug, Clone)]
pub struct NotificationFailure {
    /// Primary alias of the affected mapping.
    pub primary_alias: String,
    /// Registrar that failed.
    pub registrar: RegistrarId,
    /// The reported error.
    pub error: NotificationError,
}

/// Outcome of an unregistration request.
#[derive(Debug, Clone, Default)]
pub struct UnregisterReport {
    /// Mappings whose aliases were released.
    pub removed: Vec<Arc<CommandMapping>>,
    /// Aliases released, sorted.
    pub released: Vec<String>,
    /// Mappings left live because cleanup failed and the policy forbids release.
    pub retained: Vec<Arc<CommandMapping>>,
    /// Cleanup failures, whether or not the aliases were released.
    pub failures: Vec<NotificationFailure>,
}

impl UnregisterReport {
    /// Whether nothing was released.
    pub fn is_empty(&self) -> bool {
        self.released.is_empty()
    }

    fn merge(&mut self, other: Self) {
        self.removed.extend(other.removed);
        self.released.extend(other.released);
        self.retained.extend(other.retained);
        self.failures.extend(other.failures);
        self.released.sort();
    }
}

/// Routes command lines to the registrars that own their aliases.
pub struct CommandManager {
    /// Current alias table snapshot.
    table: RwLock<Arc<AliasTable>>,
    /// Serializes every writer, including the registrar notification step.
    writer: Mutex<()>,
    /// Source of mapping ids.
    next_id: AtomicU64,
    /// Manager settings.
    config: ManagerConfig,
}

impl std::fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandManager")
            .field("aliases", &self.snapshot().len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandManager {
    /// Create a manager with an empty alias table.
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Create a manager with custom settings.
    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            table: RwLock::new(Arc::new(AliasTable::new())),
            writer: Mutex::new(()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Manager settings.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The current alias table snapshot.
    pub fn snapshot(&self) -> Arc<AliasTable> {
        Arc::clone(&self.table.read())
    }

    fn publish(&self, table: AliasTable) {
        *self.table.write() = Arc::new(table);
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Claim aliases for `registrar` on behalf of `plugin`.
    ///
    /// Candidates are tried in order; the first free one becomes the
    /// primary alias and taken ones are skipped. Candidates must already be
    /// lower case and unique.
    pub fn register_alias<S: AsRef<str>>(
        &self,
        registrar: Arc<dyn CommandRegistrar>,
        plugin: &PluginId,
        candidates: &[S],
    ) -> RegistrationResult<Registration> {
        self.register_alias_with(registrar, plugin, candidates, |_| {})
    }

    /// Like [`register_alias`](Self::register_alias), running `on_reserved`
    /// before the mapping becomes visible to dispatch.
    ///
    /// Registrars use the hook to record the granted primary alias, so a
    /// concurrent dispatch never reaches them before they know the
    /// command. The hook runs under the registration lock and must not
    /// call back into the manager's registration methods.
    pub fn register_alias_with<S, F>(
        &self,
        registrar: Arc<dyn CommandRegistrar>,
        plugin: &PluginId,
        candidates: &[S],
        on_reserved: F,
    ) -> RegistrationResult<Registration>
    where
        S: AsRef<str>,
        F: FnOnce(&CommandMapping),
    {
        let candidates: Vec<String> = candidates.iter().map(|c| c.as_ref().to_string()).collect();
        validate_candidates(&candidates)?;

        let _guard = self.writer.lock();
        let mut table = AliasTable::clone(&self.snapshot());
        let id = MappingId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let reservation = table.reserve(id, &candidates, registrar, plugin.clone())?;
        on_reserved(reservation.mapping.as_ref());
        self.publish(table);

        let mapping = reservation.mapping;
        if !reservation.skipped.is_empty() {
            tracing::warn!(
                plugin = %plugin,
                primary = mapping.primary_alias(),
                skipped = ?reservation.skipped,
                "Aliases already claimed, skipped"
            );
        }
        tracing::info!(
            plugin = %plugin,
            registrar = %mapping.registrar_id(),
            primary = mapping.primary_alias(),
            aliases = ?reservation.accepted,
            "Registered command"
        );

        Ok(Registration { mapping, skipped: reservation.skipped })
    }

    /// Register a command by name, adding namespaced fallback aliases.
    ///
    /// Names are normalized first, so callers may pass them as written.
    pub fn register_command<S: AsRef<str>>(
        &self,
        registrar: Arc<dyn CommandRegistrar>,
        plugin: &PluginId,
        primary: &str,
        secondary: &[S],
    ) -> RegistrationResult<Registration> {
        self.register_command_with(registrar, plugin, primary, secondary, |_| {})
    }

    /// Like [`register_command`](Self::register_command), with the hook of
    /// [`register_alias_with`](Self::register_alias_with).
    pub fn register_command_with<S, F>(
        &self,
        registrar: Arc<dyn CommandRegistrar>,
        plugin: &PluginId,
        primary: &str,
        secondary: &[S],
        on_reserved: F,
    ) -> RegistrationResult<Registration>
    where
        S: AsRef<str>,
        F: FnOnce(&CommandMapping),
    {
        let candidates =
            candidate_aliases(plugin, primary, secondary, self.config.namespace_separator);
        self.register_alias_with(registrar, plugin, candidates.as_slice(), on_reserved)
    }

    // ------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------

    /// Run a command line.
    ///
    /// Unknown aliases produce a `NotFound` result. Registrar failures are
    /// returned as `Failure` results with their message intact.
    pub fn dispatch(&self, cause: &InvocationContext, raw_line: &str) -> CommandResult {
        let (token, remainder) = split_line(raw_line);
        let snapshot = self.snapshot();

        let Some(mapping) = snapshot.lookup(token) else {
            tracing::debug!(alias = token, "No command for alias");
            return self.not_found(&snapshot, token);
        };
        drop(snapshot);

        tracing::debug!(
            alias = token,
            primary = mapping.primary_alias(),
            registrar = %mapping.registrar_id(),
            "Dispatching command"
        );

        match mapping.registrar().process(cause, mapping.primary_alias(), remainder) {
            Ok(result) => result,
            Err(err) => {
                tracing::debug!(
                    primary = mapping.primary_alias(),
                    error = %err,
                    "Command failed"
                );
                CommandResult::from(err)
            }
        }
    }

    fn not_found(&self, table: &AliasTable, token: &str) -> CommandResult {
        let token = normalize(token);
        if token.is_empty() {
            return CommandResult::not_found();
        }

        let result = CommandResult::not_found();
        if !self.config.did_you_mean {
            return result.with_message(format!("Unknown command: {token}"));
        }

        let closest = closest_aliases(table, &token, DID_YOU_MEAN_LIMIT);
        if closest.is_empty() {
            result.with_message(format!("Unknown command: {token}"))
        } else {
            result.with_message(format!(
                "Unknown command: {token}. Did you mean: {}?",
                closest.join(", ")
            ))
        }
    }

    /// Completions for a partial command line.
    ///
    /// While the first word is incomplete, returns matching aliases with
    /// one entry per command. Afterwards the owning registrar decides.
    pub fn suggest(&self, cause: &InvocationContext, raw_line: &str) -> Vec<String> {
        let line = raw_line.trim_start();

        match line.split_once(char::is_whitespace) {
            None => self.suggest_aliases(&normalize(line)),
            Some((token, remainder)) => {
                let Some(mapping) = self.snapshot().lookup(token) else {
                    return Vec::new();
                };
                mapping.registrar().suggestions(cause, mapping.primary_alias(), remainder.trim_start())
            }
        }
    }

    fn suggest_aliases(&self, partial: &str) -> Vec<String> {
        let snapshot = self.snapshot();

        let mut suggestions: Vec<String> = snapshot
            .mappings()
            .iter()
            .filter_map(|mapping| {
                // An exact synonym wins, then the primary alias, then the
                // first matching synonym.
                if mapping.contains_alias(partial) {
                    return Some(partial.to_string());
                }
                if mapping.primary_alias().starts_with(partial) {
                    return Some(mapping.primary_alias().to_string());
                }
                mapping.aliases().iter().find(|a| a.starts_with(partial)).cloned()
            })
            .collect();

        suggestions.sort();
        suggestions.dedup();
        if self.config.max_suggestions > 0 {
            suggestions.truncate(self.config.max_suggestions);
        }
        suggestions
    }

    /// Help text for the command named by the first word of `raw_line`.
    pub fn help(&self, cause: &InvocationContext, raw_line: &str) -> Option<String> {
        let (token, _) = split_line(raw_line);
        let mapping = self.snapshot().lookup(token)?;
        mapping.registrar().help(cause, mapping.primary_alias())
    }

    /// Build the client completion tree.
    ///
    /// Each registrar instance is asked once, with every primary alias it
    /// owns. Instances sharing a `RegistrarId` are still asked separately.
    pub fn build_command_tree(&self, cause: &InvocationContext) -> CommandTree {
        let snapshot = self.snapshot();

        let mut by_registrar: BTreeMap<RegistrarKey, (Arc<dyn CommandRegistrar>, Vec<String>)> =
            BTreeMap::new();
        for mapping in snapshot.mappings() {
            let key = (mapping.registrar_id().clone(), registrar_addr(mapping.registrar()));
            by_registrar
                .entry(key)
                .or_insert_with(|| (Arc::clone(mapping.registrar()), Vec::new()))
                .1
                .push(mapping.primary_alias().to_string());
        }

        let mut tree = CommandTree::new();
        for ((id, _), (registrar, aliases)) in by_registrar {
            tracing::debug!(registrar = %id, commands = aliases.len(), "Completing command tree");
            let mut scope = TreeScope::new(&aliases);
            registrar.complete_command_tree(cause, &mut scope);
            tree.extend(scope.into_nodes());
        }
        tree
    }

    // ------------------------------------------------------------------
    // Unregistration
    // ------------------------------------------------------------------

    /// Remove one mapping.
    ///
    /// The registrar is notified first; the aliases are released after.
    /// Unregistering a mapping that is no longer live does nothing.
    pub fn unregister(&self, mapping: &CommandMapping) -> UnregisterReport {
        let _guard = self.writer.lock();
        self.unregister_locked(mapping)
    }

    /// Remove every mapping registered by `plugin`.
    pub fn unregister_all(&self, plugin: &PluginId) -> UnregisterReport {
        let _guard = self.writer.lock();

        let mut report = UnregisterReport::default();
        for mapping in self.snapshot().mappings_owned_by(plugin) {
            report.merge(self.unregister_locked(&mapping));
        }

        tracing::info!(
            plugin = %plugin,
            released = report.released.len(),
            retained = report.retained.len(),
            "Unregistered plugin commands"
        );
        report
    }

    /// Caller must hold the writer lock.
    fn unregister_locked(&self, mapping: &CommandMapping) -> UnregisterReport {
        let mut report = UnregisterReport::default();

        if !self.snapshot().contains_mapping(mapping.id()) {
            tracing::debug!(primary = mapping.primary_alias(), "Mapping already unregistered");
            return report;
        }

        if let Err(error) = mapping.registrar().unregister(mapping) {
            tracing::warn!(
                primary = mapping.primary_alias(),
                registrar = %mapping.registrar_id(),
                error = %error,
                release = self.config.release_on_notify_failure,
                "Registrar cleanup failed"
            );
            report.failures.push(NotificationFailure {
                primary_alias: mapping.primary_alias().to_string(),
                registrar: mapping.registrar_id().clone(),
                error,
            });

            if !self.config.release_on_notify_failure {
                if let Some(live) = self.snapshot().lookup(mapping.primary_alias()) {
                    report.retained.push(live);
                }
                return report;
            }
        }

        let mut table = AliasTable::clone(&self.snapshot());
        if let Some(live) = table.lookup(mapping.primary_alias()) {
            report.removed.push(live);
        }
        report.released = table.release(mapping);
        self.publish(table);

        tracing::info!(
            primary = mapping.primary_alias(),
            plugin = %mapping.plugin(),
            released = ?report.released,
            "Unregistered command"
        );
        report
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The mapping owning `alias`, if any.
    pub fn mapping(&self, alias: &str) -> Option<Arc<CommandMapping>> {
        self.snapshot().lookup(alias)
    }

    /// Whether `alias` routes anywhere.
    pub fn is_registered(&self, alias: &str) -> bool {
        self.mapping(alias).is_some()
    }

    /// Every live mapping, ordered by primary alias.
    pub fn mappings(&self) -> Vec<Arc<CommandMapping>> {
        self.snapshot().mappings()
    }

    /// Mappings registered by `plugin`.
    pub fn mappings_for_plugin(&self, plugin: &PluginId) -> Vec<Arc<CommandMapping>> {
        self.snapshot().mappings_owned_by(plugin)
    }

    /// Every live alias, sorted.
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.snapshot().aliases().cloned().collect();
        aliases.sort();
        aliases
    }

    /// Primary aliases of every live mapping, sorted.
    pub fn primary_aliases(&self) -> Vec<String> {
        self.mappings().iter().map(|m| m.primary_alias().to_string()).collect()
    }

    /// Registrars owning at least one live mapping.
    pub fn registrars(&self) -> Vec<RegistrarId> {
        let mut ids: Vec<RegistrarId> =
            self.mappings().iter().map(|m| m.registrar_id().clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Split a raw line into its alias token and the remainder after the
/// whitespace run that follows it.
fn split_line(raw_line: &str) -> (&str, &str) {
    let line = raw_line.trim_start();
    match line.split_once(char::is_whitespace) {
        Some((token, remainder)) => (token, remainder.trim_start()),
        None => (line, ""),
    }
}

/// Aliases closest to `token` by fuzzy score, best first.
fn closest_aliases(table: &AliasTable, token: &str, limit: usize) -> Vec<String> {
    let mut matcher = Matcher::new(MatcherConfig::DEFAULT);
    let pattern = Pattern::parse(token, CaseMatching::Ignore, Normalization::Smart);

    let mut matches = pattern.match_list(table.aliases(), &mut matcher);
    matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    matches.into_iter().take(limit).map(|(alias, _)| alias.clone()).collect()
}
