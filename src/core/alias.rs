//! Alias normalization and the alias table.
//!
//! The table maps every normalized alias to the single [`CommandMapping`]
//! that owns it. It is a plain value: the manager clones it, mutates the
//! clone, and publishes the result as a new snapshot.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::error::{RegistrationError, RegistrationResult};
use crate::registrar::CommandRegistrar;

use super::mapping::{CommandMapping, MappingId, PluginId};

/// Default separator between a plugin id and a command name.
pub const DEFAULT_NAMESPACE_SEPARATOR: char = ':';

/// Case-normalize an alias as typed by a caller.
pub fn normalize(alias: &str) -> String {
    alias.trim().to_lowercase()
}

/// Check that a candidate list is usable as-is.
///
/// Candidates must be non-empty, already lower case, free of whitespace,
/// and unique.
pub fn validate_candidates(candidates: &[String]) -> RegistrationResult<()> {
    if candidates.is_empty() {
        return Err(RegistrationError::InvalidAliasSpec("no candidate aliases".to_string()));
    }

    let mut seen = HashSet::with_capacity(candidates.len());
    for candidate in candidates {
        if candidate.is_empty() {
            return Err(RegistrationError::InvalidAliasSpec("empty alias".to_string()));
        }
        if candidate.chars().any(char::is_whitespace) {
            return Err(RegistrationError::InvalidAliasSpec(format!(
                "alias '{candidate}' contains whitespace"
            )));
        }
        if *candidate != candidate.to_lowercase() {
            return Err(RegistrationError::InvalidAliasSpec(format!(
                "alias '{candidate}' is not lower case"
            )));
        }
        if !seen.insert(candidate.as_str()) {
            return Err(RegistrationError::InvalidAliasSpec(format!(
                "alias '{candidate}' is listed twice"
            )));
        }
    }

    Ok(())
}

/// Build a priority-ordered candidate list with namespaced fallbacks.
///
/// Produces `[primary, secondary..., plugin:primary, plugin:secondary...]`,
/// normalized and deduplicated, so at least one candidate is unique to
/// the plugin.
pub fn candidate_aliases<S: AsRef<str>>(
    plugin: &PluginId,
    primary: &str,
    secondary: &[S],
    separator: char,
) -> Vec<String> {
    let bare: Vec<String> = std::iter::once(primary)
        .chain(secondary.iter().map(AsRef::as_ref))
        .map(normalize)
        .filter(|a| !a.is_empty())
        .collect();

    let namespaced = bare.iter().map(|a| {
        let prefix = format!("{}{}", plugin.as_str(), separator);
        if a.starts_with(&prefix) {
            a.clone()
        } else {
            format!("{prefix}{a}")
        }
    });

    let mut seen = HashSet::new();
    bare.clone().into_iter().chain(namespaced).filter(|a| seen.insert(a.clone())).collect()
}

/// Outcome of a successful reservation.
#[derive(Debug, Clone)]
pub struct Reservation {
    /// The newly created mapping.
    pub mapping: Arc<CommandMapping>,
    /// Candidates that were claimed, in priority order.
    pub accepted: Vec<String>,
    /// Candidates skipped because another mapping already owns them.
    pub skipped: Vec<String>,
}

/// Mapping from normalized alias to the mapping that owns it.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, Arc<CommandMapping>>,
}

impl AliasTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the mapping owning `alias`, normalizing it first.
    pub fn lookup(&self, alias: &str) -> Option<Arc<CommandMapping>> {
        self.entries.get(&normalize(alias)).cloned()
    }

    /// Whether the mapping with this id is still live.
    pub fn contains_mapping(&self, id: MappingId) -> bool {
        self.entries.values().any(|m| m.id() == id)
    }

    /// Claim every free candidate, in order.
    ///
    /// The first free candidate becomes the primary alias. Taken candidates
    /// are skipped, not treated as errors. Fails only when nothing is free.
    pub fn reserve(
        &mut self,
        id: MappingId,
        candidates: &[String],
        registrar: Arc<dyn CommandRegistrar>,
        plugin: PluginId,
    ) -> RegistrationResult<Reservation> {
        let (accepted, skipped): (Vec<String>, Vec<String>) =
            candidates.iter().cloned().partition(|c| !self.entries.contains_key(c));

        let Some(primary) = accepted.first().cloned() else {
            return Err(RegistrationError::NoAliasAvailable {
                plugin: plugin.to_string(),
                candidates: candidates.to_vec(),
            });
        };

        let aliases: BTreeSet<String> = accepted.iter().cloned().collect();
        let mapping = Arc::new(CommandMapping::new(id, primary, aliases, plugin, registrar));

        for alias in &accepted {
            self.entries.insert(alias.clone(), Arc::clone(&mapping));
        }

        Ok(Reservation { mapping, accepted, skipped })
    }

    /// Remove every alias still owned by `mapping`.
    ///
    /// Returns the released aliases, sorted. Aliases that have since been
    /// claimed by a different mapping are left alone.
    pub fn release(&mut self, mapping: &CommandMapping) -> Vec<String> {
        let mut released = Vec::new();
        for alias in mapping.aliases() {
            if self.entries.get(alias).is_some_and(|owner| owner.id() == mapping.id()) {
                self.entries.remove(alias);
                released.push(alias.clone());
            }
        }
        released
    }

    /// Remove every mapping registered by `plugin`.
    pub fn release_all_owned_by(&mut self, plugin: &PluginId) -> Vec<Arc<CommandMapping>> {
        let owned = self.mappings_owned_by(plugin);
        for mapping in &owned {
            self.release(mapping);
        }
        owned
    }

    /// Distinct mappings registered by `plugin`, ordered by primary alias.
    pub fn mappings_owned_by(&self, plugin: &PluginId) -> Vec<Arc<CommandMapping>> {
        self.mappings().into_iter().filter(|m| m.plugin() == plugin).collect()
    }

    /// Distinct live mappings, ordered by primary alias.
    pub fn mappings(&self) -> Vec<Arc<CommandMapping>> {
        let distinct: BTreeMap<MappingId, &Arc<CommandMapping>> =
            self.entries.values().map(|m| (m.id(), m)).collect();

        let mut mappings: Vec<Arc<CommandMapping>> = distinct.into_values().cloned().collect();
        mappings.sort_by(|a, b| a.primary_alias().cmp(b.primary_alias()));
        mappings
    }

    /// Every live alias, unordered.
    pub fn aliases(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Number of live aliases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no alias is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
