//! Command mappings and the identities they bind together.
//!
//! A [`CommandMapping`] is created by the alias table when a registration
//! succeeds and is never mutated afterwards. Adding an alias later means
//! registering a new mapping.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::registrar::CommandRegistrar;

/// Identity of the plugin that registered a command.
///
/// Plugin ids are case-normalized and double as the namespace of
/// fallback aliases (`plugin:command`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    /// Create a plugin id, normalizing it to lower case.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    /// The normalized id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PluginId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Stable identity of a command framework adapter.
///
/// Rendered as `namespace:value`, e.g. `cmdmux:simple`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistrarId {
    namespace: String,
    value: String,
}

impl RegistrarId {
    /// Create a registrar id from its namespace and value.
    pub fn new(namespace: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        Self {
            namespace: namespace.as_ref().trim().to_lowercase(),
            value: value.as_ref().trim().to_lowercase(),
        }
    }

    /// The namespace part, usually the owning plugin.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The value part.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for RegistrarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.value)
    }
}

/// Unique, never reused identifier of a mapping within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MappingId(pub(crate) u64);

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The binding of a set of aliases to one registrar and one plugin.
#[derive(Clone)]
pub struct CommandMapping {
    id: MappingId,
    primary_alias: String,
    aliases: BTreeSet<String>,
    plugin: PluginId,
    registrar_id: RegistrarId,
    registrar: Arc<dyn CommandRegistrar>,
}

impl CommandMapping {
    /// Build a mapping. `primary_alias` must be a member of `aliases`.
    pub(crate) fn new(
        id: MappingId,
        primary_alias: String,
        aliases: BTreeSet<String>,
        plugin: PluginId,
        registrar: Arc<dyn CommandRegistrar>,
    ) -> Self {
        debug_assert!(aliases.contains(&primary_alias));
        let registrar_id = registrar.id();
        Self { id, primary_alias, aliases, plugin, registrar_id, registrar }
    }

    /// Identifier of this mapping.
    pub fn id(&self) -> MappingId {
        self.id
    }

    /// The canonical alias always passed to the registrar.
    pub fn primary_alias(&self) -> &str {
        &self.primary_alias
    }

    /// Every alias routed to this mapping, including the primary one.
    pub fn aliases(&self) -> &BTreeSet<String> {
        &self.aliases
    }

    /// Aliases other than the primary one.
    pub fn secondary_aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str).filter(move |a| *a != self.primary_alias)
    }

    /// Whether `alias` (already normalized) routes to this mapping.
    pub fn contains_alias(&self, alias: &str) -> bool {
        self.aliases.contains(alias)
    }

    /// The plugin that registered this mapping.
    pub fn plugin(&self) -> &PluginId {
        &self.plugin
    }

    /// Identity of the owning registrar.
    pub fn registrar_id(&self) -> &RegistrarId {
        &self.registrar_id
    }

    /// The owning registrar.
    pub fn registrar(&self) -> &Arc<dyn CommandRegistrar> {
        &self.registrar
    }
}

impl fmt::Debug for CommandMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandMapping")
            .field("id", &self.id)
            .field("primary_alias", &self.primary_alias)
            .field("aliases", &self.aliases)
            .field("plugin", &self.plugin)
            .field("registrar", &self.registrar_id)
            .finish()
    }
}

impl PartialEq for CommandMapping {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CommandMapping {}
