//! Caller-supplied invocation context.
//!
//! The manager threads an [`InvocationContext`] through to the owning
//! registrar untouched. Registrars read the subject, its permissions, and
//! any ambient key/value data the caller attached.

use std::collections::{BTreeMap, BTreeSet};

/// Context key holding the verbatim command line that was typed.
pub const COMMAND_STRING: &str = "command_string";

/// Context key naming where the invocation came from (console, client, script).
pub const ORIGIN: &str = "origin";

/// Subject name used for the local console.
pub const CONSOLE_SUBJECT: &str = "console";

/// Identity, authorization, and cause data for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    /// Name of the subject invoking the command.
    subject: String,

    /// Permissions granted to the subject.
    permissions: BTreeSet<String>,

    /// Ordered cause chain, most direct cause first.
    causes: Vec<String>,

    /// Free-form ambient data.
    context: BTreeMap<String, String>,
}

impl InvocationContext {
    /// Create a context for the given subject with no permissions.
    pub fn new(subject: impl Into<String>) -> Self {
        Self { subject: subject.into(), ..Self::default() }
    }

    /// Context for the local console, which holds every permission.
    pub fn console() -> Self {
        Self::new(CONSOLE_SUBJECT).with_permission("*").with_cause(CONSOLE_SUBJECT)
    }

    /// Grant a permission.
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Grant several permissions.
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Append a cause to the chain.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Attach a context value.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attach the verbatim command line under [`COMMAND_STRING`].
    pub fn with_command_string(self, line: impl Into<String>) -> Self {
        self.with_context(COMMAND_STRING, line)
    }

    /// The subject's name.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The cause chain.
    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    /// The most direct cause, if any.
    pub fn root_cause(&self) -> Option<&str> {
        self.causes.first().map(String::as_str)
    }

    /// Look up a context value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    /// The verbatim command line, if the caller attached one.
    pub fn command_string(&self) -> Option<&str> {
        self.get(COMMAND_STRING)
    }

    /// Every granted permission.
    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }

    /// Whether the subject holds `permission`.
    ///
    /// A grant of `*` matches everything; a grant ending in `.*` matches
    /// every permission below that node.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|granted| {
            if granted == "*" || granted == permission {
                return true;
            }
            granted
                .strip_suffix('*')
                .is_some_and(|prefix| prefix.ends_with('.') && permission.starts_with(prefix))
        })
    }
}
