//! Client-facing command completion tree.
//!
//! The manager seeds one top-level literal node per primary alias and
//! hands each registrar a [`TreeScope`] over the nodes it owns. Node names
//! are fixed at creation, so top-level identifiers always equal primary
//! aliases.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// What a tree node matches on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Matches its own name exactly.
    Literal,
    /// Matches a value parsed by the named client-side parser.
    Argument { parser: String },
}

/// One node of the completion tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTreeNode {
    name: String,
    #[serde(flatten)]
    kind: NodeKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    executable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<CommandTreeNode>,
}

impl CommandTreeNode {
    /// A literal node.
    pub fn literal(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Literal)
    }

    /// An argument node parsed by `parser` on the client.
    pub fn argument(name: impl Into<String>, parser: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Argument { parser: parser.into() })
    }

    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self { name: name.into(), kind, executable: false, redirect: None, children: Vec::new() }
    }

    /// Builder form of [`set_executable`](Self::set_executable).
    pub fn executable(mut self) -> Self {
        self.executable = true;
        self
    }

    /// Builder form of [`add_child`](Self::add_child).
    pub fn then(mut self, child: Self) -> Self {
        self.add_child(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_executable(&self) -> bool {
        self.executable
    }

    /// Mark whether the command can run when input stops at this node.
    pub fn set_executable(&mut self, executable: bool) -> &mut Self {
        self.executable = executable;
        self
    }

    /// Name of the node completion continues from, if redirected.
    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    /// Continue completion from another top-level node.
    pub fn set_redirect(&mut self, target: impl Into<String>) -> &mut Self {
        self.redirect = Some(target.into());
        self
    }

    pub fn children(&self) -> &[CommandTreeNode] {
        &self.children
    }

    /// Add a child, merging into an existing child of the same name.
    ///
    /// Returns the child now present under that name.
    pub fn add_child(&mut self, child: Self) -> &mut Self {
        match self.children.iter().position(|c| c.name == child.name) {
            Some(index) => {
                let existing = &mut self.children[index];
                existing.executable |= child.executable;
                if existing.redirect.is_none() {
                    existing.redirect = child.redirect;
                }
                for grandchild in child.children {
                    existing.add_child(grandchild);
                }
                existing
            }
            None => {
                self.children.push(child);
                let last = self.children.len() - 1;
                &mut self.children[last]
            }
        }
    }

    /// Find a direct child by name.
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Find a direct child by name, mutably.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Self> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    fn render(&self, depth: usize, out: &mut String) {
        let label = match &self.kind {
            NodeKind::Literal => self.name.clone(),
            NodeKind::Argument { parser } => format!("<{}: {}>", self.name, parser),
        };
        let _ = write!(out, "{}{}", "  ".repeat(depth), label);
        if self.executable {
            out.push_str(" *");
        }
        if let Some(target) = &self.redirect {
            let _ = write!(out, " -> {target}");
        }
        out.push('\n');
        for child in &self.children {
            child.render(depth + 1, out);
        }
    }
}

/// The full completion tree sent to a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTree {
    commands: Vec<CommandTreeNode>,
}

impl CommandTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level command nodes, ordered by name.
    pub fn commands(&self) -> &[CommandTreeNode] {
        &self.commands
    }

    /// Find a top-level node by primary alias.
    pub fn get(&self, name: &str) -> Option<&CommandTreeNode> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn extend(&mut self, nodes: Vec<CommandTreeNode>) {
        self.commands.extend(nodes);
        self.commands.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Serialize for the client renderer.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Indented text rendering; executable nodes are marked with `*`.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            command.render(0, &mut out);
        }
        out
    }
}

/// One registrar's view of the tree while it contributes.
///
/// Holds a literal node per primary alias the registrar owns. The
/// registrar may decorate those nodes or hide them, but cannot add
/// top-level nodes of its own.
#[derive(Debug)]
pub struct TreeScope {
    nodes: Vec<CommandTreeNode>,
}

impl TreeScope {
    pub(crate) fn new(primary_aliases: &[String]) -> Self {
        Self { nodes: primary_aliases.iter().map(CommandTreeNode::literal).collect() }
    }

    /// Primary aliases still visible in this scope.
    pub fn aliases(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name.clone()).collect()
    }

    /// The node for one of this registrar's primary aliases.
    pub fn node_mut(&mut self, alias: &str) -> Option<&mut CommandTreeNode> {
        self.nodes.iter_mut().find(|n| n.name == alias)
    }

    /// Drop a command from the tree, e.g. when the subject may not use it.
    pub fn hide(&mut self, alias: &str) {
        self.nodes.retain(|n| n.name != alias);
    }

    pub(crate) fn into_nodes(self) -> Vec<CommandTreeNode> {
        self.nodes
    }
}
