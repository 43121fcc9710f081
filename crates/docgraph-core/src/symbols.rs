//! Symbol table: qualified name → node lookup.
//!
//! Keys are case-sensitive. Non-method nodes are keyed by their qualified name as written;
//! methods are keyed by [`method_key`](crate::nodes::method_key) and hold an ordered overload
//! sequence. The table performs no resolution itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ResolutionError;
use crate::nodes::NodeId;

/// A symbol table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Symbol {
    /// A single non-method node.
    Node(NodeId),
    /// Every method overload sharing one key, in declaration order.
    Overloads(Vec<NodeId>),
}

impl Symbol {
    /// All nodes behind this entry.
    pub fn ids(&self) -> &[NodeId] {
        match self {
            Symbol::Node(id) => std::slice::from_ref(id),
            Symbol::Overloads(ids) => ids,
        }
    }

    /// The node a reference to this entry resolves to (the first overload for methods).
    pub fn primary(&self) -> Option<NodeId> {
        self.ids().first().copied()
    }
}

/// Mapping from qualified name to node(s).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    entries: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Last writer wins; the previous entry is returned.
    pub fn insert(&mut self, key: impl Into<String>, symbol: Symbol) -> Option<Symbol> {
        self.entries.insert(key.into(), symbol)
    }

    /// Insert a single node under `key`, overwriting any previous entry.
    pub fn insert_node(&mut self, key: impl Into<String>, id: NodeId) -> Option<Symbol> {
        self.insert(key, Symbol::Node(id))
    }

    /// Append a method overload under `key`. Re-adding an id already present is a no-op.
    pub fn push_overload(&mut self, key: impl Into<String>, id: NodeId) {
        let key = key.into();
        match self.entries.get_mut(&key) {
            Some(Symbol::Overloads(ids)) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            Some(Symbol::Node(existing)) => {
                let existing = *existing;
                let ids = if existing == id {
                    vec![id]
                } else {
                    vec![existing, id]
                };
                self.entries.insert(key, Symbol::Overloads(ids));
            }
            None => {
                self.entries.insert(key, Symbol::Overloads(vec![id]));
            }
        }
    }

    /// Exact-key lookup. Absence is an expected outcome, not an error.
    pub fn lookup(&self, key: &str) -> Option<&Symbol> {
        self.entries.get(key)
    }

    /// Resolve a required parent.
    ///
    /// Fails with a [`ResolutionError`] naming `name` and the unresolved `member_of` when the
    /// parent is undefined or absent.
    pub fn lookup_or_fail(
        &self,
        name: &str,
        member_of: Option<&str>,
    ) -> Result<NodeId, ResolutionError> {
        member_of
            .and_then(|key| self.lookup(key))
            .and_then(Symbol::primary)
            .ok_or_else(|| ResolutionError::new(name, member_of))
    }

    /// Lookup for a type reference: the exact key first, then the upper-cased method key.
    pub fn lookup_type(&self, name: &str) -> Option<&Symbol> {
        self.lookup(name)
            .or_else(|| self.lookup(&name.to_uppercase()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
