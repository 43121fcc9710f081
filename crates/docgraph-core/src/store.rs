//! Flat node store: constructed, not-yet-linked nodes partitioned by kind.
//!
//! Buckets map a symbol key to the arena id of the node registered under it. Every bucket
//! overwrites on re-insert except methods, which append to an ordered overload sequence.
//! The store never mutates nodes; resolvers take snapshots of bucket ids and work on the arena.

use std::collections::BTreeMap;

use crate::nodes::{NodeId, NodeKind};

#[derive(Debug, Clone, Default)]
pub struct FlatNodeStore {
    namespaces: BTreeMap<String, NodeId>,
    interfaces: BTreeMap<String, NodeId>,
    classes: BTreeMap<String, NodeId>,
    methods: BTreeMap<String, Vec<NodeId>>,
    properties: BTreeMap<String, NodeId>,
    events: BTreeMap<String, NodeId>,
}

impl FlatNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Insert Operations
    // ========================================================================

    /// Insert or overwrite a namespace. Returns the id it replaced.
    pub fn add_namespace(&mut self, key: impl Into<String>, id: NodeId) -> Option<NodeId> {
        self.namespaces.insert(key.into(), id)
    }

    pub fn add_interface(&mut self, key: impl Into<String>, id: NodeId) -> Option<NodeId> {
        self.interfaces.insert(key.into(), id)
    }

    pub fn add_class(&mut self, key: impl Into<String>, id: NodeId) -> Option<NodeId> {
        self.classes.insert(key.into(), id)
    }

    pub fn add_property(&mut self, key: impl Into<String>, id: NodeId) -> Option<NodeId> {
        self.properties.insert(key.into(), id)
    }

    pub fn add_event(&mut self, key: impl Into<String>, id: NodeId) -> Option<NodeId> {
        self.events.insert(key.into(), id)
    }

    /// Append a method to the overload sequence for `key`, creating it on first use.
    pub fn add_method(&mut self, key: impl Into<String>, id: NodeId) {
        let overloads = self.methods.entry(key.into()).or_default();
        if !overloads.contains(&id) {
            overloads.push(id);
        }
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    pub fn namespaces(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.namespaces.iter().map(|(k, id)| (k.as_str(), *id))
    }

    pub fn interfaces(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.interfaces.iter().map(|(k, id)| (k.as_str(), *id))
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.classes.iter().map(|(k, id)| (k.as_str(), *id))
    }

    /// Overload sequences keyed by upper-cased method key.
    pub fn methods(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.methods.iter().map(|(k, ids)| (k.as_str(), ids.as_slice()))
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.properties.iter().map(|(k, id)| (k.as_str(), *id))
    }

    pub fn events(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.events.iter().map(|(k, id)| (k.as_str(), *id))
    }

    /// Snapshot of every id in a bucket, overloads flattened in declaration order.
    pub fn ids_of(&self, kind: NodeKind) -> Vec<NodeId> {
        match kind {
            NodeKind::Namespace => self.namespaces.values().copied().collect(),
            NodeKind::Interface => self.interfaces.values().copied().collect(),
            NodeKind::Class => self.classes.values().copied().collect(),
            NodeKind::Method => self.methods.values().flatten().copied().collect(),
            NodeKind::Property => self.properties.values().copied().collect(),
            NodeKind::Event => self.events.values().copied().collect(),
            NodeKind::Parameter | NodeKind::TypeParameter => Vec::new(),
        }
    }

    /// Number of nodes in a bucket (every overload counts).
    pub fn count(&self, kind: NodeKind) -> usize {
        match kind {
            NodeKind::Method => self.methods.values().map(Vec::len).sum(),
            NodeKind::Namespace => self.namespaces.len(),
            NodeKind::Interface => self.interfaces.len(),
            NodeKind::Class => self.classes.len(),
            NodeKind::Property => self.properties.len(),
            NodeKind::Event => self.events.len(),
            NodeKind::Parameter | NodeKind::TypeParameter => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
            && self.interfaces.is_empty()
            && self.classes.is_empty()
            && self.methods.is_empty()
            && self.properties.is_empty()
            && self.events.is_empty()
    }
}
