//! Resolution context: the state of one resolution run.
//!
//! [`ResolutionContext`] owns the node arena, the [`FlatNodeStore`], the [`SymbolTable`] and
//! the root map. It is built fresh per run, handed to every resolver explicitly, and consumed
//! by [`into_graph`](ResolutionContext::into_graph).

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::GraphError;
use crate::graph::Graph;
use crate::nodes::{Node, NodeData, NodeId, NodeKind};
use crate::store::FlatNodeStore;
use crate::symbols::{Symbol, SymbolTable};

/// Outcome of attaching a node to a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Attached,
    /// The node already has a parent or was persisted.
    AlreadyAttached,
    /// The parent kind cannot own children.
    NotAContainer(NodeKind),
    /// The node named itself as its parent.
    SelfReference,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    pub(crate) nodes: Vec<Node>,
    pub(crate) store: FlatNodeStore,
    pub(crate) symbols: SymbolTable,
    pub(crate) roots: BTreeMap<String, NodeId>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructed node in the arena, its kind bucket and the symbol table.
    ///
    /// A key already held by a node of a different kind is rejected with
    /// [`GraphError::DuplicateQualifiedName`]. Same-kind re-registration overwrites, except for
    /// methods, which append an overload.
    pub fn add(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let kind = node.kind();
        let key = node.symbol_key();

        if let Some(existing) = self.kind_of_symbol(&key) {
            if existing != kind {
                return Err(GraphError::DuplicateQualifiedName {
                    qualified_name: key,
                    existing,
                    incoming: kind,
                });
            }
        }

        let id = NodeId::new(self.nodes.len() as u32);
        let replaced = match node.data {
            NodeData::Method(_) => {
                self.store.add_method(key.clone(), id);
                self.symbols.push_overload(key.clone(), id);
                None
            }
            NodeData::Namespace(_) => self.store.add_namespace(key.clone(), id),
            NodeData::Interface(_) => self.store.add_interface(key.clone(), id),
            NodeData::Class(_) => self.store.add_class(key.clone(), id),
            NodeData::Property(_) => self.store.add_property(key.clone(), id),
            NodeData::Event(_) => self.store.add_event(key.clone(), id),
        };
        if kind != NodeKind::Method {
            self.symbols.insert_node(key.clone(), id);
        }
        if let Some(previous) = replaced {
            debug!(key = %key, %kind, replaced = %previous, "node re-registered, previous dropped");
        }

        self.nodes.push(node);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub fn store(&self) -> &FlatNodeStore {
        &self.store
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn roots(&self) -> &BTreeMap<String, NodeId> {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finish the run and hand the arena over as a [`Graph`].
    pub fn into_graph(self) -> Graph {
        Graph::from_parts(self.nodes, self.roots, self.symbols)
    }

    // ========================================================================
    // Resolver Support
    // ========================================================================

    /// Kind of the node a symbol key resolves to.
    pub(crate) fn kind_of_symbol(&self, key: &str) -> Option<NodeKind> {
        self.symbols
            .lookup(key)
            .and_then(Symbol::primary)
            .and_then(|id| self.node(id))
            .map(Node::kind)
    }

    /// Resolve a type name to a node and its kind (exact key, then method key).
    pub(crate) fn resolve_type(&self, name: &str) -> Option<(NodeId, NodeKind)> {
        let id = self.symbols.lookup_type(name).and_then(Symbol::primary)?;
        self.node(id).map(|node| (id, node.kind()))
    }

    /// Re-insert a node's own key if it went missing, so later resolvers can see it.
    pub(crate) fn ensure_registered(&mut self, id: NodeId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let key = node.symbol_key();
        if node.kind() == NodeKind::Method {
            self.symbols.push_overload(key, id);
        } else if !self.symbols.contains(&key) {
            self.symbols.insert_node(key, id);
        }
    }

    /// Record a root namespace. Returns false when it was already recorded.
    pub(crate) fn set_root(&mut self, name: &str, id: NodeId) -> bool {
        if self.roots.get(name) == Some(&id) {
            return false;
        }
        self.roots.insert(name.to_string(), id);
        true
    }

    /// Attach `child` to `parent`'s matching child collection, exactly once.
    pub(crate) fn attach(&mut self, child: NodeId, parent: NodeId) -> Attachment {
        if child == parent {
            return Attachment::SelfReference;
        }
        let (kind, local_key) = match self.node(child) {
            Some(node) if node.parent.is_some() || node.saved => {
                return Attachment::AlreadyAttached;
            }
            Some(node) => (node.kind(), node.local_key()),
            None => return Attachment::AlreadyAttached,
        };

        let Some(parent_node) = self.nodes.get_mut(parent.index()) else {
            return Attachment::NotAContainer(NodeKind::Namespace);
        };
        let parent_kind = parent_node.kind();
        let Some(children) = parent_node.children_mut() else {
            return Attachment::NotAContainer(parent_kind);
        };

        match kind {
            NodeKind::Namespace => {
                children.namespaces.insert(local_key, child);
            }
            NodeKind::Interface => {
                children.interfaces.insert(local_key, child);
            }
            NodeKind::Class => {
                children.classes.insert(local_key, child);
            }
            NodeKind::Method => {
                children.methods.entry(local_key).or_default().push(child);
            }
            NodeKind::Property => {
                children.properties.insert(local_key, child);
            }
            NodeKind::Event => {
                children.events.insert(local_key, child);
            }
            NodeKind::Parameter | NodeKind::TypeParameter => {
                return Attachment::NotAContainer(kind);
            }
        }

        if let Some(node) = self.nodes.get_mut(child.index()) {
            node.parent = Some(parent);
        }
        Attachment::Attached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_registers_store_and_symbols() {
        let mut ctx = ResolutionContext::new();
        let plat = ctx.add(Node::root_namespace("plat")).unwrap();
        let app = ctx.add(Node::class("App").with_member_of("plat")).unwrap();

        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.store().ids_of(NodeKind::Namespace), vec![plat]);
        assert_eq!(
            ctx.symbols().lookup("plat.App").and_then(Symbol::primary),
            Some(app)
        );
    }

    #[test]
    fn methods_register_as_overloads() {
        let mut ctx = ResolutionContext::new();
        let a = ctx.add(Node::method("acquire").with_member_of("plat")).unwrap();
        let b = ctx.add(Node::method("acquire").with_member_of("plat")).unwrap();
        assert_eq!(
            ctx.symbols().lookup("PLAT.ACQUIRE").map(Symbol::ids),
            Some(&[a, b][..])
        );
    }

    #[test]
    fn cross_kind_duplicate_is_rejected() {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::class("App").with_member_of("plat")).unwrap();
        let err = ctx
            .add(Node::property("App").with_member_of("plat"))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateQualifiedName {
                qualified_name: "plat.App".to_string(),
                existing: NodeKind::Class,
                incoming: NodeKind::Property,
            }
        );
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn same_kind_duplicate_overwrites() {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::class("App").with_member_of("plat")).unwrap();
        let second = ctx.add(Node::class("App").with_member_of("plat")).unwrap();
        assert_eq!(ctx.store().ids_of(NodeKind::Class), vec![second]);
    }

    #[test]
    fn attach_is_exactly_once() {
        let mut ctx = ResolutionContext::new();
        let plat = ctx.add(Node::root_namespace("plat")).unwrap();
        let app = ctx.add(Node::class("App").with_member_of("plat")).unwrap();

        assert_eq!(ctx.attach(app, plat), Attachment::Attached);
        assert_eq!(ctx.attach(app, plat), Attachment::AlreadyAttached);

        let children = ctx.node(plat).unwrap().children().unwrap();
        assert_eq!(children.classes.len(), 1);
        assert_eq!(ctx.node(app).unwrap().parent, Some(plat));
    }

    #[test]
    fn attach_to_non_container_is_refused() {
        let mut ctx = ResolutionContext::new();
        let title = ctx.add(Node::property("title").with_member_of("plat")).unwrap();
        let event = ctx.add(Node::event("changed").with_member_of("plat.title")).unwrap();
        assert_eq!(
            ctx.attach(event, title),
            Attachment::NotAContainer(NodeKind::Property)
        );
        assert!(ctx.node(event).unwrap().parent.is_none());
    }

    #[test]
    fn self_reference_is_refused() {
        let mut ctx = ResolutionContext::new();
        let ns = ctx.add(Node::namespace("loop").with_member_of("loop")).unwrap();
        assert_eq!(ctx.attach(ns, ns), Attachment::SelfReference);
    }
}
