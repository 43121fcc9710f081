//! The resolved graph and the assembler that produces it.
//!
//! [`GraphAssembler`] owns the resolver order: namespaces, interfaces, classes, methods,
//! properties, events. Running a later kind first never fails; it only leaves more nodes
//! dropped and more references unresolved. [`Graph`] is the arena after resolution, with
//! root namespaces keyed by name and every edge stored as a [`NodeId`].

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::context::ResolutionContext;
use crate::error::ResolutionError;
use crate::nodes::{method_key, Children, Node, NodeId, NodeKind};
use crate::resolve::{
    ClassResolver, EventResolver, InterfaceResolver, KindResolver, MethodResolver,
    NamespaceResolver, PropertyResolver, ResolveStats,
};
use crate::symbols::{Symbol, SymbolTable};

// ============================================================================
// Graph
// ============================================================================

/// A rooted documentation graph.
///
/// Nodes that were dropped during resolution stay in the arena (their ids remain valid) but
/// are not reachable from any root; [`walk`](Graph::walk) and [`is_attached`](Graph::is_attached)
/// only see the connected part.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    nodes: Vec<Node>,
    roots: BTreeMap<String, NodeId>,
    #[serde(skip)]
    symbols: SymbolTable,
}

impl Graph {
    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        roots: BTreeMap<String, NodeId>,
        symbols: SymbolTable,
    ) -> Self {
        Graph {
            nodes,
            roots,
            symbols,
        }
    }

    /// Root namespaces keyed by name.
    pub fn roots(&self) -> &BTreeMap<String, NodeId> {
        &self.roots
    }

    pub fn root_id(&self, name: &str) -> Option<NodeId> {
        self.roots.get(name).copied()
    }

    pub fn root(&self, name: &str) -> Option<&Node> {
        self.root_id(name).and_then(|id| self.node(id))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Every node in the arena, attached or not.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::new(i as u32), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Find a node by qualified name. Methods are found by either spelling of their key; an
    /// overloaded name returns the first overload.
    pub fn find(&self, qualified_name: &str) -> Option<NodeId> {
        self.symbols
            .lookup_type(qualified_name)
            .and_then(Symbol::primary)
    }

    /// Resolve a type name to a node and its kind.
    pub fn lookup_type(&self, name: &str) -> Option<(NodeId, NodeKind)> {
        let id = self.find(name)?;
        self.node(id).map(|node| (id, node.kind()))
    }

    pub fn children(&self, id: NodeId) -> Option<&Children> {
        self.node(id).and_then(Node::children)
    }

    /// The overload sequence attached to `parent` under `name` (matched upper-cased).
    pub fn methods_named(&self, parent: NodeId, name: &str) -> &[NodeId] {
        let key = method_key("", name);
        self.children(parent)
            .and_then(|children| children.methods.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// True when the node is a root or reachable from one through `parent` links.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        // Bounded by the arena size so a corrupt parent cycle cannot spin.
        for _ in 0..=self.nodes.len() {
            if self.roots.values().any(|root| *root == current) {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Depth-first pre-order over the connected graph, roots in name order.
    ///
    /// Children are visited namespaces first, then interfaces, classes, methods (overloads in
    /// declaration order), properties and events. Parents always precede their children.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.values().rev().copied().collect();
        let mut seen = vec![false; self.nodes.len()];

        while let Some(id) = stack.pop() {
            match seen.get_mut(id.index()) {
                Some(visited) if !*visited => *visited = true,
                _ => continue,
            }
            order.push(id);
            if let Some(children) = self.children(id) {
                let ids: Vec<NodeId> = children.ids().collect();
                stack.extend(ids.into_iter().rev());
            }
        }
        order
    }

    /// Per-kind node counts for the connected graph, plus the number left detached.
    pub fn counts(&self) -> NodeCounts {
        let mut counts = NodeCounts::default();
        let reachable = self.walk();
        for id in &reachable {
            if let Some(node) = self.node(*id) {
                match node.kind() {
                    NodeKind::Namespace => counts.namespaces += 1,
                    NodeKind::Interface => counts.interfaces += 1,
                    NodeKind::Class => counts.classes += 1,
                    NodeKind::Method => counts.methods += 1,
                    NodeKind::Property => counts.properties += 1,
                    NodeKind::Event => counts.events += 1,
                    NodeKind::Parameter | NodeKind::TypeParameter => {}
                }
                if let Some(method) = node.as_method() {
                    counts.parameters += method.parameters.len();
                }
                counts.type_parameters += node.type_parameters().len();
            }
        }
        counts.detached = self.nodes.len() - reachable.len();
        counts
    }
}

/// Node totals reported after a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeCounts {
    pub namespaces: usize,
    pub interfaces: usize,
    pub classes: usize,
    pub methods: usize,
    pub properties: usize,
    pub events: usize,
    pub parameters: usize,
    pub type_parameters: usize,
    /// Nodes in the arena that no root reaches.
    pub detached: usize,
}

impl NodeCounts {
    /// Attached entity nodes (parameters and type parameters excluded).
    pub fn total(&self) -> usize {
        self.namespaces
            + self.interfaces
            + self.classes
            + self.methods
            + self.properties
            + self.events
    }
}

// ============================================================================
// Pass Report
// ============================================================================

/// Statistics for one resolver within a resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindPass {
    pub kind: NodeKind,
    #[serde(flatten)]
    pub stats: ResolveStats,
}

/// Outcome of a full resolution pass, one entry per resolver in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub passes: Vec<KindPass>,
    pub totals: ResolveStats,
}

impl PassReport {
    fn record(&mut self, kind: NodeKind, stats: ResolveStats) {
        self.totals.merge(stats.clone());
        self.passes.push(KindPass { kind, stats });
    }

    pub fn for_kind(&self, kind: NodeKind) -> Option<&ResolveStats> {
        self.passes
            .iter()
            .find(|pass| pass.kind == kind)
            .map(|pass| &pass.stats)
    }
}

// ============================================================================
// Assembler
// ============================================================================

/// Runs the kind resolvers in a fixed order.
pub struct GraphAssembler {
    resolvers: Vec<Box<dyn KindResolver>>,
}

impl GraphAssembler {
    pub fn new() -> Self {
        GraphAssembler {
            resolvers: vec![
                Box::new(NamespaceResolver),
                Box::new(InterfaceResolver),
                Box::new(ClassResolver),
                Box::new(MethodResolver),
                Box::new(PropertyResolver),
                Box::new(EventResolver),
            ],
        }
    }

    /// Kinds in the order their resolvers run.
    pub fn order(&self) -> Vec<NodeKind> {
        self.resolvers.iter().map(|r| r.kind()).collect()
    }

    /// Run every resolver over the context. Safe to call again on a resolved context.
    pub fn resolve(&self, ctx: &mut ResolutionContext) -> Result<PassReport, ResolutionError> {
        let _span = info_span!("resolve", nodes = ctx.len()).entered();
        let mut report = PassReport::default();

        for resolver in &self.resolvers {
            let kind = resolver.kind();
            let stats = resolver.resolve(ctx)?;
            debug!(
                %kind,
                attached = stats.attached,
                roots = stats.roots,
                dropped = stats.dropped.len(),
                unresolved = stats.unresolved_references,
                "resolver finished"
            );
            report.record(kind, stats);
        }

        info!(
            attached = report.totals.attached,
            roots = report.totals.roots,
            dropped = report.totals.dropped.len(),
            unresolved = report.totals.unresolved_references,
            "resolution pass complete"
        );
        Ok(report)
    }

    /// Resolve the context and hand it over as a graph.
    pub fn build(
        &self,
        mut ctx: ResolutionContext,
    ) -> Result<(Graph, PassReport), ResolutionError> {
        let report = self.resolve(&mut ctx)?;
        Ok((ctx.into_graph(), report))
    }
}

impl Default for GraphAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphAssembler")
            .field("order", &self.order())
            .finish()
    }
}

/// Build a graph with the default resolver order.
pub fn build_graph(ctx: ResolutionContext) -> Result<Graph, ResolutionError> {
    GraphAssembler::new().build(ctx).map(|(graph, _)| graph)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Parameter;

    fn sample() -> ResolutionContext {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::root_namespace("plat")).unwrap();
        ctx.add(Node::namespace("web").with_member_of("plat")).unwrap();
        ctx.add(Node::interface("IBrowser").with_member_of("plat.web"))
            .unwrap();
        ctx.add(
            Node::class("App")
                .with_member_of("plat")
                .with_interface("plat.web.IBrowser"),
        )
        .unwrap();
        ctx.add(
            Node::method("start")
                .with_member_of("plat.App")
                .with_parameter(Parameter::new("delay")),
        )
        .unwrap();
        ctx.add(Node::property("title").with_member_of("plat.App"))
            .unwrap();
        ctx.add(Node::event("ready").with_member_of("plat.App")).unwrap();
        ctx
    }

    mod assembler {
        use super::*;

        #[test]
        fn order_is_fixed() {
            assert_eq!(
                GraphAssembler::new().order(),
                vec![
                    NodeKind::Namespace,
                    NodeKind::Interface,
                    NodeKind::Class,
                    NodeKind::Method,
                    NodeKind::Property,
                    NodeKind::Event,
                ]
            );
        }

        #[test]
        fn report_has_one_pass_per_resolver() {
            let (_, report) = GraphAssembler::new().build(sample()).unwrap();
            let kinds: Vec<_> = report.passes.iter().map(|p| p.kind).collect();
            assert_eq!(kinds, GraphAssembler::new().order());
            assert_eq!(report.totals.roots, 1);
            assert_eq!(report.totals.attached, 6);
            assert!(report.totals.dropped.is_empty());
            assert_eq!(report.for_kind(NodeKind::Method).unwrap().attached, 1);
        }

        #[test]
        fn build_graph_propagates_resolution_error() {
            let mut ctx = ResolutionContext::new();
            ctx.add(Node::namespace("lost").with_member_of("nowhere"))
                .unwrap();
            let err = build_graph(ctx).unwrap_err();
            assert_eq!(err.name, "lost");
        }
    }

    mod queries {
        use super::*;

        #[test]
        fn walk_is_parent_first() {
            let graph = build_graph(sample()).unwrap();
            let names: Vec<_> = graph
                .walk()
                .into_iter()
                .map(|id| graph.node(id).unwrap().name.clone())
                .collect();
            assert_eq!(
                names,
                ["plat", "web", "IBrowser", "App", "start", "title", "ready"]
            );
        }

        #[test]
        fn find_and_methods_named() {
            let graph = build_graph(sample()).unwrap();
            let app = graph.find("plat.App").unwrap();
            let start = graph.find("plat.App.start").unwrap();
            assert_eq!(graph.methods_named(app, "Start"), &[start]);
            assert_eq!(graph.parent(start), Some(app));
            assert!(graph.methods_named(app, "stop").is_empty());
        }

        #[test]
        fn counts_cover_connected_nodes() {
            let mut ctx = sample();
            ctx.add(Node::class("Orphan").with_member_of("gone"))
                .unwrap();
            let graph = build_graph(ctx).unwrap();
            let counts = graph.counts();
            assert_eq!(counts.namespaces, 2);
            assert_eq!(counts.classes, 1);
            assert_eq!(counts.parameters, 1);
            assert_eq!(counts.detached, 1);
            assert_eq!(counts.total(), 7);

            let orphan = graph.find("gone.Orphan").unwrap();
            assert!(!graph.is_attached(orphan));
        }

        #[test]
        fn graph_serializes_with_roots() {
            let graph = build_graph(sample()).unwrap();
            let json = serde_json::to_value(&graph).unwrap();
            assert_eq!(json["roots"]["plat"], 0);
            assert_eq!(json["nodes"][0]["kind"], "namespace");
            assert!(json.get("symbols").is_none());
        }
    }
}
