//! Kind resolvers.
//!
//! One resolver per entity kind. Each walks its bucket of the [`FlatNodeStore`], looks up the
//! declared parent, attaches the node to the parent's matching child collection and resolves the
//! kind's string cross-references against the [`SymbolTable`].
//!
//! Only the namespace resolver can fail: a namespace whose `memberOf` does not resolve has no
//! root fallback. Every other miss is recorded in [`ResolveStats`] and logged at debug level.
//!
//! [`FlatNodeStore`]: crate::store::FlatNodeStore
//! [`SymbolTable`]: crate::symbols::SymbolTable

mod class;
mod interface;
mod member;
mod method;
mod namespace;

pub use class::ClassResolver;
pub use interface::InterfaceResolver;
pub use member::{EventResolver, PropertyResolver};
pub use method::MethodResolver;
pub use namespace::NamespaceResolver;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::{Attachment, ResolutionContext};
use crate::error::ResolutionError;
use crate::nodes::{InterfaceRef, NodeId, NodeKind};
use crate::symbols::Symbol;

/// Resolution of one entity kind.
pub trait KindResolver {
    /// The bucket this resolver consumes.
    fn kind(&self) -> NodeKind;

    /// Resolve every node in the bucket, mutating the arena in place.
    fn resolve(&self, ctx: &mut ResolutionContext) -> Result<ResolveStats, ResolutionError>;
}

/// Why a node was left out of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "parent_kind", rename_all = "snake_case")]
pub enum DropReason {
    /// `memberOf` was undefined or named nothing.
    ParentNotFound,
    /// `memberOf` named a node that cannot own children.
    ParentNotAContainer(NodeKind),
}

/// A node that was never attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedNode {
    pub name: String,
    pub kind: NodeKind,
    pub member_of: Option<String>,
    #[serde(flatten)]
    pub reason: DropReason,
}

/// Counters collected by one resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveStats {
    /// Nodes attached during this pass.
    pub attached: usize,
    /// Root namespaces recorded during this pass.
    pub roots: usize,
    pub dropped: Vec<DroppedNode>,
    /// Cross-references left unresolved (placeholders, unknown type names).
    pub unresolved_references: usize,
}

impl ResolveStats {
    pub fn merge(&mut self, other: ResolveStats) {
        self.attached += other.attached;
        self.roots += other.roots;
        self.dropped.extend(other.dropped);
        self.unresolved_references += other.unresolved_references;
    }
}

// ============================================================================
// Shared Helpers
// ============================================================================

/// Attach a node to `parent` and account for the outcome.
pub(crate) fn attach_and_record(
    ctx: &mut ResolutionContext,
    id: NodeId,
    parent: NodeId,
    stats: &mut ResolveStats,
) {
    match ctx.attach(id, parent) {
        Attachment::Attached => stats.attached += 1,
        Attachment::AlreadyAttached => {}
        Attachment::NotAContainer(parent_kind) => {
            if let Some(node) = ctx.node(id) {
                warn!(
                    name = %node.name,
                    kind = %node.kind(),
                    member_of = node.member_of.as_deref().unwrap_or(""),
                    %parent_kind,
                    "memberOf names a node that cannot own children, skipping"
                );
            }
            record_drop(ctx, id, DropReason::ParentNotAContainer(parent_kind), stats);
        }
        Attachment::SelfReference => {
            record_drop(ctx, id, DropReason::ParentNotFound, stats);
        }
    }
}

/// Resolve `memberOf` for a kind without a root fallback; a miss drops the node.
pub(crate) fn attach_to_member_of(
    ctx: &mut ResolutionContext,
    id: NodeId,
    stats: &mut ResolveStats,
) {
    let Some(node) = ctx.node(id) else {
        return;
    };
    if node.parent.is_some() || node.saved {
        return;
    }
    let parent = node
        .member_of
        .as_deref()
        .and_then(|member_of| ctx.symbols.lookup(member_of))
        .and_then(Symbol::primary);

    match parent {
        Some(parent) => attach_and_record(ctx, id, parent, stats),
        None => {
            debug!(
                name = %node.name,
                kind = %node.kind(),
                member_of = node.member_of.as_deref().unwrap_or("<undefined>"),
                "memberOf not found, node dropped"
            );
            record_drop(ctx, id, DropReason::ParentNotFound, stats);
        }
    }
}

pub(crate) fn record_drop(
    ctx: &ResolutionContext,
    id: NodeId,
    reason: DropReason,
    stats: &mut ResolveStats,
) {
    if let Some(node) = ctx.node(id) {
        stats.dropped.push(DroppedNode {
            name: node.name.clone(),
            kind: node.kind(),
            member_of: node.member_of.clone(),
            reason,
        });
    }
}

/// Replace interface placeholders whose names now resolve to an interface.
///
/// Entries that do not resolve stay placeholders. Returns the number left unresolved.
pub(crate) fn resolve_interface_refs(ctx: &mut ResolutionContext, id: NodeId) -> usize {
    let Some(refs) = ctx.node(id).and_then(|node| node.interfaces()) else {
        return 0;
    };

    let mut resolved = Vec::new();
    let mut unresolved = 0;
    for (name, entry) in refs {
        if entry.is_resolved() {
            continue;
        }
        match ctx.resolve_type(name) {
            Some((target, NodeKind::Interface)) => resolved.push((name.clone(), target)),
            _ => {
                debug!(interface = %name, "interface reference left as placeholder");
                unresolved += 1;
            }
        }
    }

    if let Some(refs) = ctx.node_mut(id).and_then(|node| node.interfaces_mut()) {
        for (name, target) in resolved {
            refs.insert(name, InterfaceRef::Resolved { node: target });
        }
    }
    unresolved
}

/// Point every type parameter of a node back at its declaring node.
pub(crate) fn claim_type_parameters(ctx: &mut ResolutionContext, id: NodeId) {
    if let Some(params) = ctx.node_mut(id).and_then(|node| node.type_parameters_mut()) {
        for param in params.iter_mut().filter(|p| p.owner.is_none()) {
            param.owner = Some(id);
        }
    }
}
