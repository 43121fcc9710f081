use tracing::debug;

use super::{
    attach_and_record, claim_type_parameters, record_drop, resolve_interface_refs, DropReason,
    KindResolver, ResolveStats,
};
use crate::context::ResolutionContext;
use crate::error::ResolutionError;
use crate::nodes::{NodeData, NodeKind};

/// Resolves a class's namespace, parent class and implemented interfaces, then attaches the
/// class to its namespace.
///
/// The namespace comes from `namespace_name` (falling back to `memberOf`) through a direct
/// symbol lookup, not the fatal parent lookup used for namespaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassResolver;

impl KindResolver for ClassResolver {
    fn kind(&self) -> NodeKind {
        NodeKind::Class
    }

    fn resolve(&self, ctx: &mut ResolutionContext) -> Result<ResolveStats, ResolutionError> {
        let mut stats = ResolveStats::default();
        let ids = ctx.store.ids_of(NodeKind::Class);

        for &id in &ids {
            ctx.ensure_registered(id);
        }

        for id in ids {
            let Some(node) = ctx.node(id) else {
                continue;
            };
            let NodeData::Class(class) = &node.data else {
                continue;
            };

            let namespace = match class.namespace {
                Some(existing) => Some(existing),
                None => class
                    .namespace_name
                    .as_deref()
                    .or(node.member_of.as_deref())
                    .and_then(|name| ctx.resolve_type(name))
                    .filter(|(_, kind)| *kind == NodeKind::Namespace)
                    .map(|(target, _)| target),
            };

            let mut extends = class.extends;
            if extends.is_none() {
                if let Some(parent_class) = class.extends_name.as_deref() {
                    match ctx.resolve_type(parent_class) {
                        Some((target, NodeKind::Class)) => extends = Some(target),
                        _ => {
                            debug!(class = %node.name, extends = %parent_class, "parent class not found");
                            stats.unresolved_references += 1;
                        }
                    }
                }
            }

            if let Some(NodeData::Class(class)) = ctx.node_mut(id).map(|node| &mut node.data) {
                class.namespace = namespace;
                class.extends = extends;
            }

            stats.unresolved_references += resolve_interface_refs(ctx, id);
            claim_type_parameters(ctx, id);

            match namespace {
                Some(parent) => attach_and_record(ctx, id, parent, &mut stats),
                None => {
                    let already = ctx
                        .node(id)
                        .is_some_and(|node| node.parent.is_some() || node.saved);
                    if !already {
                        if let Some(node) = ctx.node(id) {
                            debug!(
                                name = %node.name,
                                member_of = node.member_of.as_deref().unwrap_or("<undefined>"),
                                "class namespace not found, node dropped"
                            );
                        }
                        record_drop(ctx, id, DropReason::ParentNotFound, &mut stats);
                    }
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{InterfaceRef, Node};

    #[test]
    fn class_attaches_to_namespace() {
        let mut ctx = ResolutionContext::new();
        let plat = ctx.add(Node::root_namespace("plat")).unwrap();
        let app = ctx.add(Node::class("App").with_member_of("plat")).unwrap();

        let stats = ClassResolver.resolve(&mut ctx).unwrap();
        assert_eq!(stats.attached, 1);

        let node = ctx.node(app).unwrap();
        assert_eq!(node.parent, Some(plat));
        assert_eq!(node.as_class().unwrap().namespace, Some(plat));
        assert_eq!(
            ctx.node(plat).unwrap().children().unwrap().classes.get("App"),
            Some(&app)
        );
    }

    #[test]
    fn extends_and_implements_resolve() {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::root_namespace("plat")).unwrap();
        let base = ctx.add(Node::class("Base").with_member_of("plat")).unwrap();
        let iapp = ctx.add(Node::interface("IApp").with_member_of("plat")).unwrap();
        let app = ctx
            .add(
                Node::class("App")
                    .with_member_of("plat")
                    .with_extends("plat.Base")
                    .with_interface("plat.IApp")
                    .with_interface("plat.IMissing"),
            )
            .unwrap();

        let stats = ClassResolver.resolve(&mut ctx).unwrap();
        assert_eq!(stats.unresolved_references, 1);

        let class = ctx.node(app).unwrap().as_class().unwrap();
        assert_eq!(class.extends, Some(base));
        assert_eq!(class.interfaces["plat.IApp"], InterfaceRef::Resolved { node: iapp });
        assert_eq!(
            class.interfaces["plat.IMissing"],
            InterfaceRef::placeholder("plat.IMissing")
        );
    }

    #[test]
    fn explicit_namespace_name_wins_over_member_of() {
        let mut ctx = ResolutionContext::new();
        let plat = ctx.add(Node::root_namespace("plat")).unwrap();
        let app = ctx
            .add(
                Node::class("App")
                    .with_member_of("elsewhere")
                    .with_namespace_name("plat"),
            )
            .unwrap();

        ClassResolver.resolve(&mut ctx).unwrap();
        assert_eq!(ctx.node(app).unwrap().parent, Some(plat));
    }

    #[test]
    fn missing_namespace_drops_class() {
        let mut ctx = ResolutionContext::new();
        let foo = ctx.add(Node::class("Foo").with_member_of("missing.ns")).unwrap();

        let stats = ClassResolver.resolve(&mut ctx).unwrap();
        assert_eq!(stats.attached, 0);
        assert_eq!(stats.dropped.len(), 1);
        assert_eq!(stats.dropped[0].reason, DropReason::ParentNotFound);
        assert!(ctx.node(foo).unwrap().parent.is_none());
    }
}
