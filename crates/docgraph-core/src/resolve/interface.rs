use super::{
    attach_to_member_of, claim_type_parameters, resolve_interface_refs, KindResolver,
    ResolveStats,
};
use crate::context::ResolutionContext;
use crate::error::ResolutionError;
use crate::nodes::NodeKind;

/// Resolves interface extends lists and attaches interfaces to their namespace or class.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterfaceResolver;

impl KindResolver for InterfaceResolver {
    fn kind(&self) -> NodeKind {
        NodeKind::Interface
    }

    fn resolve(&self, ctx: &mut ResolutionContext) -> Result<ResolveStats, ResolutionError> {
        let mut stats = ResolveStats::default();
        let ids = ctx.store.ids_of(NodeKind::Interface);

        // Every interface must be visible before any extends list is resolved.
        for &id in &ids {
            ctx.ensure_registered(id);
        }

        for id in ids {
            stats.unresolved_references += resolve_interface_refs(ctx, id);
            claim_type_parameters(ctx, id);
            attach_to_member_of(ctx, id, &mut stats);
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{InterfaceRef, Node};

    #[test]
    fn extends_resolve_to_real_interfaces() {
        let mut ctx = ResolutionContext::new();
        let plat = ctx.add(Node::root_namespace("plat")).unwrap();
        let browser = ctx
            .add(
                Node::interface("IBrowser")
                    .with_member_of("plat")
                    .with_extends("plat.IDisposable"),
            )
            .unwrap();
        let disposable = ctx
            .add(Node::interface("IDisposable").with_member_of("plat"))
            .unwrap();

        let stats = InterfaceResolver.resolve(&mut ctx).unwrap();
        assert_eq!(stats.attached, 2);
        assert_eq!(stats.unresolved_references, 0);

        let node = ctx.node(browser).unwrap();
        assert_eq!(
            node.interfaces().unwrap()["plat.IDisposable"],
            InterfaceRef::Resolved { node: disposable }
        );
        assert_eq!(node.parent, Some(plat));
    }

    #[test]
    fn unknown_extends_stays_placeholder() {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::root_namespace("plat")).unwrap();
        let browser = ctx
            .add(
                Node::interface("IBrowser")
                    .with_member_of("plat")
                    .with_extends("plat.INever"),
            )
            .unwrap();

        let stats = InterfaceResolver.resolve(&mut ctx).unwrap();
        assert_eq!(stats.unresolved_references, 1);
        assert_eq!(
            ctx.node(browser).unwrap().interfaces().unwrap()["plat.INever"],
            InterfaceRef::placeholder("plat.INever")
        );
    }

    #[test]
    fn extends_naming_a_class_stays_placeholder() {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::class("Base").with_member_of("plat")).unwrap();
        let iface = ctx
            .add(Node::interface("I").with_member_of("plat").with_extends("plat.Base"))
            .unwrap();

        InterfaceResolver.resolve(&mut ctx).unwrap();
        assert!(!ctx.node(iface).unwrap().interfaces().unwrap()["plat.Base"].is_resolved());
    }

    #[test]
    fn missing_parent_drops_without_error() {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::interface("I").with_member_of("gone")).unwrap();

        let stats = InterfaceResolver.resolve(&mut ctx).unwrap();
        assert_eq!(stats.dropped.len(), 1);
        assert_eq!(stats.dropped[0].name, "I");
    }
}
