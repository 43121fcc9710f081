use tracing::debug;

use super::{attach_and_record, KindResolver, ResolveStats};
use crate::context::ResolutionContext;
use crate::error::ResolutionError;
use crate::nodes::NodeKind;

/// Roots namespaces with an empty `memberOf` and nests the rest under their parent.
///
/// A namespace whose `memberOf` is undefined, unresolvable, names itself or names a node that
/// cannot own children aborts the pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct NamespaceResolver;

impl KindResolver for NamespaceResolver {
    fn kind(&self) -> NodeKind {
        NodeKind::Namespace
    }

    fn resolve(&self, ctx: &mut ResolutionContext) -> Result<ResolveStats, ResolutionError> {
        let mut stats = ResolveStats::default();

        for id in ctx.store.ids_of(NodeKind::Namespace) {
            ctx.ensure_registered(id);
            let Some(node) = ctx.node(id) else {
                continue;
            };
            if node.parent.is_some() || node.saved {
                continue;
            }
            let name = node.name.clone();

            match node.member_of.clone() {
                Some(member_of) if member_of.is_empty() => {
                    if ctx.set_root(&name, id) {
                        debug!(name = %name, "root namespace");
                        stats.roots += 1;
                    }
                }
                member_of => {
                    let parent = ctx.symbols.lookup_or_fail(&name, member_of.as_deref())?;
                    let owns_children = ctx
                        .node(parent)
                        .is_some_and(|p| p.kind().is_container());
                    if parent == id || !owns_children {
                        return Err(ResolutionError::new(&name, member_of.as_deref()));
                    }
                    attach_and_record(ctx, id, parent, &mut stats);
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Node;

    #[test]
    fn empty_member_of_becomes_root() {
        let mut ctx = ResolutionContext::new();
        let plat = ctx.add(Node::root_namespace("plat")).unwrap();

        let stats = NamespaceResolver.resolve(&mut ctx).unwrap();
        assert_eq!(stats.roots, 1);
        assert_eq!(ctx.roots().get("plat"), Some(&plat));
        assert!(ctx.node(plat).unwrap().parent.is_none());
    }

    #[test]
    fn nested_namespace_attaches_regardless_of_order() {
        let mut ctx = ResolutionContext::new();
        let web = ctx.add(Node::namespace("web").with_member_of("plat")).unwrap();
        let plat = ctx.add(Node::root_namespace("plat")).unwrap();

        let stats = NamespaceResolver.resolve(&mut ctx).unwrap();
        assert_eq!(stats.attached, 1);
        let children = ctx.node(plat).unwrap().children().unwrap();
        assert_eq!(children.namespaces.get("web"), Some(&web));
        assert_eq!(ctx.node(web).unwrap().parent, Some(plat));
    }

    #[test]
    fn unresolved_member_of_is_fatal() {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::namespace("web").with_member_of("missing")).unwrap();

        let err = NamespaceResolver.resolve(&mut ctx).unwrap_err();
        assert_eq!(err, ResolutionError::new("web", Some("missing")));
    }

    #[test]
    fn undefined_member_of_is_fatal() {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::namespace("plat")).unwrap();

        let err = NamespaceResolver.resolve(&mut ctx).unwrap_err();
        assert_eq!(err.name, "plat");
        assert_eq!(err.member_of, None);
    }

    #[test]
    fn member_of_naming_a_property_is_fatal() {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::root_namespace("plat")).unwrap();
        ctx.add(Node::property("title").with_member_of("plat")).unwrap();
        ctx.add(Node::namespace("sub").with_member_of("plat.title")).unwrap();

        let err = NamespaceResolver.resolve(&mut ctx).unwrap_err();
        assert_eq!(err, ResolutionError::new("sub", Some("plat.title")));
    }

    #[test]
    fn member_of_naming_itself_is_fatal() {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::namespace("loop").with_member_of("loop")).unwrap();

        let err = NamespaceResolver.resolve(&mut ctx).unwrap_err();
        assert_eq!(err, ResolutionError::new("loop", Some("loop")));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut ctx = ResolutionContext::new();
        ctx.add(Node::root_namespace("plat")).unwrap();
        ctx.add(Node::namespace("web").with_member_of("plat")).unwrap();

        NamespaceResolver.resolve(&mut ctx).unwrap();
        let again = NamespaceResolver.resolve(&mut ctx).unwrap();
        assert_eq!(again, ResolveStats::default());
    }
}
