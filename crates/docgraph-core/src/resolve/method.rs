use tracing::debug;

use super::{attach_to_member_of, claim_type_parameters, KindResolver, ResolveStats};
use crate::context::ResolutionContext;
use crate::error::ResolutionError;
use crate::nodes::{NodeId, NodeKind, TypeLink};

/// Resolves return and parameter types of every overload, then attaches each method to its
/// parent's method collection under the upper-cased name.
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodResolver;

impl KindResolver for MethodResolver {
    fn kind(&self) -> NodeKind {
        NodeKind::Method
    }

    fn resolve(&self, ctx: &mut ResolutionContext) -> Result<ResolveStats, ResolutionError> {
        let mut stats = ResolveStats::default();
        let overloads: Vec<NodeId> = ctx
            .store
            .methods()
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();

        for &id in &overloads {
            ctx.ensure_registered(id);
        }

        for id in overloads {
            stats.unresolved_references += resolve_return_type(ctx, id);
            stats.unresolved_references += resolve_parameters(ctx, id);
            claim_type_parameters(ctx, id);
            attach_to_member_of(ctx, id, &mut stats);
        }

        Ok(stats)
    }
}

/// Link `return_type_name` to a namespace, class or interface. Returns 1 when the name is left
/// unassigned.
fn resolve_return_type(ctx: &mut ResolutionContext, id: NodeId) -> usize {
    let Some(method) = ctx.node(id).and_then(|node| node.as_method()) else {
        return 0;
    };
    if method.return_type.is_resolved() {
        return 0;
    }
    let Some(type_name) = method.return_type_name.as_deref() else {
        return 0;
    };

    let link = match ctx.resolve_type(type_name) {
        Some((target, NodeKind::Namespace)) => TypeLink::Namespace(target),
        Some((target, NodeKind::Class)) => TypeLink::Class(target),
        Some((target, NodeKind::Interface)) => TypeLink::Interface(target),
        other => {
            debug!(
                return_type = %type_name,
                resolved_kind = ?other.map(|(_, kind)| kind),
                "return type left unassigned"
            );
            return 1;
        }
    };

    if let Some(method) = ctx.node_mut(id).and_then(|node| node.as_method_mut()) {
        method.return_type = link;
    }
    0
}

/// Point each parameter at its method and link its type. Returns the number of typed parameters
/// whose type did not resolve.
fn resolve_parameters(ctx: &mut ResolutionContext, id: NodeId) -> usize {
    let Some(method) = ctx.node(id).and_then(|node| node.as_method()) else {
        return 0;
    };

    let mut unresolved = 0;
    let links: Vec<TypeLink> = method
        .parameters
        .iter()
        .map(|param| {
            if param.type_link.is_resolved() {
                return param.type_link;
            }
            let Some(type_name) = param.type_name.as_deref() else {
                return TypeLink::Unresolved;
            };
            match ctx.resolve_type(type_name) {
                Some((target, NodeKind::Class)) => TypeLink::Class(target),
                Some((target, NodeKind::Interface)) => TypeLink::Interface(target),
                Some((target, NodeKind::Method)) => TypeLink::Method(target),
                _ => {
                    debug!(parameter = %param.name, type_name = %type_name, "parameter type unresolved");
                    unresolved += 1;
                    TypeLink::Unresolved
                }
            }
        })
        .collect();

    if let Some(method) = ctx.node_mut(id).and_then(|node| node.as_method_mut()) {
        for (param, link) in method.parameters.iter_mut().zip(links) {
            param.method = Some(id);
            param.type_link = link;
        }
    }
    unresolved
}
