//! Property and event resolvers. Both only attach; a property's declared type is linked at
//! persistence time.

use super::{attach_to_member_of, KindResolver, ResolveStats};
use crate::context::ResolutionContext;
use crate::error::ResolutionError;
use crate::nodes::NodeKind;

#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyResolver;

impl KindResolver for PropertyResolver {
    fn kind(&self) -> NodeKind {
        NodeKind::Property
    }

    fn resolve(&self, ctx: &mut ResolutionContext) -> Result<ResolveStats, ResolutionError> {
        attach_bucket(ctx, NodeKind::Property)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EventResolver;

impl KindResolver for EventResolver {
    fn kind(&self) -> NodeKind {
        NodeKind::Event
    }

    fn resolve(&self, ctx: &mut ResolutionContext) -> Result<ResolveStats, ResolutionError> {
        attach_bucket(ctx, NodeKind::Event)
    }
}

fn attach_bucket(
    ctx: &mut ResolutionContext,
    kind: NodeKind,
) -> Result<ResolveStats, ResolutionError> {
    let mut stats = ResolveStats::default();
    for id in ctx.store.ids_of(kind) {
        ctx.ensure_registered(id);
        attach_to_member_of(ctx, id, &mut stats);
    }
    Ok(stats)
}
