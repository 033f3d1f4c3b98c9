use std::collections::HashMap;

use engine::{EntityId, SceneWorld, Vec3};
use tracing::debug;

use super::props::{InteractContext, InteractOutcome, Interactable};

pub(crate) const DEFAULT_INTERACT_RADIUS: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct InteractionDispatch {
    pub(crate) entity: EntityId,
    pub(crate) index: usize,
    pub(crate) distance: f32,
    pub(crate) outcome: InteractOutcome,
}

/// Resolves one interact press to at most one interactable: the nearest one
/// that is enabled, not spent, and within both the scan radius and its own
/// range.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InteractionRouter {
    scan_radius: f32,
}

impl InteractionRouter {
    pub(crate) fn new(scan_radius: f32) -> Self {
        let scan_radius = if scan_radius.is_finite() && scan_radius >= 0.0 {
            scan_radius
        } else {
            DEFAULT_INTERACT_RADIUS
        };
        Self { scan_radius }
    }

    pub(crate) fn scan_radius(&self) -> f32 {
        self.scan_radius
    }

    /// Candidate indices, nearest first, after filtering.
    pub(crate) fn candidates<P: Interactable>(
        &self,
        world: &SceneWorld,
        origin: Vec3,
        interactables: &[P],
        index_by_entity: &HashMap<EntityId, usize>,
    ) -> Vec<(EntityId, usize, f32)> {
        world
            .query_within_radius(origin, self.scan_radius)
            .into_iter()
            .filter_map(|(entity, distance)| {
                let index = *index_by_entity.get(&entity)?;
                let candidate = interactables.get(index)?;
                let live = candidate.is_interactable() && !candidate.is_spent();
                let in_range = distance <= candidate.interact_range();
                (live && in_range).then_some((entity, index, distance))
            })
            .collect()
    }

    pub(crate) fn try_interact<P: Interactable>(
        &self,
        world: &SceneWorld,
        origin: Vec3,
        interactables: &mut [P],
        index_by_entity: &HashMap<EntityId, usize>,
        ctx: &mut InteractContext<'_>,
    ) -> Option<InteractionDispatch> {
        let Some((entity, index, distance)) = self
            .candidates(world, origin, interactables, index_by_entity)
            .into_iter()
            .next()
        else {
            debug!(radius = self.scan_radius, "interaction_no_target");
            return None;
        };
        let target = interactables.get_mut(index)?;
        ctx.distance = distance;
        let outcome = target.interact(ctx);
        debug!(entity = entity.0, index, distance, outcome = ?outcome, "interaction_dispatched");
        Some(InteractionDispatch {
            entity,
            index,
            distance,
            outcome,
        })
    }
}
