use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::input::InputSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SceneKey(String);

impl SceneKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    SwitchTo(SceneKey),
    HardResetTo(SceneKey),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance_squared(self, other: Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(self, other: Vec3) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn offset(self, dx: f32, dy: f32, dz: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub yaw_radians: f32,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            yaw_radians: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugInfoSnapshot {
    pub entity_count: usize,
    pub interactable_count: usize,
    pub system_order: String,
    pub extra_debug_lines: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub transform: Transform,
    pub name: String,
    pub player: bool,
    applied_spawn_order: u64,
}

impl Entity {
    pub fn applied_spawn_order(&self) -> u64 {
        self.applied_spawn_order
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    next_applied_spawn_order: u64,
}

impl SceneWorld {
    pub fn spawn(&mut self, transform: Transform, name: impl Into<String>) -> EntityId {
        self.spawn_internal(transform, name.into(), false)
    }

    pub fn spawn_player(&mut self, transform: Transform) -> EntityId {
        self.spawn_internal(transform, "player".to_string(), true)
    }

    fn spawn_internal(&mut self, transform: Transform, name: String, player: bool) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            transform,
            name,
            player,
            applied_spawn_order: 0,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_spawns.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_despawns.clear();
        }

        for mut entity in self.pending_spawns.drain(..) {
            entity.applied_spawn_order = self.next_applied_spawn_order;
            self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
            self.entities.push(entity);
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.next_applied_spawn_order = 0;
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.player)
    }

    pub fn player_mut(&mut self) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.player)
    }

    /// Non-player entities with `distance <= radius` from `origin`, nearest
    /// first. Equal distances keep spawn order.
    pub fn query_within_radius(&self, origin: Vec3, radius: f32) -> Vec<(EntityId, f32)> {
        if !radius.is_finite() || radius < 0.0 {
            return Vec::new();
        }
        let radius_sq = radius * radius;
        let mut hits: Vec<(&Entity, f32)> = self
            .entities
            .iter()
            .filter(|entity| !entity.player)
            .filter_map(|entity| {
                let distance_sq = origin.distance_squared(entity.transform.position);
                (distance_sq <= radius_sq).then_some((entity, distance_sq))
            })
            .collect();
        hits.sort_by(|(left, left_sq), (right, right_sq)| {
            left_sq
                .total_cmp(right_sq)
                .then(left.applied_spawn_order.cmp(&right.applied_spawn_order))
        });
        hits.into_iter()
            .map(|(entity, distance_sq)| (entity.id, distance_sq.sqrt()))
            .collect()
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
    fn debug_info_snapshot(&self, _world: &SceneWorld) -> Option<DebugInfoSnapshot> {
        None
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneMachineError {
    #[error("scene '{0}' is not registered")]
    UnknownScene(SceneKey),
}

struct SceneRuntime {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

pub struct SceneMachine {
    runtimes: BTreeMap<SceneKey, SceneRuntime>,
    active_scene: SceneKey,
}

impl SceneMachine {
    pub fn new(
        scenes: Vec<(SceneKey, Box<dyn Scene>)>,
        active_scene: SceneKey,
    ) -> Result<Self, SceneMachineError> {
        let runtimes: BTreeMap<SceneKey, SceneRuntime> = scenes
            .into_iter()
            .map(|(key, scene)| {
                (
                    key,
                    SceneRuntime {
                        scene,
                        world: SceneWorld::default(),
                        is_loaded: false,
                    },
                )
            })
            .collect();
        if !runtimes.contains_key(&active_scene) {
            return Err(SceneMachineError::UnknownScene(active_scene));
        }
        Ok(Self {
            runtimes,
            active_scene,
        })
    }

    pub fn active_scene(&self) -> &SceneKey {
        &self.active_scene
    }

    pub fn load_active(&mut self) {
        let key = self.active_scene.clone();
        self.load_scene_if_needed(&key);
    }

    pub fn update_active(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        match self.runtimes.get_mut(&self.active_scene) {
            Some(runtime) => {
                let (scene, world) = (&mut runtime.scene, &mut runtime.world);
                scene.update(fixed_dt_seconds, input, world)
            }
            None => SceneCommand::None,
        }
    }

    pub fn apply_pending_active(&mut self) {
        if let Some(runtime) = self.runtimes.get_mut(&self.active_scene) {
            runtime.world.apply_pending();
        }
    }

    pub fn active_world(&self) -> Option<&SceneWorld> {
        self.runtimes
            .get(&self.active_scene)
            .map(|runtime| &runtime.world)
    }

    #[cfg(test)]
    pub(crate) fn active_world_mut(&mut self) -> Option<&mut SceneWorld> {
        self.runtimes
            .get_mut(&self.active_scene)
            .map(|runtime| &mut runtime.world)
    }

    pub fn debug_title_active(&self) -> Option<String> {
        let runtime = self.runtimes.get(&self.active_scene)?;
        runtime.scene.debug_title(&runtime.world)
    }

    pub fn debug_info_snapshot_active(&self) -> Option<DebugInfoSnapshot> {
        let runtime = self.runtimes.get(&self.active_scene)?;
        runtime.scene.debug_info_snapshot(&runtime.world)
    }

    /// Activates `next_scene`, loading it first if it has never been loaded.
    /// Returns `Ok(false)` when it is already active.
    pub fn switch_to(&mut self, next_scene: &SceneKey) -> Result<bool, SceneMachineError> {
        if !self.runtimes.contains_key(next_scene) {
            return Err(SceneMachineError::UnknownScene(next_scene.clone()));
        }
        if &self.active_scene == next_scene {
            return Ok(false);
        }

        self.load_scene_if_needed(next_scene);
        self.active_scene = next_scene.clone();
        Ok(true)
    }

    /// Unloads (if loaded), clears and reloads `next_scene`, then activates it.
    pub fn hard_reset_to(&mut self, next_scene: &SceneKey) -> Result<bool, SceneMachineError> {
        let runtime = self
            .runtimes
            .get_mut(next_scene)
            .ok_or_else(|| SceneMachineError::UnknownScene(next_scene.clone()))?;
        if runtime.is_loaded {
            let (scene, world) = (&mut runtime.scene, &mut runtime.world);
            scene.unload(world);
        }
        runtime.world.clear();
        {
            let (scene, world) = (&mut runtime.scene, &mut runtime.world);
            scene.load(world);
        }
        runtime.is_loaded = true;
        let changed = &self.active_scene != next_scene;
        self.active_scene = next_scene.clone();
        Ok(changed)
    }

    pub fn shutdown_all(&mut self) {
        for runtime in self.runtimes.values_mut() {
            if runtime.is_loaded {
                let (scene, world) = (&mut runtime.scene, &mut runtime.world);
                scene.unload(world);
                runtime.world.clear();
                runtime.is_loaded = false;
            }
        }
    }

    fn load_scene_if_needed(&mut self, key: &SceneKey) {
        let Some(runtime) = self.runtimes.get_mut(key) else {
            return;
        };
        if runtime.is_loaded {
            return;
        }
        {
            let (scene, world) = (&mut runtime.scene, &mut runtime.world);
            scene.load(world);
        }
        runtime.is_loaded = true;
    }
}
