//! In-memory game world.
//!
//! `SimWorld` implements [`GameClient`] against a small block grid, an entity
//! table and an inventory, and records every side-effecting call. It backs
//! the `offline` command and serves as the test double for handlers and the
//! pipeline.

use async_trait::async_trait;
use minebrain_core::{
    AgentStatus, Block, BlockPos, ChatEvent, ContainerId, EntityFilter, EntityId, EntityInfo, Face,
    GameClient, GameError, ItemStack, PlayerInfo, Vec3,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;

const EYE_HEIGHT: f64 = 1.62;

/// A side-effecting capability call, as recorded by [`SimWorld`].
#[derive(Debug, Clone, PartialEq)]
pub enum GameCall {
    Chat(String),
    Equip(u16),
    PlaceBlock { reference: BlockPos, face: Face },
    Dig(BlockPos),
    Attack(EntityId),
    SetGoal(BlockPos),
    Look { yaw: f32, pitch: f32 },
    OpenContainer(BlockPos),
    Deposit { container: ContainerId, slot: u16, count: u32 },
    CloseContainer(ContainerId),
}

struct SimState {
    status: AgentStatus,
    inventory: BTreeMap<u16, ItemStack>,
    held: Option<u16>,
    blocks: HashMap<BlockPos, String>,
    entities: BTreeMap<EntityId, EntityInfo>,
    roster: BTreeMap<String, Option<EntityId>>,
    chests: HashMap<BlockPos, Vec<ItemStack>>,
    open: HashMap<ContainerId, BlockPos>,
    next_entity: u32,
    next_container: u32,
    attack_damage: f32,
    teleport_on_goal: bool,
    failures: HashMap<&'static str, Failure>,
    calls: Vec<GameCall>,
}

/// An injected failure. The first `skip` calls still succeed, then the
/// next `times` calls fail (every later call when `None`).
struct Failure {
    skip: usize,
    times: Option<usize>,
    error: GameError,
}

/// A simulated single-player world.
pub struct SimWorld {
    username: String,
    state: Mutex<SimState>,
    chat_tx: broadcast::Sender<ChatEvent>,
}

impl SimWorld {
    /// An empty overworld with the agent standing at (0.5, 64, 0.5).
    pub fn new(username: impl Into<String>) -> Self {
        let (chat_tx, _) = broadcast::channel(256);
        Self {
            username: username.into(),
            state: Mutex::new(SimState {
                status: AgentStatus {
                    position: Vec3::new(0.5, 64.0, 0.5),
                    yaw: 0.0,
                    pitch: 0.0,
                    health: 20.0,
                    food: 20,
                    game_mode: "survival".into(),
                    dimension: "overworld".into(),
                    time_of_day: 1000,
                },
                inventory: BTreeMap::new(),
                held: None,
                blocks: HashMap::new(),
                entities: BTreeMap::new(),
                roster: BTreeMap::new(),
                chests: HashMap::new(),
                open: HashMap::new(),
                next_entity: 1,
                next_container: 1,
                attack_damage: 4.0,
                teleport_on_goal: true,
                failures: HashMap::new(),
                calls: Vec::new(),
            }),
            chat_tx,
        }
    }

    /// Lay a square floor of `name` at `y` under the agent.
    pub fn with_floor(self, y: i32, radius: i32, name: &str) -> Self {
        self.fill(BlockPos::new(-radius, y, -radius), BlockPos::new(radius, y, radius), name);
        self
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // --- World setup ---

    pub fn set_block(&self, position: BlockPos, name: &str) {
        let mut state = self.state();
        if name == "air" {
            state.blocks.remove(&position);
        } else {
            state.blocks.insert(position, name.to_string());
        }
    }

    /// Fill the inclusive box between two corners.
    pub fn fill(&self, from: BlockPos, to: BlockPos, name: &str) {
        for x in from.x.min(to.x)..=from.x.max(to.x) {
            for y in from.y.min(to.y)..=from.y.max(to.y) {
                for z in from.z.min(to.z)..=from.z.max(to.z) {
                    self.set_block(BlockPos::new(x, y, z), name);
                }
            }
        }
    }

    pub fn give(&self, slot: u16, name: &str, count: u32) {
        self.state().inventory.insert(
            slot,
            ItemStack {
                slot,
                name: name.to_string(),
                count,
            },
        );
    }

    pub fn update_status(&self, update: impl FnOnce(&mut AgentStatus)) {
        update(&mut self.state().status);
    }

    pub fn spawn_entity(&self, kind: &str, position: Vec3, health: f32) -> EntityId {
        let mut state = self.state();
        let id = EntityId(state.next_entity);
        state.next_entity += 1;
        state.entities.insert(
            id,
            EntityInfo {
                id,
                kind: kind.to_string(),
                username: None,
                position,
                health: Some(health),
            },
        );
        id
    }

    /// Add a player to the roster. Players without a position are listed but
    /// not tracked as entities.
    pub fn add_player(&self, username: &str, position: Option<Vec3>) -> Option<EntityId> {
        let id = position.map(|position| {
            let id = self.spawn_entity("player", position, 20.0);
            if let Some(entity) = self.state().entities.get_mut(&id) {
                entity.username = Some(username.to_string());
            }
            id
        });
        self.state().roster.insert(username.to_string(), id);
        id
    }

    pub fn remove_entity(&self, id: EntityId) {
        let mut state = self.state();
        state.entities.remove(&id);
        for tracked in state.roster.values_mut() {
            if *tracked == Some(id) {
                *tracked = None;
            }
        }
    }

    pub fn set_attack_damage(&self, damage: f32) {
        self.state().attack_damage = damage;
    }

    /// Move the agent to each navigation goal as soon as it is set.
    pub fn set_teleport_on_goal(&self, enabled: bool) {
        self.state().teleport_on_goal = enabled;
    }

    /// Make every call to `op` (e.g. `"dig"`, `"set_goal"`) fail with `error`.
    pub fn fail(&self, op: &'static str, error: GameError) {
        self.inject(op, 0, None, error);
    }

    /// Let `skip` calls to `op` through, then fail every later one.
    pub fn fail_after(&self, op: &'static str, skip: usize, error: GameError) {
        self.inject(op, skip, None, error);
    }

    /// Fail only the next `times` calls to `op`.
    pub fn fail_times(&self, op: &'static str, times: usize, error: GameError) {
        self.inject(op, 0, Some(times), error);
    }

    fn inject(&self, op: &'static str, skip: usize, times: Option<usize>, error: GameError) {
        self.state().failures.insert(op, Failure { skip, times, error });
    }

    /// Deliver a chat line as if `sender` had typed it.
    pub fn say_as(&self, sender: &str, message: &str) {
        let _ = self.chat_tx.send(ChatEvent::new(sender, message));
    }

    // --- Inspection ---

    pub fn calls(&self) -> Vec<GameCall> {
        self.state().calls.clone()
    }

    /// Lines the agent has said, in order.
    pub fn said(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GameCall::Chat(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn block(&self, position: BlockPos) -> String {
        self.state()
            .blocks
            .get(&position)
            .cloned()
            .unwrap_or_else(|| "air".into())
    }

    pub fn held_slot(&self) -> Option<u16> {
        self.state().held
    }

    pub fn item(&self, slot: u16) -> Option<ItemStack> {
        self.state().inventory.get(&slot).cloned()
    }

    pub fn chest_contents(&self, position: BlockPos) -> Vec<ItemStack> {
        self.state().chests.get(&position).cloned().unwrap_or_default()
    }

    pub fn entity_health(&self, id: EntityId) -> Option<f32> {
        self.state().entities.get(&id).and_then(|e| e.health)
    }

    pub fn position(&self) -> Vec3 {
        self.state().status.position
    }

    pub fn open_containers(&self) -> usize {
        self.state().open.len()
    }
}

impl SimState {
    fn record(&mut self, op: &'static str, call: GameCall) -> Result<(), GameError> {
        self.calls.push(call);
        self.check(op)
    }

    fn check(&mut self, op: &'static str) -> Result<(), GameError> {
        match self.failures.get_mut(op) {
            Some(failure) if failure.skip > 0 => {
                failure.skip -= 1;
                Ok(())
            }
            Some(failure) => match failure.times {
                Some(0) => Ok(()),
                Some(ref mut left) => {
                    *left -= 1;
                    Err(failure.error.clone())
                }
                None => Err(failure.error.clone()),
            },
            None => Ok(()),
        }
    }

    fn block_name(&self, position: &BlockPos) -> &str {
        self.blocks.get(position).map(String::as_str).unwrap_or("air")
    }

    fn block(&self, position: BlockPos) -> Block {
        Block {
            position,
            name: self.block_name(&position).to_string(),
        }
    }
}

/// Unit view vector for a yaw/pitch pair (yaw 0 faces -z).
fn view_direction(yaw: f32, pitch: f32) -> Vec3 {
    let (yaw, pitch) = (yaw as f64, pitch as f64);
    Vec3::new(-yaw.sin() * pitch.cos(), pitch.sin(), -yaw.cos() * pitch.cos())
}

/// Per-axis stepping for a voxel walk: the cell step, the ray distance to the
/// first cell boundary, and the distance between boundaries.
fn axis_walk(origin: f64, cell: i32, dir: f64) -> (i32, f64, f64) {
    if dir > 0.0 {
        (1, (cell as f64 + 1.0 - origin) / dir, 1.0 / dir)
    } else if dir < 0.0 {
        (-1, (origin - cell as f64) / -dir, -1.0 / dir)
    } else {
        (0, f64::INFINITY, f64::INFINITY)
    }
}

#[async_trait]
impl GameClient for SimWorld {
    fn username(&self) -> &str {
        &self.username
    }

    fn subscribe_chat(&self) -> broadcast::Receiver<ChatEvent> {
        self.chat_tx.subscribe()
    }

    async fn status(&self) -> Result<AgentStatus, GameError> {
        let mut state = self.state();
        state.check("status")?;
        Ok(state.status.clone())
    }

    async fn inventory(&self) -> Result<Vec<ItemStack>, GameError> {
        let mut state = self.state();
        state.check("inventory")?;
        Ok(state.inventory.values().cloned().collect())
    }

    async fn players(&self) -> Result<Vec<PlayerInfo>, GameError> {
        let mut state = self.state();
        state.check("players")?;
        Ok(state
            .roster
            .iter()
            .map(|(username, id)| PlayerInfo {
                username: username.clone(),
                entity: id.and_then(|id| state.entities.get(&id).cloned()),
            })
            .collect())
    }

    async fn nearest_entity(&self, filter: &EntityFilter) -> Result<Option<EntityInfo>, GameError> {
        let mut state = self.state();
        state.check("nearest_entity")?;
        let origin = state.status.position;
        Ok(state
            .entities
            .values()
            .filter(|e| filter.matches(e))
            .min_by(|a, b| {
                origin
                    .distance_to(&a.position)
                    .total_cmp(&origin.distance_to(&b.position))
            })
            .cloned())
    }

    async fn entity(&self, id: EntityId) -> Result<Option<EntityInfo>, GameError> {
        let mut state = self.state();
        state.check("entity")?;
        Ok(state.entities.get(&id).cloned())
    }

    async fn block_at(&self, position: BlockPos) -> Result<Option<Block>, GameError> {
        let mut state = self.state();
        state.check("block_at")?;
        Ok(Some(state.block(position)))
    }

    async fn find_block(&self, name: &str, max_distance: f64) -> Result<Option<Block>, GameError> {
        let mut state = self.state();
        state.check("find_block")?;
        let origin = state.status.position;
        Ok(state
            .blocks
            .iter()
            .filter(|(_, block)| block.as_str() == name)
            .map(|(pos, _)| (pos, origin.distance_to(&pos.center())))
            .filter(|(_, distance)| *distance <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(pos, _)| state.block(*pos)))
    }

    async fn raycast_block(&self, max_distance: f64) -> Result<Option<Block>, GameError> {
        let mut state = self.state();
        state.check("raycast_block")?;
        let eye = state.status.position;
        let eye = Vec3::new(eye.x, eye.y + EYE_HEIGHT, eye.z);
        let dir = view_direction(state.status.yaw, state.status.pitch);

        // Voxel traversal: visit every cell the ray passes through, in order.
        let mut cell = eye.floored();
        let (step_x, mut next_x, delta_x) = axis_walk(eye.x, cell.x, dir.x);
        let (step_y, mut next_y, delta_y) = axis_walk(eye.y, cell.y, dir.y);
        let (step_z, mut next_z, delta_z) = axis_walk(eye.z, cell.z, dir.z);
        let mut travelled = 0.0;
        while travelled <= max_distance {
            if state.blocks.contains_key(&cell) {
                return Ok(Some(state.block(cell)));
            }
            if next_x < next_y && next_x < next_z {
                cell.x += step_x;
                travelled = next_x;
                next_x += delta_x;
            } else if next_y < next_z {
                cell.y += step_y;
                travelled = next_y;
                next_y += delta_y;
            } else {
                cell.z += step_z;
                travelled = next_z;
                next_z += delta_z;
            }
        }
        Ok(None)
    }

    async fn equip(&self, slot: u16) -> Result<(), GameError> {
        let mut state = self.state();
        state.record("equip", GameCall::Equip(slot))?;
        if !state.inventory.contains_key(&slot) {
            return Err(GameError::Rejected(format!("slot {slot} is empty")));
        }
        state.held = Some(slot);
        Ok(())
    }

    async fn place_block(&self, reference: BlockPos, face: Face) -> Result<(), GameError> {
        let mut state = self.state();
        state.record("place_block", GameCall::PlaceBlock { reference, face })?;

        let slot = state
            .held
            .ok_or_else(|| GameError::Rejected("not holding anything".into()))?;
        let name = state
            .inventory
            .get(&slot)
            .map(|item| item.name.clone())
            .ok_or_else(|| GameError::Rejected("held slot is empty".into()))?;

        if state.block_name(&reference) == "air" {
            return Err(GameError::Rejected(format!("no block to place against at {reference}")));
        }
        let target = reference.step(face, 1);
        if state.block_name(&target) != "air" {
            return Err(GameError::Rejected(format!("{target} is occupied")));
        }

        state.blocks.insert(target, name);
        if let Some(item) = state.inventory.get_mut(&slot) {
            item.count -= 1;
            if item.count == 0 {
                state.inventory.remove(&slot);
                state.held = None;
            }
        }
        debug!(%target, "sim: block placed");
        Ok(())
    }

    async fn dig(&self, position: BlockPos) -> Result<(), GameError> {
        let mut state = self.state();
        state.record("dig", GameCall::Dig(position))?;
        state
            .blocks
            .remove(&position)
            .map(|_| ())
            .ok_or_else(|| GameError::Rejected(format!("nothing to dig at {position}")))
    }

    async fn attack(&self, entity: EntityId) -> Result<(), GameError> {
        let mut state = self.state();
        state.record("attack", GameCall::Attack(entity))?;
        let damage = state.attack_damage;
        let target = state
            .entities
            .get_mut(&entity)
            .ok_or_else(|| GameError::NotFound(format!("entity {entity}")))?;

        let health = target.health.map(|h| (h - damage).max(0.0));
        target.health = health;
        if health == Some(0.0) {
            state.entities.remove(&entity);
            for tracked in state.roster.values_mut() {
                if *tracked == Some(entity) {
                    *tracked = None;
                }
            }
            debug!(%entity, "sim: entity died");
        }
        Ok(())
    }

    async fn set_goal(&self, goal: BlockPos) -> Result<(), GameError> {
        let mut state = self.state();
        state.record("set_goal", GameCall::SetGoal(goal))?;
        if state.teleport_on_goal {
            state.status.position = Vec3::new(goal.x as f64 + 0.5, goal.y as f64, goal.z as f64 + 0.5);
        }
        Ok(())
    }

    async fn look(&self, yaw: f32, pitch: f32) -> Result<(), GameError> {
        let mut state = self.state();
        state.record("look", GameCall::Look { yaw, pitch })?;
        state.status.yaw = yaw;
        state.status.pitch = pitch;
        Ok(())
    }

    async fn open_container(&self, position: BlockPos) -> Result<ContainerId, GameError> {
        let mut state = self.state();
        state.record("open_container", GameCall::OpenContainer(position))?;
        if !state.block_name(&position).ends_with("chest") {
            return Err(GameError::Rejected(format!("no container at {position}")));
        }
        let id = ContainerId(state.next_container);
        state.next_container += 1;
        state.open.insert(id, position);
        Ok(id)
    }

    async fn deposit(&self, container: ContainerId, slot: u16, count: u32) -> Result<(), GameError> {
        let mut state = self.state();
        state.record("deposit", GameCall::Deposit { container, slot, count })?;
        let chest = *state
            .open
            .get(&container)
            .ok_or_else(|| GameError::Rejected("container is not open".into()))?;
        let mut item = state
            .inventory
            .get(&slot)
            .cloned()
            .ok_or_else(|| GameError::Rejected(format!("slot {slot} is empty")))?;
        if item.count < count {
            return Err(GameError::Rejected(format!(
                "slot {slot} holds {} {}, not {count}",
                item.count, item.name
            )));
        }

        if item.count == count {
            state.inventory.remove(&slot);
            if state.held == Some(slot) {
                state.held = None;
            }
        } else if let Some(stack) = state.inventory.get_mut(&slot) {
            stack.count -= count;
        }
        item.count = count;
        state.chests.entry(chest).or_default().push(item);
        Ok(())
    }

    async fn close_container(&self, container: ContainerId) -> Result<(), GameError> {
        let mut state = self.state();
        state.record("close_container", GameCall::CloseContainer(container))?;
        state
            .open
            .remove(&container)
            .map(|_| ())
            .ok_or_else(|| GameError::Rejected("container is not open".into()))
    }

    async fn chat(&self, text: &str) -> Result<(), GameError> {
        self.state().record("chat", GameCall::Chat(text.to_string()))?;
        // Servers echo the agent's own chat back to it.
        let _ = self.chat_tx.send(ChatEvent::new(&self.username, text));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn place_needs_a_reference_block() {
        let world = SimWorld::new("bot").with_floor(63, 2, "stone");
        world.give(1, "dirt", 2);
        world.equip(1).await.unwrap();

        let floor = BlockPos::new(1, 63, 0);
        world.place_block(floor, Face::Up).await.unwrap();
        assert_eq!(world.block(BlockPos::new(1, 64, 0)), "dirt");

        let err = world.place_block(BlockPos::new(5, 70, 5), Face::Up).await.unwrap_err();
        assert!(matches!(err, GameError::Rejected(_)));
        assert_eq!(world.item(1).unwrap().count, 1);
    }

    #[tokio::test]
    async fn placing_last_item_empties_the_hand() {
        let world = SimWorld::new("bot").with_floor(63, 1, "stone");
        world.give(3, "glass", 1);
        world.equip(3).await.unwrap();
        world.place_block(BlockPos::new(0, 63, 0), Face::Up).await.unwrap();
        assert!(world.item(3).is_none());
        assert!(world.held_slot().is_none());
    }

    #[tokio::test]
    async fn attack_kills_and_untracks() {
        let world = SimWorld::new("bot");
        let steve = world.add_player("Steve", Some(Vec3::new(3.0, 64.0, 0.0))).unwrap();
        world.set_attack_damage(10.0);

        world.attack(steve).await.unwrap();
        assert_eq!(world.entity_health(steve), Some(10.0));
        world.attack(steve).await.unwrap();
        assert!(world.entity(steve).await.unwrap().is_none());

        let players = world.players().await.unwrap();
        assert_eq!(players.len(), 1);
        assert!(players[0].entity.is_none());
    }

    #[tokio::test]
    async fn raycast_finds_block_in_view() {
        let world = SimWorld::new("bot");
        // Eye at y=65.62 facing -z.
        world.set_block(BlockPos::new(0, 65, -3), "oak_log");
        let hit = world.raycast_block(5.0).await.unwrap().unwrap();
        assert_eq!(hit.position, BlockPos::new(0, 65, -3));

        let miss = world.raycast_block(2.0).await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn raycast_catches_a_clipped_corner() {
        let world = SimWorld::new("bot");
        // The ray crosses x=1 at z≈-1.992 and clips the cell for under 0.01.
        world.update_status(|s| s.yaw = -0.198);
        world.set_block(BlockPos::new(1, 65, -2), "stone");
        let hit = world.raycast_block(5.0).await.unwrap().unwrap();
        assert_eq!(hit.position, BlockPos::new(1, 65, -2));
    }

    #[tokio::test]
    async fn find_block_respects_radius() {
        let world = SimWorld::new("bot");
        world.set_block(BlockPos::new(20, 64, 0), "chest");
        assert!(world.find_block("chest", 10.0).await.unwrap().is_none());
        world.set_block(BlockPos::new(4, 64, 0), "chest");
        let found = world.find_block("chest", 10.0).await.unwrap().unwrap();
        assert_eq!(found.position, BlockPos::new(4, 64, 0));
    }

    #[tokio::test]
    async fn injected_failures_are_recorded() {
        let world = SimWorld::new("bot");
        world.fail("set_goal", GameError::Rejected("no path".into()));
        let err = world.set_goal(BlockPos::new(10, 64, 10)).await.unwrap_err();
        assert_eq!(err, GameError::Rejected("no path".into()));
        assert_eq!(world.calls(), vec![GameCall::SetGoal(BlockPos::new(10, 64, 10))]);
        assert_eq!(world.position(), Vec3::new(0.5, 64.0, 0.5));
    }

    #[tokio::test]
    async fn counted_failures_wear_off() {
        let world = SimWorld::new("bot");
        world.give(1, "dirt", 3);
        world.fail_after("inventory", 1, GameError::Disconnected("bridge closed".into()));
        assert!(world.inventory().await.is_ok());
        assert!(world.inventory().await.is_err());
        assert!(world.inventory().await.is_err());

        world.fail_times("status", 2, GameError::Timeout(5));
        assert_eq!(world.status().await.unwrap_err(), GameError::Timeout(5));
        assert_eq!(world.status().await.unwrap_err(), GameError::Timeout(5));
        assert!(world.status().await.is_ok());
    }

    #[tokio::test]
    async fn own_chat_is_echoed() {
        let world = SimWorld::new("bot");
        let mut rx = world.subscribe_chat();
        world.chat("hello").await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event, ChatEvent::new("bot", "hello"));
        assert_eq!(world.said(), vec!["hello".to_string()]);
    }
}
