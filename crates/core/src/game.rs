//! Game client trait — the capability boundary to the game world.
//!
//! Everything the agent can observe or do goes through [`GameClient`]:
//! agent state, inventory, entity and block queries, world actions and chat.
//! Handlers hold an `Arc<dyn GameClient>` and never reach for ambient state,
//! which is what lets the simulated world stand in for a live server.
//!
//! Implementations: the TCP bridge client and the in-memory simulated world
//! (both in `minebrain-bridge`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::GameError;

/// A position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Vec3) -> f64 {
        let (dx, dy, dz) = (other.x - self.x, other.y - self.y, other.z - self.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// The block containing this position.
    pub fn floored(&self) -> BlockPos {
        BlockPos::new(self.x.floor() as i32, self.y.floor() as i32, self.z.floor() as i32)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Integer block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Step `distance` blocks along a face direction.
    pub fn step(&self, face: Face, distance: i32) -> Self {
        let (dx, dy, dz) = face.vector();
        self.offset(dx * distance, dy * distance, dz * distance)
    }

    /// Center of the block in world space.
    pub fn center(&self) -> Vec3 {
        Vec3::new(self.x as f64 + 0.5, self.y as f64 + 0.5, self.z as f64 + 0.5)
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One of the six axis-aligned faces of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Face {
    East,
    West,
    South,
    North,
    Up,
    Down,
}

impl Face {
    /// Order used when looking for a surface to place against:
    /// +x, -x, +z, -z, +y, -y.
    pub const SURFACE_ORDER: [Face; 6] = [
        Face::East,
        Face::West,
        Face::South,
        Face::North,
        Face::Up,
        Face::Down,
    ];

    pub fn vector(&self) -> (i32, i32, i32) {
        match self {
            Face::East => (1, 0, 0),
            Face::West => (-1, 0, 0),
            Face::South => (0, 0, 1),
            Face::North => (0, 0, -1),
            Face::Up => (0, 1, 0),
            Face::Down => (0, -1, 0),
        }
    }
}

/// Identifier of a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A tracked entity (mob, player, item, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub id: EntityId,
    /// Entity type without namespace, e.g. `zombie`, `player`.
    pub kind: String,
    /// Set for player entities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub position: Vec3,
    /// Absent when the client does not track health for this entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
}

/// A player on the server roster. `entity` is `None` when the player is out
/// of tracking range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityInfo>,
}

/// The contents of one inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub slot: u16,
    pub name: String,
    pub count: u32,
}

/// Point-in-time state of the controlled agent and the world around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub health: f32,
    pub food: u32,
    pub game_mode: String,
    pub dimension: String,
    pub time_of_day: i64,
}

/// A block in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub position: BlockPos,
    pub name: String,
}

impl Block {
    pub fn is_air(&self) -> bool {
        matches!(self.name.as_str(), "air" | "cave_air" | "void_air")
    }
}

/// Handle to an open container window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub u32);

/// A chat line seen by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub sender: String,
    pub message: String,
}

impl ChatEvent {
    pub fn new(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            message: message.into(),
        }
    }
}

/// Selects entities for nearest-entity queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum EntityFilter {
    /// Any entity other than the agent itself.
    Any,
    /// Entities of one type, namespace stripped (e.g. `pig`).
    Kind(String),
}

impl EntityFilter {
    pub fn matches(&self, entity: &EntityInfo) -> bool {
        match self {
            EntityFilter::Any => true,
            EntityFilter::Kind(kind) => entity.kind.eq_ignore_ascii_case(kind),
        }
    }
}

/// Authentication scheme used when joining a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Microsoft,
    Offline,
    Mojang,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AuthMode::Microsoft => "microsoft",
            AuthMode::Offline => "offline",
            AuthMode::Mojang => "mojang",
        })
    }
}

/// Parameters for joining a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: AuthMode,
}

/// The capability set of a connected game session.
///
/// Queries are read-only. Actions resolve when the client has accepted them;
/// navigation goals resolve once the goal is set, not when it is reached.
#[async_trait]
pub trait GameClient: Send + Sync {
    /// The agent's own username.
    fn username(&self) -> &str;

    /// Subscribe to chat lines seen by the agent.
    fn subscribe_chat(&self) -> broadcast::Receiver<ChatEvent>;

    /// Current agent and world state.
    async fn status(&self) -> Result<AgentStatus, GameError>;

    /// All occupied inventory slots.
    async fn inventory(&self) -> Result<Vec<ItemStack>, GameError>;

    /// Contents of one slot, read fresh from the client.
    async fn slot(&self, slot: u16) -> Result<Option<ItemStack>, GameError> {
        Ok(self.inventory().await?.into_iter().find(|item| item.slot == slot))
    }

    /// Every player on the roster, tracked or not.
    async fn players(&self) -> Result<Vec<PlayerInfo>, GameError>;

    /// The nearest entity matching `filter`, excluding the agent.
    async fn nearest_entity(&self, filter: &EntityFilter) -> Result<Option<EntityInfo>, GameError>;

    /// Re-read an entity by id. `None` once it has despawned or died.
    async fn entity(&self, id: EntityId) -> Result<Option<EntityInfo>, GameError>;

    /// The block at a position, `None` when the chunk is not loaded.
    async fn block_at(&self, position: BlockPos) -> Result<Option<Block>, GameError>;

    /// The nearest block named `name` within `max_distance` of the agent.
    async fn find_block(&self, name: &str, max_distance: f64) -> Result<Option<Block>, GameError>;

    /// The first non-air block along the agent's view ray.
    async fn raycast_block(&self, max_distance: f64) -> Result<Option<Block>, GameError>;

    /// Move the item in `slot` to the agent's hand.
    async fn equip(&self, slot: u16) -> Result<(), GameError>;

    /// Place the held block against `reference` on its `face` side.
    async fn place_block(&self, reference: BlockPos, face: Face) -> Result<(), GameError>;

    async fn dig(&self, position: BlockPos) -> Result<(), GameError>;

    async fn attack(&self, entity: EntityId) -> Result<(), GameError>;

    /// Hand a navigation goal to the path planner.
    async fn set_goal(&self, goal: BlockPos) -> Result<(), GameError>;

    async fn look(&self, yaw: f32, pitch: f32) -> Result<(), GameError>;

    async fn open_container(&self, position: BlockPos) -> Result<ContainerId, GameError>;

    /// Move `count` items from an inventory slot into an open container.
    async fn deposit(&self, container: ContainerId, slot: u16, count: u32) -> Result<(), GameError>;

    async fn close_container(&self, container: ContainerId) -> Result<(), GameError>;

    async fn chat(&self, text: &str) -> Result<(), GameError>;
}
