//! World Snapshot Builder.
//!
//! A snapshot is rebuilt for every inference call and dropped once the
//! prompt is assembled. Redacted sections render as a fixed marker so the
//! block has the same shape whatever the agent's privileges.

use minebrain_core::{GameClient, GameError, ItemStack, Vec3};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const UNKNOWN: &str = "-- Unknown --";
const EMPTY: &str = "-- Empty --";
const NOBODY: &str = "-- None --";

/// How much of the world the model is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Agent state only; roster and world info are redacted.
    #[default]
    Restricted,
    /// Admin view: roster and world info included.
    Elevated,
}

impl Visibility {
    pub fn from_admin(admin: bool) -> Self {
        if admin { Self::Elevated } else { Self::Restricted }
    }
}

/// A tracked player and where they stand.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntry {
    pub username: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldInfo {
    pub time_of_day: i64,
    pub dimension: String,
}

/// Point-in-time view of the agent and its surroundings.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    /// `None` when redacted or unavailable.
    pub players: Option<Vec<PlayerEntry>>,
    /// Occupied slots, ordered by slot index.
    pub inventory: Vec<ItemStack>,
    pub health: f32,
    pub food: u32,
    pub game_mode: String,
    /// `None` when redacted.
    pub world: Option<WorldInfo>,
}

impl WorldSnapshot {
    /// Render the snapshot as the system entry sent with a request.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WorldSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Players Info:")?;
        match &self.players {
            None => writeln!(f, "{UNKNOWN}")?,
            Some(players) if players.is_empty() => writeln!(f, "{NOBODY}")?,
            Some(players) => {
                for player in players {
                    writeln!(f, "{} at {}", player.username, player.position)?;
                }
            }
        }

        writeln!(f, "\nBot Inventory:")?;
        if self.inventory.is_empty() {
            writeln!(f, "{EMPTY}")?;
        }
        for item in &self.inventory {
            writeln!(f, "Slot ID {}: {} x{}", item.slot, item.name, item.count)?;
        }

        writeln!(f, "\nBot Stats:")?;
        writeln!(f, "Health: {}", self.health)?;
        writeln!(f, "Hunger: {}", self.food)?;
        writeln!(f, "Gamemode: {}", self.game_mode)?;

        writeln!(f, "\nWorld Info:")?;
        match &self.world {
            Some(world) => {
                writeln!(f, "Time: {}", world.time_of_day)?;
                write!(f, "Dimension: {}", world.dimension)
            }
            None => write!(f, "{UNKNOWN}"),
        }
    }
}

/// Reads a [`WorldSnapshot`] through the game client. Never mutates the world.
pub struct SnapshotBuilder {
    game: Arc<dyn GameClient>,
}

impl SnapshotBuilder {
    pub fn new(game: Arc<dyn GameClient>) -> Self {
        Self { game }
    }

    pub async fn build(&self, visibility: Visibility) -> Result<WorldSnapshot, GameError> {
        let status = self.game.status().await?;
        let mut inventory = self.game.inventory().await?;
        inventory.sort_by_key(|item| item.slot);

        let (players, world) = match visibility {
            Visibility::Restricted => (None, None),
            Visibility::Elevated => {
                let world = WorldInfo {
                    time_of_day: status.time_of_day,
                    dimension: status.dimension.clone(),
                };
                (self.roster().await, Some(world))
            }
        };

        Ok(WorldSnapshot {
            players,
            inventory,
            health: status.health,
            food: status.food,
            game_mode: status.game_mode,
            world,
        })
    }

    /// Tracked players only; a player without entity data is skipped.
    async fn roster(&self) -> Option<Vec<PlayerEntry>> {
        let players = match self.game.players().await {
            Ok(players) => players,
            Err(e) => {
                warn!(error = %e, "Player roster unavailable, rendering as unknown");
                return None;
            }
        };

        let mut entries = Vec::with_capacity(players.len());
        for player in players {
            match player.entity {
                Some(entity) if entity.position.is_finite() => entries.push(PlayerEntry {
                    username: player.username,
                    position: entity.position,
                }),
                _ => debug!(player = %player.username, "Skipping untracked player"),
            }
        }
        Some(entries)
    }
}
