//! Built-in action handlers for Minebrain.
//!
//! One handler per command verb. Handlers act only through the
//! `GameClient` capability in their `ActionContext`, and turn every
//! capability failure into an `ActionError` for the dispatcher to report.
//!
//! | Module | Verbs |
//! |---|---|
//! | `chat` | SAY |
//! | `movement` | MOVE, LOOK, GOPLYR |
//! | `mining` | MINE |
//! | `placement` | PLACE, BUILD |
//! | `combat` | ATTACK, KILL |
//! | `inventory` | HOLD, STORE |

pub mod chat;
pub mod combat;
pub mod inventory;
pub mod mining;
pub mod movement;
pub mod placement;

use minebrain_core::{ActionContext, ActionError, Command, EntityInfo, HandlerRegistry, ItemStack, Verb};
use std::sync::Arc;

/// Create a registry with every built-in handler except `disabled` ones.
pub fn default_registry(disabled: &[Verb]) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(chat::SayHandler));
    registry.register(Arc::new(movement::MoveHandler));
    registry.register(Arc::new(movement::LookHandler));
    registry.register(Arc::new(mining::MineHandler));
    registry.register(Arc::new(placement::PlaceHandler));
    registry.register(Arc::new(placement::BuildHandler));
    registry.register(Arc::new(combat::AttackHandler));
    registry.register(Arc::new(combat::KillHandler));
    registry.register(Arc::new(movement::GoPlyrHandler));
    registry.register(Arc::new(inventory::StoreHandler));
    registry.register(Arc::new(inventory::HoldHandler));
    for verb in disabled {
        registry.disable(*verb);
    }
    registry
}

/// Error for a handler handed a command of another verb.
pub(crate) fn mismatch(expected: Verb, command: &Command) -> ActionError {
    ActionError::failed(
        expected.as_str(),
        format!("handler cannot run {}", command.verb()),
    )
}

/// Read a slot fresh and fail if it is empty.
pub(crate) async fn occupied_slot(ctx: &ActionContext, slot: u16) -> Result<ItemStack, ActionError> {
    ctx.game
        .slot(slot)
        .await?
        .ok_or_else(|| ActionError::Unresolved(format!("cannot equip empty slot {slot}")))
}

/// Look up a tracked player by name, ignoring case.
pub(crate) async fn tracked_player(ctx: &ActionContext, name: &str) -> Result<EntityInfo, ActionError> {
    ctx.game
        .players()
        .await?
        .into_iter()
        .find(|p| p.username.eq_ignore_ascii_case(name))
        .and_then(|p| p.entity)
        .ok_or_else(|| ActionError::Unresolved(format!("Player {name} not found")))
}
