//! HOLD and STORE.

use async_trait::async_trait;
use minebrain_core::{ActionContext, ActionError, ActionHandler, ActionOutcome, Command, ExecutionMode, Verb};
use tracing::warn;

/// Block name searched for by STORE.
const CHEST: &str = "chest";

pub struct HoldHandler;

#[async_trait]
impl ActionHandler for HoldHandler {
    fn verb(&self) -> Verb {
        Verb::Hold
    }

    fn usage(&self) -> &str {
        "HOLD <slotId>"
    }

    fn description(&self) -> &str {
        "Holds the item from the specified inventory slot."
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::AwaitCompletion
    }

    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
        let Command::Hold { slot } = *command else {
            return Err(crate::mismatch(self.verb(), command));
        };
        let item = crate::occupied_slot(ctx, slot).await?;
        ctx.game.equip(slot).await?;
        Ok(ActionOutcome::quiet(format!("holding {} x{}", item.name, item.count)))
    }
}

pub struct StoreHandler;

#[async_trait]
impl ActionHandler for StoreHandler {
    fn verb(&self) -> Verb {
        Verb::Store
    }

    fn usage(&self) -> &str {
        "STORE <slotId>"
    }

    fn description(&self) -> &str {
        "Stores the item from the specified inventory slot in the nearest chest."
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::AwaitCompletion
    }

    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
        let Command::Store { slot } = *command else {
            return Err(crate::mismatch(self.verb(), command));
        };
        let empty = || ActionError::Unresolved(format!("slot {slot} is empty"));

        if ctx.game.slot(slot).await?.is_none() {
            return Err(empty());
        }

        let radius = ctx.limits.chest_radius;
        let chest = ctx
            .game
            .find_block(CHEST, radius)
            .await?
            .ok_or_else(|| ActionError::Unresolved(format!("No chest within {radius} blocks")))?;

        let container = ctx.game.open_container(chest.position).await?;

        // The slot may have changed while the chest was opening.
        let deposited = match ctx.game.slot(slot).await {
            Ok(Some(item)) => ctx
                .game
                .deposit(container, slot, item.count)
                .await
                .map(|()| item)
                .map_err(ActionError::from),
            Ok(None) => Err(empty()),
            Err(e) => Err(e.into()),
        };

        if let Err(e) = ctx.game.close_container(container).await {
            warn!(error = %e, "Failed to close chest");
        }

        let item = deposited?;
        Ok(ActionOutcome::announced(
            format!("stored {} {} in chest at {}", item.count, item.name, chest.position),
            "I have stored the item for you.",
        ))
    }
}
