//! MINE — dig the block in the line of sight.

use async_trait::async_trait;
use minebrain_core::{ActionContext, ActionError, ActionHandler, ActionOutcome, Command, ExecutionMode, Verb};

pub struct MineHandler;

#[async_trait]
impl ActionHandler for MineHandler {
    fn verb(&self) -> Verb {
        Verb::Mine
    }

    fn usage(&self) -> &str {
        "MINE"
    }

    fn description(&self) -> &str {
        "Mines the block the bot is currently looking at."
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::FireAndForget
    }

    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
        if !matches!(command, Command::Mine) {
            return Err(crate::mismatch(self.verb(), command));
        }

        let Some(block) = ctx.game.raycast_block(ctx.limits.mine_reach).await? else {
            return Ok(ActionOutcome::quiet("nothing to mine"));
        };

        ctx.game.dig(block.position).await.map_err(|e| {
            ActionError::failed(self.verb().as_str(), format!("error mining {}: {e}", block.name))
        })?;
        Ok(ActionOutcome::quiet(format!("mined {} at {}", block.name, block.position)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, world};
    use minebrain_bridge::GameCall;
    use minebrain_core::{BlockPos, GameError};

    #[tokio::test]
    async fn mines_block_in_reach() {
        let world = world();
        let log = BlockPos::new(0, 65, -3);
        world.set_block(log, "oak_log");

        let outcome = MineHandler.execute(&Command::Mine, &ctx(&world)).await.unwrap();
        assert!(outcome.detail.contains("oak_log"));
        assert_eq!(world.calls(), vec![GameCall::Dig(log)]);
        assert_eq!(world.block(log), "air");
    }

    #[tokio::test]
    async fn nothing_in_reach_is_not_an_error() {
        let world = world();
        world.set_block(BlockPos::new(0, 65, -9), "oak_log");

        let outcome = MineHandler.execute(&Command::Mine, &ctx(&world)).await.unwrap();
        assert_eq!(outcome.detail, "nothing to mine");
        assert!(world.calls().is_empty());
    }

    #[tokio::test]
    async fn dig_failure_is_reported() {
        let world = world();
        world.set_block(BlockPos::new(0, 65, -2), "bedrock");
        world.fail("dig", GameError::Rejected("block is unbreakable".into()));

        let err = MineHandler.execute(&Command::Mine, &ctx(&world)).await.unwrap_err();
        assert!(err.to_string().contains("unbreakable"));
    }
}
