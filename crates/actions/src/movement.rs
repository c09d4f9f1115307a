//! MOVE, GOPLYR and LOOK.
//!
//! Navigation is handed to the game client's path planner as a goal block;
//! the handlers return once the goal is accepted, not when it is reached.

use async_trait::async_trait;
use minebrain_core::{
    ActionContext, ActionError, ActionHandler, ActionOutcome, Command, ExecutionMode, Vec3, Verb,
};
use tracing::debug;

/// Eye height above the agent's feet.
const EYE_HEIGHT: f64 = 1.62;

pub struct MoveHandler;

#[async_trait]
impl ActionHandler for MoveHandler {
    fn verb(&self) -> Verb {
        Verb::Move
    }

    fn usage(&self) -> &str {
        "MOVE <x> <y> <z>"
    }

    fn description(&self) -> &str {
        "Moves the bot to the coordinates (x, y, z)."
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::FireAndForget
    }

    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
        let Command::Move { x, y, z } = *command else {
            return Err(crate::mismatch(self.verb(), command));
        };
        let goal = Vec3::new(x, y, z).floored();
        ctx.game.set_goal(goal).await?;
        Ok(ActionOutcome::quiet(format!("navigating to {goal}")))
    }
}

pub struct GoPlyrHandler;

#[async_trait]
impl ActionHandler for GoPlyrHandler {
    fn verb(&self) -> Verb {
        Verb::GoPlyr
    }

    fn usage(&self) -> &str {
        "GOPLYR <player>"
    }

    fn description(&self) -> &str {
        "Moves the bot to the specified player's position."
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::FireAndForget
    }

    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
        let Command::GoPlyr { player } = command else {
            return Err(crate::mismatch(self.verb(), command));
        };
        let entity = crate::tracked_player(ctx, player).await?;
        let goal = entity.position.floored();
        ctx.game.set_goal(goal).await?;
        Ok(ActionOutcome::quiet(format!("navigating to {player} at {goal}")))
    }
}

pub struct LookHandler;

/// Yaw and pitch (radians) that point a view from `eye` at `target`.
/// Yaw 0 faces -z and grows counter-clockwise seen from above.
pub fn look_angles(eye: Vec3, target: Vec3) -> (f32, f32) {
    let (dx, dy, dz) = (target.x - eye.x, target.y - eye.y, target.z - eye.z);
    let yaw = (-dx).atan2(-dz);
    let pitch = dy.atan2((dx * dx + dz * dz).sqrt());
    (yaw as f32, pitch as f32)
}

#[async_trait]
impl ActionHandler for LookHandler {
    fn verb(&self) -> Verb {
        Verb::Look
    }

    fn usage(&self) -> &str {
        "LOOK <x> <y> <z>"
    }

    fn description(&self) -> &str {
        "Makes the bot look at the specified coordinates."
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::FireAndForget
    }

    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
        let Command::Look { x, y, z } = *command else {
            return Err(crate::mismatch(self.verb(), command));
        };
        let status = ctx.game.status().await?;
        let eye = Vec3::new(status.position.x, status.position.y + EYE_HEIGHT, status.position.z);
        let (yaw, pitch) = look_angles(eye, Vec3::new(x, y, z));
        debug!(yaw, pitch, "look");
        ctx.game.look(yaw, pitch).await?;
        Ok(ActionOutcome::quiet(format!("looking at ({x}, {y}, {z})")))
    }
}
