//! SAY — speak in chat.

use async_trait::async_trait;
use minebrain_core::{
    clip_chat, ActionContext, ActionError, ActionHandler, ActionOutcome, Command, ExecutionMode, Verb,
};

pub struct SayHandler;

#[async_trait]
impl ActionHandler for SayHandler {
    fn verb(&self) -> Verb {
        Verb::Say
    }

    fn usage(&self) -> &str {
        "SAY <message>"
    }

    fn description(&self) -> &str {
        "Say a 256 character <message>."
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::FireAndForget
    }

    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
        let Command::Say { message } = command else {
            return Err(crate::mismatch(self.verb(), command));
        };
        let text = clip_chat(message);
        ctx.game.chat(text).await?;
        Ok(ActionOutcome::quiet(format!("said {} chars", text.chars().count())))
    }
}
