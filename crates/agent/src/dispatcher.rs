//! Action Dispatcher — runs a batch of commands with per-command isolation.
//!
//! All commands go through one ordered lane, so they *start* strictly in
//! submission order across batches. Only await-completion commands hold
//! the lane; what the caller waits for depends on the handler's
//! [`ExecutionMode`]:
//!
//! | Mode | Lane | `run` waits? |
//! |------|------|--------------|
//! | `FireAndForget` | started in order as a detached task | no |
//! | `AwaitCompletion` | executed in order, holding the lane | yes, until it finishes |
//! | `LongRunning` | spawned in order as a tracked, cancellable task | no |
//!
//! A failure or panic in one handler is reported (log, chat, event) and
//! never stops the commands after it.

use futures::FutureExt;
use minebrain_core::{
    clip_chat, ActionContext, ActionError, ActionHandler, ActionOutcome, ActionTask, Command, DomainEvent,
    EventBus, ExecutionMode, HandlerRegistry, TaskStatus, Verb,
};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

enum LaneJob {
    Run {
        task: ActionTask,
        done: Option<oneshot::Sender<TaskStatus>>,
    },
    Flush(oneshot::Sender<()>),
}

struct Shared {
    registry: HandlerRegistry,
    ctx: ActionContext,
    events: Arc<EventBus>,
    report_failures: bool,
    ongoing: Mutex<HashMap<Uuid, (Verb, AbortHandle)>>,
}

/// Executes parsed commands against the registered handlers.
pub struct ActionDispatcher {
    shared: Arc<Shared>,
    lane: mpsc::UnboundedSender<LaneJob>,
}

impl ActionDispatcher {
    /// Create a dispatcher and start its lane. Must be called inside a
    /// Tokio runtime.
    pub fn new(
        registry: HandlerRegistry,
        ctx: ActionContext,
        events: Arc<EventBus>,
        report_failures: bool,
    ) -> Self {
        let shared = Arc::new(Shared {
            registry,
            ctx,
            events,
            report_failures,
            ongoing: Mutex::new(HashMap::new()),
        });
        let (lane, jobs) = mpsc::unbounded_channel();
        tokio::spawn(run_lane(shared.clone(), jobs));
        Self { shared, lane }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.shared.registry
    }

    /// Submit a batch in order. Returns once every await-completion command
    /// in the batch has finished; other commands may still be running.
    pub async fn run(&self, commands: Vec<Command>) {
        for command in commands {
            let task = ActionTask::new(command);
            let mode = self.shared.registry.get(task.verb()).map(|h| h.mode());
            self.shared.publish(&task, TaskStatus::Pending);
            debug!(task_id = %task.id, verb = %task.verb(), ?mode, "Command queued");

            if mode == Some(ExecutionMode::AwaitCompletion) {
                let (done, finished) = oneshot::channel();
                if self.lane.send(LaneJob::Run { task, done: Some(done) }).is_err() {
                    warn!("Dispatcher lane is closed");
                    return;
                }
                let _ = finished.await;
            } else if self.lane.send(LaneJob::Run { task, done: None }).is_err() {
                warn!("Dispatcher lane is closed");
                return;
            }
        }
    }

    /// Wait until every command submitted so far has run, including
    /// detached fire-and-forget ones. Long-running tasks only need to have
    /// been started.
    pub async fn flush(&self) {
        let (done, flushed) = oneshot::channel();
        if self.lane.send(LaneJob::Flush(done)).is_ok() {
            let _ = flushed.await;
        }
    }

    /// Abort every ongoing long-running task. Returns how many were stopped.
    pub fn cancel_all(&self) -> usize {
        let cancelled: Vec<_> = self.shared.ongoing().drain().collect();
        for (task_id, (verb, handle)) in &cancelled {
            handle.abort();
            info!(%task_id, %verb, "Ongoing task cancelled");
            self.shared.events.publish(DomainEvent::TaskStatusChanged {
                task_id: *task_id,
                verb: *verb,
                status: TaskStatus::Failed("cancelled".into()),
                timestamp: chrono::Utc::now(),
            });
        }
        cancelled.len()
    }

    /// Number of long-running tasks still in flight.
    pub fn ongoing(&self) -> usize {
        self.shared.ongoing().len()
    }
}

async fn run_lane(shared: Arc<Shared>, mut jobs: mpsc::UnboundedReceiver<LaneJob>) {
    let mut detached = JoinSet::new();
    while let Some(job) = jobs.recv().await {
        while detached.try_join_next().is_some() {}
        match job {
            LaneJob::Run { task, done } => {
                let status = shared.start(task, &mut detached).await;
                if let Some(done) = done {
                    let _ = done.send(status);
                }
            }
            LaneJob::Flush(done) => {
                while detached.join_next().await.is_some() {}
                let _ = done.send(());
            }
        }
    }
    debug!("Dispatcher lane stopped");
}

/// Run a handler, turning a panic into [`ActionError::Panicked`].
async fn execute(handler: &dyn ActionHandler, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
    AssertUnwindSafe(handler.execute(command, ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            Err(ActionError::Panicked {
                verb: handler.verb().to_string(),
            })
        })
}

impl Shared {
    fn ongoing(&self) -> MutexGuard<'_, HashMap<Uuid, (Verb, AbortHandle)>> {
        self.ongoing.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, task: &ActionTask, status: TaskStatus) {
        self.events.publish(DomainEvent::TaskStatusChanged {
            task_id: task.id,
            verb: task.verb(),
            status,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Start one task. Returns its final status for await-completion
    /// handlers and [`TaskStatus::Ongoing`] for anything still running.
    async fn start(self: &Arc<Self>, task: ActionTask, detached: &mut JoinSet<()>) -> TaskStatus {
        let Some(handler) = self.registry.get(task.verb()) else {
            let result = Err(ActionError::Disabled(task.verb().to_string()));
            return self.finish(&task, result).await;
        };

        match handler.mode() {
            ExecutionMode::LongRunning => {
                self.spawn_ongoing(handler, task);
                TaskStatus::Ongoing
            }
            ExecutionMode::FireAndForget => {
                let shared = self.clone();
                detached.spawn(async move {
                    let result = execute(handler.as_ref(), &task.command, &shared.ctx).await;
                    shared.finish(&task, result).await;
                });
                // Give the new task its first poll before the next command starts.
                tokio::task::yield_now().await;
                TaskStatus::Ongoing
            }
            ExecutionMode::AwaitCompletion => {
                let result = execute(handler.as_ref(), &task.command, &self.ctx).await;
                self.finish(&task, result).await
            }
        }
    }

    fn spawn_ongoing(self: &Arc<Self>, handler: Arc<dyn ActionHandler>, task: ActionTask) {
        let (task_id, verb) = (task.id, task.verb());
        self.publish(&task, TaskStatus::Ongoing);
        info!(%task_id, %verb, command = %task.command, "Long-running task started");

        // Hold the table while spawning so the task cannot deregister
        // before it is registered.
        let mut ongoing = self.ongoing();
        let shared = self.clone();
        let handle = tokio::spawn(async move {
            let result = execute(handler.as_ref(), &task.command, &shared.ctx).await;
            shared.finish(&task, result).await;
            shared.ongoing().remove(&task.id);
        });
        ongoing.insert(task_id, (verb, handle.abort_handle()));
    }

    async fn finish(&self, task: &ActionTask, result: Result<ActionOutcome, ActionError>) -> TaskStatus {
        let verb = task.verb();
        let status = match result {
            Ok(outcome) => {
                info!(task_id = %task.id, %verb, detail = %outcome.detail, "Action succeeded");
                if let Some(text) = &outcome.announce {
                    self.say(text).await;
                }
                TaskStatus::Succeeded
            }
            Err(e) => {
                if e.is_resolution() {
                    info!(task_id = %task.id, %verb, reason = %e, "Action target unresolved");
                } else {
                    warn!(task_id = %task.id, %verb, error = %e, "Action failed");
                }
                if self.report_failures {
                    self.say(&e.to_string()).await;
                }
                TaskStatus::Failed(e.to_string())
            }
        };
        self.publish(task, status.clone());
        status
    }

    async fn say(&self, text: &str) {
        if let Err(e) = self.ctx.game.chat(clip_chat(text)).await {
            warn!(error = %e, "Failed to report in chat");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use minebrain_bridge::{GameCall, SimWorld};
    use minebrain_core::{ActionLimits, Target, Vec3};
    use std::time::Duration;

    struct PanickingHandler;

    #[async_trait]
    impl ActionHandler for PanickingHandler {
        fn verb(&self) -> Verb {
            Verb::Mine
        }
        fn usage(&self) -> &str {
            "MINE"
        }
        fn description(&self) -> &str {
            "Always panics."
        }
        fn mode(&self) -> ExecutionMode {
            ExecutionMode::FireAndForget
        }
        async fn execute(&self, _command: &Command, _ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
            panic!("handler bug");
        }
    }

    /// A fire-and-forget MINE that takes twenty seconds to dig.
    struct SlowDigHandler;

    #[async_trait]
    impl ActionHandler for SlowDigHandler {
        fn verb(&self) -> Verb {
            Verb::Mine
        }
        fn usage(&self) -> &str {
            "MINE"
        }
        fn description(&self) -> &str {
            "Digs slowly."
        }
        fn mode(&self) -> ExecutionMode {
            ExecutionMode::FireAndForget
        }
        async fn execute(&self, _command: &Command, _ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
            tokio::time::sleep(Duration::from_secs(20)).await;
            Ok(ActionOutcome::announced("dug", "dug it"))
        }
    }

    fn world() -> Arc<SimWorld> {
        Arc::new(SimWorld::new("Minebrain").with_floor(63, 8, "stone"))
    }

    fn dispatcher_with(world: &Arc<SimWorld>, registry: HandlerRegistry, report: bool) -> ActionDispatcher {
        let ctx = ActionContext::new(world.clone(), ActionLimits::default());
        ActionDispatcher::new(registry, ctx, Arc::new(EventBus::default()), report)
    }

    fn dispatcher(world: &Arc<SimWorld>) -> ActionDispatcher {
        dispatcher_with(world, minebrain_actions::default_registry(&[]), true)
    }

    fn say(text: &str) -> Command {
        Command::Say { message: text.into() }
    }

    #[tokio::test]
    async fn commands_run_in_source_order() {
        let world = world();
        world.give(1, "torch", 4);
        let dispatcher = dispatcher(&world);

        dispatcher
            .run(vec![say("first"), Command::Hold { slot: 1 }, say("second")])
            .await;
        dispatcher.flush().await;

        assert_eq!(
            world.calls(),
            vec![
                GameCall::Chat("first".into()),
                GameCall::Equip(1),
                GameCall::Chat("second".into()),
            ]
        );
    }

    #[tokio::test]
    async fn await_completion_finishes_before_run_returns() {
        let world = world();
        world.give(2, "stone", 1);
        let dispatcher = dispatcher(&world);

        dispatcher.run(vec![Command::Hold { slot: 2 }]).await;
        assert_eq!(world.held_slot(), Some(2));
    }

    #[tokio::test]
    async fn failures_are_reported_and_isolated() {
        let world = world();
        let dispatcher = dispatcher(&world);

        dispatcher
            .run(vec![Command::Hold { slot: 5 }, say("still here")])
            .await;
        dispatcher.flush().await;

        assert_eq!(
            world.said(),
            vec!["cannot equip empty slot 5".to_string(), "still here".to_string()]
        );
    }

    #[tokio::test]
    async fn failure_chat_can_be_silenced() {
        let world = world();
        let dispatcher = dispatcher_with(&world, minebrain_actions::default_registry(&[]), false);

        dispatcher.run(vec![Command::GoPlyr { player: "Nobody".into() }]).await;
        dispatcher.flush().await;
        assert!(world.said().is_empty());
    }

    #[tokio::test]
    async fn panics_become_failures() {
        let world = world();
        let mut registry = minebrain_actions::default_registry(&[]);
        registry.register(Arc::new(PanickingHandler));
        let dispatcher = dispatcher_with(&world, registry, true);
        let mut events = dispatcher.shared.events.subscribe();

        dispatcher.run(vec![Command::Mine, say("after")]).await;
        dispatcher.flush().await;

        assert_eq!(world.said(), vec!["MINE handler panicked".to_string(), "after".to_string()]);

        let mut failed = None;
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::TaskStatusChanged { verb: Verb::Mine, status: TaskStatus::Failed(reason), .. } =
                event.as_ref()
            {
                failed = Some(reason.clone());
            }
        }
        assert_eq!(failed.as_deref(), Some("MINE handler panicked"));
    }

    #[tokio::test(start_paused = true)]
    async fn fire_and_forget_does_not_hold_the_lane() {
        let world = world();
        let mut registry = minebrain_actions::default_registry(&[]);
        registry.register(Arc::new(SlowDigHandler));
        let dispatcher = dispatcher_with(&world, registry, true);

        dispatcher.run(vec![Command::Mine, say("after")]).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(world.said(), vec!["after".to_string()]);

        // A later batch is not held up either.
        dispatcher.run(vec![say("next batch")]).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(world.said(), vec!["after".to_string(), "next batch".to_string()]);

        dispatcher.flush().await;
        assert_eq!(
            world.said(),
            vec!["after".to_string(), "next batch".to_string(), "dug it".to_string()]
        );
    }

    #[tokio::test]
    async fn disabled_verbs_are_reported() {
        let world = world();
        let dispatcher = dispatcher_with(&world, minebrain_actions::default_registry(&[Verb::Kill]), true);

        dispatcher
            .run(vec![Command::Kill { target: Target::Nearest }])
            .await;
        dispatcher.flush().await;
        assert_eq!(world.said(), vec!["KILL is disabled".to_string()]);
    }

    #[tokio::test]
    async fn task_lifecycle_is_published() {
        let world = world();
        world.give(1, "torch", 1);
        let dispatcher = dispatcher(&world);
        let mut events = dispatcher.shared.events.subscribe();

        dispatcher.run(vec![Command::Hold { slot: 1 }]).await;

        let mut statuses = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::TaskStatusChanged { status, .. } = event.as_ref() {
                statuses.push(status.clone());
            }
        }
        assert_eq!(statuses, vec![TaskStatus::Pending, TaskStatus::Succeeded]);
    }

    #[tokio::test(start_paused = true)]
    async fn long_running_does_not_block_the_batch() {
        let world = world();
        world.set_attack_damage(0.0);
        world.spawn_entity("iron_golem", Vec3::new(2.0, 64.0, 0.0), 100.0);
        let dispatcher = dispatcher(&world);

        dispatcher
            .run(vec![Command::Kill { target: Target::Nearest }, say("on it")])
            .await;
        dispatcher.flush().await;

        assert_eq!(world.said(), vec!["on it".to_string()]);
        assert_eq!(dispatcher.ongoing(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(dispatcher.ongoing(), 1);

        assert_eq!(dispatcher.cancel_all(), 1);
        assert_eq!(dispatcher.ongoing(), 0);

        let attacks_at_cancel = world.calls().len();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(world.calls().len(), attacks_at_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn long_running_reports_when_done() {
        let world = world();
        let pig = world.spawn_entity("pig", Vec3::new(1.0, 64.0, 0.0), 8.0);
        let dispatcher = dispatcher(&world);

        dispatcher
            .run(vec![Command::Kill { target: Target::EntityType("pig".into()) }])
            .await;
        dispatcher.flush().await;

        while dispatcher.ongoing() > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(world.said(), vec![format!("pig {pig} is dead")]);
    }
}
