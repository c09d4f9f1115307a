//! ATTACK and KILL.
//!
//! KILL re-reads its target by id on every poll, so an entity that died,
//! despawned or left tracking range ends the loop instead of being hit
//! through a stale handle. The loop is bounded by both an attempt count and
//! a wall-clock duration.

use async_trait::async_trait;
use minebrain_core::{
    ActionContext, ActionError, ActionHandler, ActionOutcome, Command, EntityFilter, EntityInfo,
    ExecutionMode, GameError, Target, Verb,
};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Resolve an ATTACK/KILL target to a live entity.
pub async fn resolve_target(ctx: &ActionContext, target: &Target) -> Result<EntityInfo, ActionError> {
    match target {
        Target::Nearest => ctx
            .game
            .nearest_entity(&EntityFilter::Any)
            .await?
            .ok_or_else(|| ActionError::Unresolved("No entity nearby".into())),
        Target::EntityType(kind) => ctx
            .game
            .nearest_entity(&EntityFilter::Kind(kind.clone()))
            .await?
            .ok_or_else(|| ActionError::Unresolved(format!("No {kind} nearby"))),
        Target::PlayerName(name) => {
            if name.eq_ignore_ascii_case(ctx.game.username()) {
                return Err(ActionError::Unresolved("I cannot attack myself".into()));
            }
            crate::tracked_player(ctx, name).await
        }
    }
}

fn describe(entity: &EntityInfo) -> String {
    match &entity.username {
        Some(name) => name.clone(),
        None => format!("{} {}", entity.kind, entity.id),
    }
}

pub struct AttackHandler;

#[async_trait]
impl ActionHandler for AttackHandler {
    fn verb(&self) -> Verb {
        Verb::Attack
    }

    fn usage(&self) -> &str {
        "ATTACK <target>"
    }

    fn description(&self) -> &str {
        "Attacks the nearest entity (type \"nearest\"), a specified Minecraft entity ID (like minecraft:pig or minecraft:ender_dragon), or a player by name."
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::FireAndForget
    }

    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
        let Command::Attack { target } = command else {
            return Err(crate::mismatch(self.verb(), command));
        };

        let entity = match resolve_target(ctx, target).await {
            Ok(entity) => entity,
            Err(ActionError::Unresolved(reason)) => {
                info!(%target, %reason, "ATTACK has no target");
                return Ok(ActionOutcome::quiet(format!("no target: {reason}")));
            }
            Err(e) => return Err(e),
        };

        ctx.game.attack(entity.id).await?;
        Ok(ActionOutcome::quiet(format!("attacked {}", describe(&entity))))
    }
}

pub struct KillHandler;

#[async_trait]
impl ActionHandler for KillHandler {
    fn verb(&self) -> Verb {
        Verb::Kill
    }

    fn usage(&self) -> &str {
        "KILL <target>"
    }

    fn description(&self) -> &str {
        "Keeps attacking the target until either the target or the bot is dead."
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::LongRunning
    }

    async fn execute(&self, command: &Command, ctx: &ActionContext) -> Result<ActionOutcome, ActionError> {
        let Command::Kill { target } = command else {
            return Err(crate::mismatch(self.verb(), command));
        };
        let entity = resolve_target(ctx, target).await?;
        let name = describe(&entity);
        let limits = &ctx.limits;

        let started = Instant::now();
        let mut ticker = tokio::time::interval(limits.kill_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attacks = 0u32;

        loop {
            ticker.tick().await;

            if ctx.game.status().await?.health <= 0.0 {
                return Err(ActionError::failed(
                    self.verb().as_str(),
                    format!("I died before {name} did"),
                ));
            }

            let alive = match ctx.game.entity(entity.id).await? {
                Some(current) => current.health.is_none_or(|h| h > 0.0),
                None => false,
            };
            if !alive {
                info!(target = %name, attacks, "KILL finished");
                return Ok(ActionOutcome::announced(
                    format!("{name} is gone after {attacks} attacks"),
                    format!("{name} is dead"),
                ));
            }

            if attacks >= limits.kill_max_attempts || started.elapsed() >= limits.kill_max_duration {
                return Err(ActionError::failed(
                    self.verb().as_str(),
                    format!("gave up on {name} after {attacks} attacks"),
                ));
            }

            match ctx.game.attack(entity.id).await {
                Ok(()) => debug!(target = %name, attacks, "KILL hit"),
                Err(GameError::NotFound(_)) => {
                    debug!(target = %name, "KILL target vanished mid-swing");
                }
                Err(e) => warn!(target = %name, error = %e, "KILL attack rejected"),
            }
            attacks += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, world};
    use minebrain_bridge::GameCall;
    use minebrain_core::{ActionLimits, GameClient, Vec3};
    use std::time::Duration;

    fn attacks(calls: &[GameCall]) -> usize {
        calls.iter().filter(|c| matches!(c, GameCall::Attack(_))).count()
    }

    #[tokio::test]
    async fn nearest_picks_closest_entity() {
        let world = world();
        let _far = world.spawn_entity("cow", Vec3::new(8.0, 64.0, 0.0), 10.0);
        let near = world.spawn_entity("pig", Vec3::new(2.0, 64.0, 0.0), 10.0);

        let entity = resolve_target(&ctx(&world), &Target::Nearest).await.unwrap();
        assert_eq!(entity.id, near);
    }

    #[tokio::test]
    async fn entity_type_filters_by_kind() {
        let world = world();
        world.spawn_entity("pig", Vec3::new(2.0, 64.0, 0.0), 10.0);
        let cow = world.spawn_entity("cow", Vec3::new(8.0, 64.0, 0.0), 10.0);

        let entity = resolve_target(&ctx(&world), &Target::EntityType("cow".into()))
            .await
            .unwrap();
        assert_eq!(entity.id, cow);

        let err = resolve_target(&ctx(&world), &Target::EntityType("ender_dragon".into()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No ender_dragon nearby");
    }

    #[tokio::test]
    async fn cannot_target_self() {
        let world = world();
        let err = resolve_target(&ctx(&world), &Target::PlayerName("minebrain".into()))
            .await
            .unwrap_err();
        assert!(err.is_resolution());
    }

    #[tokio::test]
    async fn attack_hits_once() {
        let world = world();
        let zombie = world.spawn_entity("zombie", Vec3::new(1.0, 64.0, 1.0), 20.0);
        AttackHandler
            .execute(&Command::Attack { target: Target::Nearest }, &ctx(&world))
            .await
            .unwrap();
        assert_eq!(world.calls(), vec![GameCall::Attack(zombie)]);
        assert_eq!(world.entity_health(zombie), Some(16.0));
    }

    #[tokio::test]
    async fn attack_without_target_is_a_noop() {
        let world = world();
        let outcome = AttackHandler
            .execute(
                &Command::Attack { target: Target::PlayerName("Ghost".into()) },
                &ctx(&world),
            )
            .await
            .unwrap();
        assert!(outcome.detail.contains("Player Ghost not found"));
        assert!(world.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn kill_stops_when_target_dies() {
        let world = world();
        let pig = world.spawn_entity("pig", Vec3::new(1.0, 64.0, 0.0), 10.0);
        let started = Instant::now();

        let outcome = KillHandler
            .execute(&Command::Kill { target: Target::EntityType("pig".into()) }, &ctx(&world))
            .await
            .unwrap();

        // 10 hp at 4 damage per hit: dead on the third attack, noticed on the fourth poll.
        assert_eq!(attacks(&world.calls()), 3);
        assert_eq!(outcome.announce.as_deref(), Some(&*format!("pig {pig} is dead")));
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(world.entity(pig).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn kill_is_bounded_by_attempts() {
        let world = world();
        world.set_attack_damage(0.0);
        world.spawn_entity("iron_golem", Vec3::new(1.0, 64.0, 0.0), 100.0);
        let mut ctx = ctx(&world);
        ctx.limits = ActionLimits {
            kill_max_attempts: 5,
            ..ActionLimits::default()
        };

        let err = KillHandler
            .execute(&Command::Kill { target: Target::Nearest }, &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("gave up"));
        assert_eq!(attacks(&world.calls()), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn kill_is_bounded_by_duration() {
        let world = world();
        world.set_attack_damage(0.0);
        world.spawn_entity("iron_golem", Vec3::new(1.0, 64.0, 0.0), 100.0);
        let mut ctx = ctx(&world);
        ctx.limits = ActionLimits {
            kill_max_duration: Duration::from_secs(2),
            ..ActionLimits::default()
        };

        let err = KillHandler
            .execute(&Command::Kill { target: Target::Nearest }, &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("gave up"));
        // Polls at 0, 0.5, 1.0, 1.5 attack; the poll at 2.0 gives up.
        assert_eq!(attacks(&world.calls()), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn kill_stops_when_agent_dies() {
        let world = world();
        world.spawn_entity("warden", Vec3::new(1.0, 64.0, 0.0), 500.0);
        world.update_status(|s| s.health = 0.0);

        let err = KillHandler
            .execute(&Command::Kill { target: Target::Nearest }, &ctx(&world))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("I died"));
        assert_eq!(attacks(&world.calls()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn kill_ends_when_target_leaves_tracking() {
        let world = world();
        let steve = world.add_player("Steve", Some(Vec3::new(2.0, 64.0, 0.0))).unwrap();
        world.set_attack_damage(1.0);

        let handle = {
            let ctx = ctx(&world);
            tokio::spawn(async move {
                KillHandler
                    .execute(&Command::Kill { target: Target::PlayerName("Steve".into()) }, &ctx)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(1200)).await;
        world.remove_entity(steve);

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.announce.as_deref(), Some("Steve is dead"));
        assert_eq!(attacks(&world.calls()), 3);
    }
}
