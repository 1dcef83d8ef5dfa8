use crate::engine::Engine;
use std::sync::Arc;
use std::time::Instant;

/// Run the fixed-rate simulation tick and broadcast until shutdown.
pub async fn run_tick_loop(engine: Arc<Engine>) {
    let tick_duration = engine.config().tick_duration();
    let dt = tick_duration.as_secs_f64();
    let mut shutdown = engine.shutdown_signal();
    if *shutdown.borrow_and_update() {
        return;
    }

    let mut tick_interval = tokio::time::interval(tick_duration);
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let outcome = engine.tick_once(Instant::now(), dt);
                if !outcome.killed_agents.is_empty() {
                    tracing::debug!("{} agents destroyed", outcome.killed_agents.len());
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!("Tick loop ended");
}

/// Inject one agent per spawn interval while the arena has players. The
/// first spawn happens one full interval after the task starts.
pub async fn run_spawn_loop(engine: Arc<Engine>) {
    let period = engine.config().spawn_interval;
    let mut shutdown = engine.shutdown_signal();
    if *shutdown.borrow_and_update() {
        return;
    }

    let mut spawn_interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    spawn_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = spawn_interval.tick() => {
                match engine.spawner().spawn_once(engine.registry()) {
                    Some(id) => tracing::debug!("Spawned agent {}", id),
                    None => {
                        tracing::debug!("Arena empty, spawner stopped");
                        break;
                    }
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::session::test_support::channel_session;
    use std::time::Duration;

    fn fast_config() -> ServerConfig {
        ServerConfig {
            spawn_interval: Duration::from_millis(100),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn tick_loop_stops_on_shutdown() {
        let engine = Engine::new(fast_config());
        let handle = engine.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        engine.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("tick loop did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn spawner_adds_one_agent_per_interval() {
        let engine = Engine::new(fast_config());
        let (session, _rx) = channel_session("p1", None);
        engine.admit(&session).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(engine.stats().agents, 1);

        let agent = engine.snapshot().agents[0].clone();
        let arena = engine.config().arena;
        assert!(!arena.in_field(agent.pos.x, agent.pos.y));
        engine.shutdown();
    }

    #[tokio::test]
    async fn spawner_retires_when_arena_empties() {
        let engine = Engine::new(fast_config());
        let (session, _rx) = channel_session("p1", None);
        engine.admit(&session).await.unwrap();
        engine.disconnect("p1");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(engine.stats().agents, 0);
        assert!(!engine.spawner().is_running());
    }
}
