use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::fanout::Fanout;
use crate::game_loop::{run_spawn_loop, run_tick_loop};
use crate::player::Player;
use crate::protocol::{state_msg, InitMsg, InputEvent, ServerMsg};
use crate::registry::{EntityRegistry, Snapshot};
use crate::session::Session;
use crate::simulation::{Simulation, TickOutcome};
use crate::spawner::Spawner;
use arena_shared::vec2::Vec2;
use axum::extract::ws::Message;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Live entity counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct EngineStats {
    pub sessions: usize,
    pub players: usize,
    pub bullets: usize,
    pub agents: usize,
}

/// One arena. Owns the registry and everything that touches it.
pub struct Engine {
    config: ServerConfig,
    registry: Mutex<EntityRegistry>,
    simulation: Simulation,
    fanout: Fanout,
    spawner: Spawner,
    shutdown: watch::Sender<bool>,
}

impl Engine {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            simulation: Simulation::new(config.arena),
            spawner: Spawner::new(config.arena, config.rng_seed),
            registry: Mutex::new(EntityRegistry::new()),
            fanout: Fanout::new(),
            shutdown: watch::Sender::new(false),
            config,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn fanout(&self) -> &Fanout {
        &self.fanout
    }

    pub(crate) fn registry(&self) -> &Mutex<EntityRegistry> {
        &self.registry
    }

    pub(crate) fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    /// Spawn the fixed-rate tick loop.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(run_tick_loop(self.clone()))
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Place a player for `session`, send it the init message and start
    /// delivering snapshots to it.
    pub async fn admit(self: &Arc<Self>, session: &Arc<Session>) -> Result<(), SessionError> {
        if self.is_shutting_down() {
            return Err(SessionError::Closed);
        }
        let id = session.id().to_string();
        let arena = &self.config.arena;

        self.registry.lock().upsert_player(Player::new(
            id.clone(),
            Vec2::new(arena.spawn_x, arena.spawn_y),
            arena.player_health,
            Instant::now(),
        ));

        let init = ServerMsg::Init(InitMsg { id: id.clone() });
        let json = serde_json::to_string(&init)?;
        if let Err(e) = session.send(Message::Text(json.into())).await {
            self.registry.lock().remove_player(&id);
            return Err(e);
        }

        // Registered only after init so no snapshot can precede it
        self.fanout.register(session.clone());

        // shutdown() sets the flag before close_all, so a session registered
        // after that sweep sees the flag here
        if self.is_shutting_down() {
            self.fanout.unregister(&id);
            self.registry.lock().remove_player(&id);
            session.close();
            return Err(SessionError::Closed);
        }

        let engine = self.clone();
        if self
            .spawner
            .ensure_running(move || tokio::spawn(run_spawn_loop(engine)))
        {
            tracing::debug!("Spawner started");
        }

        if let Some(room_id) = session.room_id() {
            self.fanout
                .emit_to_room(room_id, "player_joined", serde_json::json!({ "id": id }));
        }
        Ok(())
    }

    /// Apply one decoded input event from `player_id`.
    pub fn apply_input(&self, player_id: &str, event: InputEvent) {
        let mut registry = self.registry.lock();
        match event {
            InputEvent::Move { velocity } => {
                if let Some(player) = registry.player_mut(player_id) {
                    player.velocity = velocity;
                }
            }
            InputEvent::Shoot { direction } => {
                let direction = direction.normalize();
                if direction.is_zero() {
                    tracing::debug!("Player {} shot with zero direction, ignored", player_id);
                    return;
                }
                let Some(pos) = registry.player(player_id).map(|p| p.pos) else {
                    return;
                };
                let velocity = direction * self.config.arena.bullet_speed;
                registry.add_bullet(player_id, pos, velocity);
            }
        }
    }

    /// Remove a session and its player. Safe to call more than once.
    pub fn disconnect(&self, id: &str) {
        let player = self.registry.lock().remove_player(id);
        let session = self.fanout.unregister(id);
        if let Some(session) = &session {
            session.close();
            if let Some(room_id) = session.room_id() {
                self.fanout
                    .emit_to_room(room_id, "player_left", serde_json::json!({ "id": id }));
            }
        }
        if player.is_some() || session.is_some() {
            tracing::info!("Player {} disconnected", id);
        }
    }

    /// One simulation step followed by a broadcast of the resulting state.
    pub fn tick_once(&self, now: Instant, dt: f64) -> TickOutcome {
        let (outcome, snapshot) = {
            let mut registry = self.registry.lock();
            let outcome = self.simulation.tick(&mut registry, now, dt);
            let snapshot = (!self.fanout.is_empty()).then(|| registry.snapshot());
            (outcome, snapshot)
        };

        for id in &outcome.killed_players {
            tracing::info!("Player {} was killed", id);
            self.fanout.close(id);
        }

        if let Some(snapshot) = snapshot {
            match serde_json::to_string(&state_msg(&snapshot)) {
                Ok(json) => {
                    self.fanout.broadcast(json.into());
                }
                Err(e) => tracing::error!("Failed to encode snapshot: {}", e),
            }
        }
        outcome
    }

    pub fn snapshot(&self) -> Snapshot {
        self.registry.lock().snapshot()
    }

    pub fn stats(&self) -> EngineStats {
        let registry = self.registry.lock();
        EngineStats {
            sessions: self.fanout.len(),
            players: registry.player_count(),
            bullets: registry.bullet_count(),
            agents: registry.agent_count(),
        }
    }

    /// Stop the timers and close every session.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        self.spawner.stop();
        self.fanout.close_all();
        tracing::info!("Engine shutting down");
    }
}
