//! Periodic agent injection at the arena edges.

use crate::registry::EntityRegistry;
use arena_shared::config::ArenaConfig;
use arena_shared::vec2::Vec2;
use parking_lot::Mutex;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;

struct SpawnerState {
    task: Option<JoinHandle<()>>,
    rng: ChaCha8Rng,
}

/// Tracks the spawn task. The task only lives while at least one player is
/// in the arena: it is started on admission and retires itself on the first
/// scheduled spawn that finds the arena empty.
pub struct Spawner {
    config: ArenaConfig,
    state: Mutex<SpawnerState>,
}

impl Spawner {
    pub fn new(config: ArenaConfig, rng_seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            config,
            state: Mutex::new(SpawnerState {
                task: None,
                rng: ChaCha8Rng::seed_from_u64(rng_seed),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Launch the task with `start` unless one is already live.
    /// Returns true if a new task was started.
    pub fn ensure_running(&self, start: impl FnOnce() -> JoinHandle<()>) -> bool {
        let mut state = self.state.lock();
        if state.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }
        state.task = Some(start());
        true
    }

    /// One scheduled spawn. With no players present nothing is spawned, the
    /// task slot is cleared and `None` tells the caller to exit.
    pub fn spawn_once(&self, registry: &Mutex<EntityRegistry>) -> Option<u32> {
        let mut state = self.state.lock();
        let mut registry = registry.lock();
        if registry.player_count() == 0 {
            state.task = None;
            return None;
        }
        let pos = edge_position(&self.config, &mut state.rng);
        Some(registry.add_agent(pos, self.config.agent_health))
    }

    pub fn stop(&self) {
        if let Some(task) = self.state.lock().task.take() {
            task.abort();
        }
    }
}

/// Random point just outside one of the four edges of the visible field.
pub fn edge_position(config: &ArenaConfig, rng: &mut impl Rng) -> Vec2 {
    let offset = rng.gen_range(config.spawn_offset_min..=config.spawn_offset_max);
    match rng.gen_range(0..4) {
        0 => Vec2::new(rng.gen_range(0.0..=config.width), -offset),
        1 => Vec2::new(rng.gen_range(0.0..=config.width), config.height + offset),
        2 => Vec2::new(-offset, rng.gen_range(0.0..=config.height)),
        _ => Vec2::new(config.width + offset, rng.gen_range(0.0..=config.height)),
    }
}
