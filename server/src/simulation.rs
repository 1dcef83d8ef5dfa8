//! One fixed-period arena step: players, agents, bullets, in that order.

use crate::collision::{point_in_circle, segment_hits_circle};
use crate::registry::EntityRegistry;
use arena_shared::config::ArenaConfig;
use arena_shared::vec2::Vec2;
use std::time::Instant;

/// What a bullet struck.
#[derive(Debug, Clone, PartialEq)]
enum Hit {
    Agent(u32),
    Player(String),
}

/// Side effects of a tick the caller has to act on.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    /// Players killed this tick. Their sessions must be closed.
    pub killed_players: Vec<String>,
    pub killed_agents: Vec<u32>,
    pub hits: usize,
    /// Bullets and agents pruned for leaving the inflated bounds
    pub pruned: usize,
}

pub struct Simulation {
    config: ArenaConfig,
}

impl Simulation {
    pub fn new(config: ArenaConfig) -> Self {
        Self { config }
    }

    /// Advance the registry by one tick. `now` drives per-player integration,
    /// `dt` (seconds) drives agents. The caller holds the registry lock.
    pub fn tick(&self, registry: &mut EntityRegistry, now: Instant, dt: f64) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        self.integrate_players(registry, now);
        self.steer_agents(registry, dt, &mut outcome);
        self.resolve_bullets(registry, &mut outcome);
        outcome
    }

    fn integrate_players(&self, registry: &mut EntityRegistry, now: Instant) {
        let cfg = &self.config;
        for player in registry.players_mut() {
            player.integrate(cfg.player_speed, now);
            player.pos = Vec2::new(
                player.pos.x.clamp(0.0, cfg.width),
                player.pos.y.clamp(0.0, cfg.height),
            );
        }
    }

    fn steer_agents(&self, registry: &mut EntityRegistry, dt: f64, outcome: &mut TickOutcome) {
        let cfg = &self.config;
        let (agents, players) = registry.agents_and_players_mut();
        for agent in agents.values_mut() {
            agent.steer(players.values(), cfg.agent_speed, cfg.catch_epsilon);
            agent.integrate(dt);
        }

        let before = agents.len();
        agents.retain(|_, a| cfg.in_bounds(a.pos.x, a.pos.y));
        outcome.pruned += before - agents.len();
    }

    fn resolve_bullets(&self, registry: &mut EntityRegistry, outcome: &mut TickOutcome) {
        let cfg = &self.config;
        let (bullets, agents, players) = registry.parts_mut();
        let ids: Vec<u32> = bullets.keys().copied().collect();

        for id in ids {
            let Some(bullet) = bullets.get_mut(&id) else {
                continue;
            };
            let (start, end) = bullet.advance();

            // Agents before players; first match wins
            let hit = agents
                .values()
                .find(|a| segment_hits_circle(start, end, a.pos, cfg.hit_radius))
                .map(|a| Hit::Agent(a.id))
                .or_else(|| {
                    players
                        .values()
                        .find(|p| {
                            p.id != bullet.owner_id && point_in_circle(end, p.pos, cfg.hit_radius)
                        })
                        .map(|p| Hit::Player(p.id.clone()))
                });

            match hit {
                Some(Hit::Agent(agent_id)) => {
                    bullets.remove(&id);
                    outcome.hits += 1;
                    let dead = agents
                        .get_mut(&agent_id)
                        .is_some_and(|a| a.apply_damage(cfg.bullet_damage));
                    if dead {
                        agents.remove(&agent_id);
                        outcome.killed_agents.push(agent_id);
                    }
                }
                Some(Hit::Player(player_id)) => {
                    bullets.remove(&id);
                    outcome.hits += 1;
                    let dead = players
                        .get_mut(&player_id)
                        .is_some_and(|p| p.apply_damage(cfg.bullet_damage));
                    if dead {
                        players.remove(&player_id);
                        outcome.killed_players.push(player_id);
                    }
                }
                None => {
                    if !cfg.in_bounds(end.x, end.y) {
                        bullets.remove(&id);
                        outcome.pruned += 1;
                    }
                }
            }
        }
    }
}
