//! Hostile agents and their steering.

use crate::player::Player;
use arena_shared::vec2::Vec2;

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: u32,
    pub pos: Vec2,
    pub health: i32,
    /// Units per second
    pub velocity: Vec2,
}

impl Agent {
    pub fn new(id: u32, pos: Vec2, health: i32) -> Self {
        Self {
            id,
            pos,
            health,
            velocity: Vec2::ZERO,
        }
    }

    /// Head toward the nearest player at `speed`. Within `epsilon` of it (or
    /// with nobody to chase) the agent stops.
    pub fn steer<'a>(
        &mut self,
        players: impl IntoIterator<Item = &'a Player>,
        speed: f64,
        epsilon: f64,
    ) {
        let nearest = players
            .into_iter()
            .map(|p| (p.pos, self.pos.distance(p.pos)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        self.velocity = match nearest {
            Some((target, dist)) if dist > epsilon => (target - self.pos).normalize() * speed,
            _ => Vec2::ZERO,
        };
    }

    pub fn integrate(&mut self, dt: f64) {
        self.pos += self.velocity * dt;
    }

    /// Apply damage, saturating at zero. Returns true if the agent died.
    pub fn apply_damage(&mut self, amount: i32) -> bool {
        self.health = (self.health - amount).max(0);
        self.health == 0
    }
}
