use arena_shared::vec2::Vec2;
use std::time::Instant;

/// A connected player's avatar. Shares its id with the owning session.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: String,
    pub pos: Vec2,
    pub health: i32,
    /// Raw intended velocity from the last `move`; normalized at integration time.
    pub velocity: Vec2,
    pub last_update: Instant,
}

impl Player {
    pub fn new(id: String, pos: Vec2, health: i32, now: Instant) -> Self {
        Self {
            id,
            pos,
            health,
            velocity: Vec2::ZERO,
            last_update: now,
        }
    }

    /// Move at `speed` units/s along the intended direction for the wall time
    /// elapsed since this player's last update.
    pub fn integrate(&mut self, speed: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        if !self.velocity.is_zero() {
            self.pos += self.velocity.normalize() * (speed * elapsed);
        }
        self.last_update = now;
    }

    /// Apply damage, saturating at zero. Returns true if the player died.
    pub fn apply_damage(&mut self, amount: i32) -> bool {
        self.health = (self.health - amount).max(0);
        self.health == 0
    }
}
