use arena_shared::vec2::Vec2;

/// A projectile. Velocity is in units per tick.
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: u32,
    pub pos: Vec2,
    pub velocity: Vec2,
    /// Shooter's player id. The shooter may have left since; that is fine.
    pub owner_id: String,
}

impl Bullet {
    /// Advance one tick. Returns the travel segment (start, end).
    pub fn advance(&mut self) -> (Vec2, Vec2) {
        let start = self.pos;
        self.pos += self.velocity;
        (start, self.pos)
    }
}
