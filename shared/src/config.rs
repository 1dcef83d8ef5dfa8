/// Arena tuning. Distances are in arena units, speeds noted per field.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ArenaConfig {
    /// Visible field width
    pub width: f64,
    /// Visible field height
    pub height: f64,
    /// How far outside the visible field an entity may drift before it is pruned
    pub bounds_margin: f64,
    /// Player speed (units/s)
    pub player_speed: f64,
    /// Agent speed (units/s)
    pub agent_speed: f64,
    /// Bullet speed (units/tick)
    pub bullet_speed: f64,
    pub hit_radius: f64,
    pub bullet_damage: i32,
    pub player_health: i32,
    pub agent_health: i32,
    /// Agents closer than this to their target stop moving
    pub catch_epsilon: f64,
    pub spawn_x: f64,
    pub spawn_y: f64,
    /// Agents appear this far outside an edge (min, max)
    pub spawn_offset_min: f64,
    pub spawn_offset_max: f64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            bounds_margin: 100.0,
            player_speed: 200.0,
            agent_speed: 100.0,
            bullet_speed: 10.0,
            hit_radius: 10.0,
            bullet_damage: 10,
            player_health: 100,
            agent_health: 30,
            catch_epsilon: 5.0,
            spawn_x: 100.0,
            spawn_y: 100.0,
            spawn_offset_min: 20.0,
            spawn_offset_max: 60.0,
        }
    }
}

impl ArenaConfig {
    /// True if (x, y) lies inside the visible field (edges inclusive).
    pub fn in_field(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && x <= self.width && y >= 0.0 && y <= self.height
    }

    /// True if (x, y) lies inside the field inflated by `bounds_margin`.
    pub fn in_bounds(&self, x: f64, y: f64) -> bool {
        let m = self.bounds_margin;
        x >= -m && x <= self.width + m && y >= -m && y <= self.height + m
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err("width must be finite and > 0".to_string());
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err("height must be finite and > 0".to_string());
        }
        if !self.bounds_margin.is_finite() || self.bounds_margin < 0.0 {
            return Err("bounds_margin must be finite and >= 0".to_string());
        }
        for (name, v) in [
            ("player_speed", self.player_speed),
            ("agent_speed", self.agent_speed),
            ("bullet_speed", self.bullet_speed),
            ("hit_radius", self.hit_radius),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(format!("{} must be finite and > 0", name));
            }
        }
        if self.bullet_damage <= 0 {
            return Err("bullet_damage must be > 0".to_string());
        }
        if self.player_health <= 0 || self.agent_health <= 0 {
            return Err("starting health must be > 0".to_string());
        }
        if !self.catch_epsilon.is_finite() || self.catch_epsilon < 0.0 {
            return Err("catch_epsilon must be finite and >= 0".to_string());
        }
        if !self.in_field(self.spawn_x, self.spawn_y) {
            return Err("player spawn point must lie inside the field".to_string());
        }
        if !(self.spawn_offset_min > 0.0 && self.spawn_offset_max >= self.spawn_offset_min) {
            return Err("spawn offsets must satisfy 0 < min <= max".to_string());
        }
        // Agents must not be pruned the moment they spawn
        if self.spawn_offset_max > self.bounds_margin {
            return Err("spawn_offset_max must be <= bounds_margin".to_string());
        }
        Ok(())
    }
}
