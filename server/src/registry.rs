use crate::agent::Agent;
use crate::bullet::Bullet;
use crate::player::Player;
use arena_shared::vec2::Vec2;
use std::collections::HashMap;

/// Every live entity in the arena. The engine keeps exactly one of these
/// behind its registry lock; nothing here locks on its own.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    players: HashMap<String, Player>,
    bullets: HashMap<u32, Bullet>,
    agents: HashMap<u32, Agent>,
    next_bullet_id: u32,
    next_agent_id: u32,
}

/// Immutable copy of the registry taken for serialization.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub players: Vec<Player>,
    pub bullets: Vec<Bullet>,
    pub agents: Vec<Agent>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            next_bullet_id: 1,
            next_agent_id: 1,
            ..Default::default()
        }
    }

    /// Insert or replace a player by id.
    pub fn upsert_player(&mut self, player: Player) {
        self.players.insert(player.id.clone(), player);
    }

    pub fn remove_player(&mut self, id: &str) -> Option<Player> {
        self.players.remove(id)
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Create a bullet and return its id.
    pub fn add_bullet(&mut self, owner_id: &str, pos: Vec2, velocity: Vec2) -> u32 {
        let id = self.next_bullet_id;
        self.next_bullet_id = self.next_bullet_id.wrapping_add(1);
        let bullet = Bullet {
            id,
            pos,
            velocity,
            owner_id: owner_id.to_string(),
        };
        let prev = self.bullets.insert(id, bullet);
        assert!(prev.is_none(), "duplicate bullet id {}", id);
        id
    }

    /// Removing an id that is already gone is a no-op.
    pub fn remove_bullet(&mut self, id: u32) -> Option<Bullet> {
        self.bullets.remove(&id)
    }

    pub fn bullet(&self, id: u32) -> Option<&Bullet> {
        self.bullets.get(&id)
    }

    pub fn bullet_count(&self) -> usize {
        self.bullets.len()
    }

    /// Create an agent with zero velocity and return its id.
    pub fn add_agent(&mut self, pos: Vec2, health: i32) -> u32 {
        let id = self.next_agent_id;
        self.next_agent_id = self.next_agent_id.wrapping_add(1);
        let prev = self.agents.insert(id, Agent::new(id, pos, health));
        assert!(prev.is_none(), "duplicate agent id {}", id);
        id
    }

    pub fn remove_agent(&mut self, id: u32) -> Option<Agent> {
        self.agents.remove(&id)
    }

    pub fn agent(&self, id: u32) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            players: self.players.values().cloned().collect(),
            bullets: self.bullets.values().cloned().collect(),
            agents: self.agents.values().cloned().collect(),
        }
    }

    /// Split borrow used by the tick: agents steer over players.
    pub(crate) fn agents_and_players_mut(
        &mut self,
    ) -> (&mut HashMap<u32, Agent>, &HashMap<String, Player>) {
        (&mut self.agents, &self.players)
    }

    /// Split borrow used by bullet resolution.
    pub(crate) fn parts_mut(
        &mut self,
    ) -> (
        &mut HashMap<u32, Bullet>,
        &mut HashMap<u32, Agent>,
        &mut HashMap<String, Player>,
    ) {
        (&mut self.bullets, &mut self.agents, &mut self.players)
    }
}
