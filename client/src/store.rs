//! Latest known state of every player and bullet in the room

use shared::{Bullet, PlayerState, Vector2};
use std::collections::HashMap;

/// Mirror of the last authoritative snapshot, with the local player's position
/// replaced by the predicted one.
///
/// Render code reads from here and never writes.
#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    local_id: Option<String>,
    players: HashMap<String, PlayerState>,
    bullets: Vec<Bullet>,
    predicted: Option<Vector2>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_local_id(&mut self, id: impl Into<String>) {
        self.local_id = Some(id.into());
    }

    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// Swaps in a snapshot's entity lists. Players missing from the snapshot
    /// are gone. The predicted local position is kept.
    pub fn replace(&mut self, players: Vec<PlayerState>, bullets: Vec<Bullet>) {
        self.players = players
            .into_iter()
            .map(|player| (player.id.clone(), player))
            .collect();
        self.bullets = bullets;
    }

    pub fn local_player(&self) -> Option<&PlayerState> {
        self.local_id.as_ref().and_then(|id| self.players.get(id))
    }

    /// Position the local player is rendered at, once it has been seen in a snapshot.
    pub fn local_position(&self) -> Option<Vector2> {
        self.predicted
    }

    pub fn set_local_position(&mut self, position: Vector2) {
        self.predicted = Some(position);
        if let Some(player) = self
            .local_id
            .as_ref()
            .and_then(|id| self.players.get_mut(id))
        {
            player.position = position;
        }
    }

    pub fn get(&self, id: &str) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    pub fn remote_players(&self) -> impl Iterator<Item = &PlayerState> {
        let local = self.local_id.as_deref();
        self.players
            .values()
            .filter(move |player| Some(player.id.as_str()) != local)
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}
