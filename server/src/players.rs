use crate::connections::ConnectionId;
use crate::prompts::PromptId;
use rand::seq::SliceRandom;
use rand::Rng;

pub type PlayerId = ConnectionId;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Same value as the connection id the player was created for.
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    /// Completed the action the current step is waiting on.
    pub ready: bool,
    /// Id of the prompt most recently handed out, resolved through the prompt store.
    pub last_prompt: Option<PromptId>,
    pub score: u32,
}

impl Player {
    fn new(id: PlayerId) -> Self {
        Player {
            id,
            name: String::new(),
            is_host: false,
            ready: false,
            last_prompt: None,
            score: 0,
        }
    }

    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("Player {}", &self.id.to_string()[..8])
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    pub player: Player,
    pub new_host: Option<PlayerId>,
}

/// Players in join order.
pub struct PlayerRegistry {
    players: Vec<Player>,
    min_players: usize,
    max_players: usize,
}

impl PlayerRegistry {
    pub fn new(min_players: usize, max_players: usize) -> Self {
        PlayerRegistry {
            players: Vec::new(),
            min_players,
            max_players,
        }
    }

    /// First player in becomes host. Returns `None` when full or the id is taken.
    pub fn create_player(&mut self, id: PlayerId) -> Option<&Player> {
        if self.is_full() {
            tracing::warn!(player_id = %id, max = self.max_players, "Player limit reached");
            return None;
        }
        if self.get(id).is_some() {
            tracing::warn!(player_id = %id, "Player already exists");
            return None;
        }
        let mut player = Player::new(id);
        player.is_host = self.players.is_empty();
        tracing::info!(player_id = %id, is_host = player.is_host, "Created player");
        self.players.push(player);
        self.players.last()
    }

    /// A departing host hands the role to a uniformly chosen remaining player.
    pub fn remove_player<R: Rng + ?Sized>(&mut self, id: PlayerId, rng: &mut R) -> Option<Removed> {
        let Some(idx) = self.players.iter().position(|p| p.id == id) else {
            tracing::warn!(player_id = %id, "Remove of unknown player");
            return None;
        };
        let player = self.players.remove(idx);
        let mut new_host = None;
        if player.is_host {
            if let Some(next) = self.players.choose_mut(rng) {
                next.is_host = true;
                new_host = Some(next.id);
                tracing::info!(player_id = %next.id, "New host assigned");
            }
        }
        tracing::info!(player_id = %id, remaining = self.players.len(), "Removed player");
        Some(Removed { player, new_host })
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    #[cfg(test)]
    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn min_players(&self) -> usize {
        self.min_players
    }

    pub fn ready_to_start(&self) -> bool {
        self.players.len() >= self.min_players
    }

    pub fn reset_ready(&mut self) {
        for p in self.players.iter_mut() {
            p.ready = false;
        }
    }

    /// Returns whether the flag changed; `None` for an unknown id.
    pub fn set_ready(&mut self, id: PlayerId, ready: bool) -> Option<bool> {
        let p = self.get_mut(id)?;
        let changed = p.ready != ready;
        p.ready = ready;
        Some(changed)
    }

    pub fn all_ready(&self) -> bool {
        self.players.iter().all(|p| p.ready)
    }

    pub fn pending(&self) -> Vec<PlayerId> {
        self.players.iter().filter(|p| !p.ready).map(|p| p.id).collect()
    }
}
