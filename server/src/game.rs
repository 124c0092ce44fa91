use serde::Serialize;
use std::fmt;

/// Top-level phase of the shared game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GameState {
    Lobby,
    /// Narration on the host screen; phones wait.
    Talking,
    Prompting,
    /// Round 1 reveal: free-text reactions to each answer.
    Reacting,
    /// Round 2+ reveal: guess the real answer.
    Voting,
    Ended,
}

impl GameState {
    pub fn is_running(&self) -> bool {
        !matches!(self, GameState::Lobby | GameState::Ended)
    }

    pub fn is_reveal(&self) -> bool {
        matches!(self, GameState::Reacting | GameState::Voting)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A transition that actually happened: `(new, old)`.
pub type Transition = (GameState, GameState);

pub struct GameManager {
    current: GameState,
    previous: GameState,
}

impl Default for GameManager {
    fn default() -> Self {
        Self::new()
    }
}

impl GameManager {
    pub fn new() -> Self {
        GameManager {
            current: GameState::Lobby,
            previous: GameState::Lobby,
        }
    }

    pub fn current(&self) -> GameState {
        self.current
    }

    #[cfg(test)]
    pub fn previous(&self) -> GameState {
        self.previous
    }

    /// `Ended` is terminal and setting the current state again is a no-op;
    /// both return `None` so the caller fires no change handler.
    pub fn set_state(&mut self, new: GameState) -> Option<Transition> {
        if self.current == GameState::Ended {
            tracing::debug!(state = ?new, "Ignoring transition out of Ended");
            return None;
        }
        if self.current == new {
            return None;
        }
        self.previous = self.current;
        self.current = new;
        tracing::info!(state = ?new, previous = ?self.previous, "Game state changed");
        Some((new, self.previous))
    }
}
