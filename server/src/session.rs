//! The single game session and its sequencing.
//!
//! Everything here runs on the logic task. Socket tasks, screen timers and
//! submission timers reach it only through the event queue, so no method
//! needs a lock and events are handled strictly in arrival order.

use crate::config::GameConfig;
use crate::connections::{ConnectionId, ConnectionRegistry, Outbox};
use crate::content::DialogueSource;
use crate::event_queue::EventQueue;
use crate::game::{GameManager, GameState};
use crate::players::{PlayerId, PlayerRegistry};
use crate::prompts::{Prompt, PromptStore};
use crate::rounds::{RoundManager, RoundPhase};
use crate::router;
use crate::screen::Screen;
use crate::story::{RoundComplete, StoryManager};
use plotline_protocol::{ClientMessage, ScoreLine, ServerMessage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

/// Rejections of a client request. The connection always stays open.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("only the host can start the game")]
    NotHost,
    #[error("`{kind}` is not accepted during {state}")]
    WrongPhase { kind: &'static str, state: GameState },
    #[error("need at least {need} players to start, have {have}")]
    NotEnoughPlayers { have: usize, need: usize },
    #[error("the game is full")]
    GameFull,
    #[error("already answered this step")]
    AlreadySubmitted,
    #[error("nothing is waiting for an answer")]
    NotAccepting,
}

impl SessionError {
    /// Whether the sender gets an `error` envelope back; the rest are only logged.
    pub fn notify_client(&self) -> bool {
        matches!(
            self,
            SessionError::NotHost
                | SessionError::WrongPhase { .. }
                | SessionError::NotEnoughPlayers { .. }
                | SessionError::GameFull
        )
    }
}

pub struct Session {
    config: GameConfig,
    queue: EventQueue<Session>,
    screen: Box<dyn Screen>,
    dialogue: Box<dyn DialogueSource>,
    rng: StdRng,
    connections: ConnectionRegistry,
    players: PlayerRegistry,
    prompts: PromptStore,
    rounds: RoundManager,
    story: StoryManager,
    game: GameManager,
    /// Set once the lobby has told everyone it can start.
    announced_ready: bool,
    /// Bumped whenever a new waiting step begins; stale timers compare against it.
    step: u64,
}

impl Session {
    pub fn new(
        config: GameConfig,
        queue: EventQueue<Session>,
        screen: Box<dyn Screen>,
        prompts: Vec<Prompt>,
        dialogue: Box<dyn DialogueSource>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let players = PlayerRegistry::new(config.min_players, config.max_players);
        Session {
            config,
            queue,
            screen,
            dialogue,
            rng,
            connections: ConnectionRegistry::new(),
            players,
            prompts: PromptStore::new(prompts),
            rounds: RoundManager::new(),
            story: StoryManager::new(),
            game: GameManager::new(),
            announced_ready: false,
            step: 0,
        }
    }

    pub fn state(&self) -> GameState {
        self.game.current()
    }

    #[cfg(test)]
    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    #[cfg(test)]
    pub fn rounds(&self) -> &RoundManager {
        &self.rounds
    }

    #[cfg(test)]
    pub fn story(&self) -> &StoryManager {
        &self.story
    }

    // ---- transport callbacks ----

    pub fn on_open(&mut self, id: ConnectionId, outbox: Outbox) {
        self.connections.register(id, outbox);
        if self.players.is_full() {
            tracing::warn!(connection_id = %id, "Turning away connection, game is full");
            self.send_error(id, &SessionError::GameFull);
            self.connections.unregister(id);
            return;
        }
        if self.players.create_player(id).is_none() {
            self.connections.unregister(id);
            return;
        }
        if self.state().is_running() {
            // joins mid-step never hold the step up
            self.players.set_ready(id, true);
            tracing::info!(player_id = %id, state = ?self.state(), "Late joiner");
        }
    }

    pub fn on_message(&mut self, id: ConnectionId, raw: &str) {
        match ClientMessage::parse(raw) {
            Ok(msg) => {
                tracing::debug!(connection_id = %id, kind = msg.kind(), "Inbound message");
                router::route_message(self, id, msg);
            }
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "Dropping inbound message");
            }
        }
    }

    pub fn on_close(&mut self, id: ConnectionId) {
        self.connections.unregister(id);
        if self.players.get(id).is_none() {
            return;
        }
        let Some(removed) = self.players.remove_player(id, &mut self.rng) else {
            return;
        };
        let was_presenter = self.rounds.remove_player(id);
        if !self.players.ready_to_start() {
            self.announced_ready = false;
        }

        if self.state() == GameState::Lobby {
            for p in self.players.ids() {
                if self.is_named(p) {
                    self.send_joined(p);
                }
            }
        } else if let Some(host) = removed.new_host.filter(|h| self.is_named(*h)) {
            self.send_joined(host);
        }

        if !self.state().is_running() {
            return;
        }
        if self.players.is_empty() {
            tracing::warn!("Last player left mid-game, ending");
            self.end_game();
            return;
        }
        if was_presenter && self.rounds.is_presenting() {
            self.finish_current_reveal();
            return;
        }
        self.check_progress();
    }

    // ---- inbound handlers ----

    pub fn join(&mut self, id: PlayerId, name: &str) -> Result<(), SessionError> {
        let player = self
            .players
            .get_mut(id)
            .ok_or(SessionError::UnknownPlayer(id))?;
        let name = name.trim();
        if !name.is_empty() {
            player.name = name.to_string();
        }
        tracing::info!(player_id = %id, name, "Player joined");

        let lobby = self.state() == GameState::Lobby;
        if lobby && self.players.ready_to_start() && !self.announced_ready {
            self.announced_ready = true;
            tracing::info!(players = self.players.count(), "Lobby ready to start");
            // connections that have not sent `join` yet get theirs when they do
            for p in self.players.ids() {
                if p == id || self.is_named(p) {
                    self.send_joined(p);
                }
            }
        } else {
            self.send_joined(id);
        }
        Ok(())
    }

    pub fn start_game(&mut self, id: PlayerId) -> Result<(), SessionError> {
        let player = self.players.get(id).ok_or(SessionError::UnknownPlayer(id))?;
        if !player.is_host {
            return Err(SessionError::NotHost);
        }
        self.expect_state("start_game", GameState::Lobby)?;
        if !self.players.ready_to_start() {
            return Err(SessionError::NotEnoughPlayers {
                have: self.players.count(),
                need: self.players.min_players(),
            });
        }
        tracing::info!(player_id = %id, players = self.players.count(), "Host started the game");
        self.connections.broadcast(&ServerMessage::StartGame);
        self.set_state(GameState::Talking);
        Ok(())
    }

    pub fn submit_prompt(&mut self, id: PlayerId, text: &str) -> Result<(), SessionError> {
        self.expect_state("send_prompt", GameState::Prompting)?;
        self.rounds.submit(id, text, &mut self.players)?;
        self.check_progress();
        Ok(())
    }

    pub fn submit_reaction(&mut self, id: PlayerId, text: &str) -> Result<(), SessionError> {
        self.expect_state("send_react", GameState::Reacting)?;
        self.rounds.react(id, text, &mut self.players)?;
        self.check_progress();
        Ok(())
    }

    pub fn submit_choice(&mut self, id: PlayerId, text: &str) -> Result<(), SessionError> {
        self.expect_state("send_choice", GameState::Voting)?;
        self.rounds.vote(id, text, &mut self.players)?;
        self.check_progress();
        Ok(())
    }

    pub fn send_error(&self, id: ConnectionId, err: &SessionError) {
        self.connections.send_to(id, &ServerMessage::error(err.to_string()));
    }

    fn expect_state(&self, kind: &'static str, want: GameState) -> Result<(), SessionError> {
        let state = self.state();
        if state != want {
            return Err(SessionError::WrongPhase { kind, state });
        }
        Ok(())
    }

    fn send_joined(&self, id: PlayerId) {
        let Some(p) = self.players.get(id) else {
            return;
        };
        self.connections.send_to(
            id,
            &ServerMessage::Joined {
                player_name: p.name.clone(),
                is_host: p.is_host,
                ready_to_start: self.players.ready_to_start(),
            },
        );
    }

    fn is_named(&self, id: PlayerId) -> bool {
        self.players.get(id).is_some_and(|p| !p.name.is_empty())
    }

    fn display_name(&self, id: PlayerId) -> String {
        self.players
            .get(id)
            .map(|p| p.display_name())
            .unwrap_or_else(|| "A departed storyteller".to_string())
    }

    // ---- sequencing ----

    fn set_state(&mut self, state: GameState) {
        if let Some((new, old)) = self.game.set_state(state) {
            self.on_state_changed(new, old);
        }
    }

    fn on_state_changed(&mut self, new: GameState, old: GameState) {
        match (old, new) {
            (GameState::Lobby, GameState::Talking) => {
                let round = self.story.begin(&self.prompts, &mut self.rng);
                self.request_round(round);
            }
            (_, GameState::Ended) => self.announce_game_over(),
            _ => {}
        }
    }

    /// Narrates the round intro; prompting starts once the screen is done.
    fn request_round(&mut self, round: u8) {
        if self.state() == GameState::Ended {
            return;
        }
        self.set_state(GameState::Talking);
        self.step += 1;
        tracing::info!(round, "Round requested");
        let text = self.round_narration(round);
        self.screen.show_narrative(
            &text,
            Box::new(move |s: &mut Session| s.begin_prompting(round)),
        );
    }

    fn round_narration(&self, round: u8) -> String {
        let mut parts = vec![];
        if round == 1 {
            parts.push(self.dialogue.get_dialogue("intro"));
        }
        parts.push(self.dialogue.get_dialogue(&format!("round_{round}_intro")));
        if round == 5 {
            if let Some(climax) = self.story.climax() {
                parts.push(format!(
                    "{} {}",
                    self.dialogue.get_dialogue("climax_reveal"),
                    climax.text
                ));
            }
        }
        parts.join(" ")
    }

    fn begin_prompting(&mut self, round: u8) {
        if self.state() != GameState::Talking || self.story.round() != round {
            tracing::debug!(round, state = ?self.state(), "Stale round start ignored");
            return;
        }
        self.set_state(GameState::Prompting);
        self.prompts.begin_round();
        self.rounds.start_round(
            round,
            &mut self.players,
            &mut self.prompts,
            &self.connections,
            self.story.climax(),
            &mut self.rng,
        );
        self.arm_step();
        self.check_progress();
    }

    /// Advances whatever step is in progress once nobody is pending.
    fn check_progress(&mut self) {
        if !self.players.all_ready() {
            return;
        }
        match self.state() {
            GameState::Prompting if self.rounds.phase() == RoundPhase::AwaitingSubmissions => {
                self.on_all_submitted();
            }
            GameState::Reacting | GameState::Voting if self.rounds.is_presenting() => {
                self.finish_current_reveal();
            }
            _ => {}
        }
    }

    fn on_all_submitted(&mut self) {
        self.step += 1;
        tracing::info!(
            round = self.story.round(),
            submissions = self.rounds.submission_count(),
            "All prompts submitted"
        );
        self.rounds.begin_reveal(&mut self.rng);
        let next = if self.story.round() == 1 {
            GameState::Reacting
        } else {
            GameState::Voting
        };
        self.set_state(next);
        self.next_reveal();
    }

    fn next_reveal(&mut self) {
        let Some(entry) = self.rounds.next_entry() else {
            self.end_round();
            return;
        };
        let author = self.display_name(entry.presenter);

        if self.state() == GameState::Reacting {
            self.screen.show_submission(
                &author,
                &entry.answer,
                Box::new(|s: &mut Session| s.present_staged(None)),
            );
            return;
        }

        match self
            .rounds
            .vote_options(&entry, &self.players, &self.prompts, &mut self.rng)
        {
            Some(options) => {
                let shown = options.clone();
                self.screen.show_choices(
                    &author,
                    &shown,
                    Box::new(move |s: &mut Session| s.present_staged(Some(options))),
                );
            }
            None => {
                tracing::debug!(presenter = %entry.presenter, "Answer not voted on");
                self.rounds.take_staged();
                self.story.record(author, entry.answer, None);
                self.next_reveal();
            }
        }
    }

    fn present_staged(&mut self, options: Option<Vec<String>>) {
        if !self.state().is_reveal() {
            return;
        }
        let Some(entry) = self.rounds.take_staged() else {
            tracing::debug!("Presenter left during display, moving on");
            self.next_reveal();
            return;
        };
        self.rounds
            .present(entry, options.as_deref(), &mut self.players, &self.connections);
        self.arm_step();
        self.check_progress();
    }

    fn finish_current_reveal(&mut self) {
        let Some(result) = self.rounds.finish_reveal(&mut self.players) else {
            return;
        };
        let author = self.display_name(result.presenter);
        self.story.record(author, result.answer, result.dominant);
        self.next_reveal();
    }

    fn end_round(&mut self) {
        self.rounds.end_round(&mut self.players);
        match self.story.on_round_complete() {
            RoundComplete::Next(round) => self.request_round(round),
            RoundComplete::Finished => self.end_game(),
        }
    }

    fn end_game(&mut self) {
        self.set_state(GameState::Ended);
    }

    fn announce_game_over(&mut self) {
        self.step += 1;
        let mut scores: Vec<ScoreLine> = self
            .players
            .iter()
            .map(|p| ScoreLine {
                player_name: p.display_name(),
                score: p.score,
            })
            .collect();
        scores.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.player_name.cmp(&b.player_name))
        });

        let text = self.dialogue.get_dialogue("game_over");
        self.connections.broadcast(&ServerMessage::GameOver {
            text: text.clone(),
            scores,
        });
        tracing::info!(beats = self.story.beats().len(), "Game ended");

        let narrative = format!("{text} {}", self.story.transcript());
        self.screen.show_narrative(
            &narrative,
            Box::new(|_: &mut Session| tracing::info!("Story read out")),
        );
    }

    // ---- submission timeout ----

    /// Starts a new waiting step and, when configured, its timeout.
    fn arm_step(&mut self) {
        self.step += 1;
        let Some(timeout) = self.config.submission_timeout else {
            return;
        };
        let step = self.step;
        let queue = self.queue.clone();
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime for submission timer");
            return;
        };
        handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            queue.enqueue(move |s: &mut Session| s.on_step_timeout(step));
        });
    }

    /// Skips everyone still pending on the step the timer was armed for.
    pub fn on_step_timeout(&mut self, step: u64) {
        if step != self.step {
            tracing::debug!(step, current = self.step, "Stale timeout ignored");
            return;
        }
        let pending = self.players.pending();
        if pending.is_empty() {
            return;
        }
        tracing::warn!(
            count = pending.len(),
            state = ?self.state(),
            "Step timed out, skipping players"
        );
        for id in pending {
            self.players.set_ready(id, true);
        }
        self.check_progress();
    }
}
