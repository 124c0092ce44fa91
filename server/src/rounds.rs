//! Per-round submission collection and the reveal sub-sequence.
//!
//! `start_round` hands every player a prompt and waits for one submission
//! each. Once everyone is in, `begin_reveal` shuffles the answers and the
//! session walks through them with `next_entry` / `present` /
//! `finish_reveal`. Readiness lives on the players; this type only holds
//! what is scoped to the round.

use crate::connections::ConnectionRegistry;
use crate::players::{PlayerId, PlayerRegistry};
use crate::prompts::{Prompt, PromptId, PromptKind, PromptStore, PromptType};
use crate::reactions::{self, Reaction, ReactionType};
use crate::session::SessionError;
use plotline_protocol::{join_options, ServerMessage, OPTION_SEPARATOR};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    AwaitingSubmissions,
    Revealing,
}

/// What one player was asked this round.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub prompt_id: PromptId,
    /// Choices shown with the prompt; only climax prompts carry any.
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevealEntry {
    pub presenter: PlayerId,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevealResult {
    pub presenter: PlayerId,
    pub answer: String,
    pub dominant: Option<ReactionType>,
    pub correct_votes: usize,
    pub fooled: usize,
}

struct Presenting {
    entry: RevealEntry,
    /// Vote options on the phones; empty while reacting.
    options: Vec<String>,
    reactions: Vec<Reaction>,
    votes: HashMap<PlayerId, String>,
}

pub struct RoundManager {
    phase: RoundPhase,
    round: u8,
    submissions: HashMap<PlayerId, String>,
    assignments: HashMap<PlayerId, Assignment>,
    reveal_order: VecDeque<RevealEntry>,
    /// Entry on the host screen whose phone dispatch has not gone out yet.
    staged: Option<RevealEntry>,
    presenting: Option<Presenting>,
}

impl Default for RoundManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundManager {
    pub fn new() -> Self {
        RoundManager {
            phase: RoundPhase::Idle,
            round: 0,
            submissions: HashMap::new(),
            assignments: HashMap::new(),
            reveal_order: VecDeque::new(),
            staged: None,
            presenting: None,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    #[cfg(test)]
    pub fn round(&self) -> u8 {
        self.round
    }

    #[cfg(test)]
    pub fn submission(&self, id: PlayerId) -> Option<&str> {
        self.submissions.get(&id).map(String::as_str)
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.len()
    }

    #[cfg(test)]
    pub fn assignment(&self, id: PlayerId) -> Option<&Assignment> {
        self.assignments.get(&id)
    }

    #[cfg(test)]
    pub fn remaining_reveals(&self) -> usize {
        self.reveal_order.len()
    }

    pub fn is_presenting(&self) -> bool {
        self.presenting.is_some()
    }

    pub fn presenter(&self) -> Option<PlayerId> {
        self.presenting.as_ref().map(|p| p.entry.presenter)
    }

    fn clear(&mut self) {
        self.submissions.clear();
        self.assignments.clear();
        self.reveal_order.clear();
        self.staged = None;
        self.presenting = None;
    }

    /// Sends each player a prompt for round `round` and starts collecting.
    ///
    /// Players left without a prompt (short pool, missing climax) are marked
    /// ready so they never hold the round up. Returns how many were assigned.
    pub fn start_round<R: Rng + ?Sized>(
        &mut self,
        round: u8,
        players: &mut PlayerRegistry,
        prompts: &mut PromptStore,
        connections: &ConnectionRegistry,
        climax: Option<&Prompt>,
        rng: &mut R,
    ) -> usize {
        self.clear();
        players.reset_ready();
        self.round = round;
        self.phase = RoundPhase::AwaitingSubmissions;

        let ids = players.ids();
        let handed_out: Vec<(PlayerId, Prompt, Vec<String>)> = match PromptType::for_round(round) {
            None => {
                tracing::warn!(round, "No prompt type for round");
                vec![]
            }
            Some(PromptType::Climax) => match climax {
                Some(c) => {
                    prompts.mark_consumed(c.clone());
                    ids.iter()
                        .enumerate()
                        .map(|(seat, id)| (*id, c.clone(), side_options(c, seat)))
                        .collect()
                }
                None => {
                    tracing::warn!(round, "Climax round with no climax prompt");
                    vec![]
                }
            },
            Some(ty) => {
                let drawn = prompts.draw(ty, ids.len(), rng);
                let (mut necessary, mut optional): (Vec<Prompt>, Vec<Prompt>) =
                    drawn.into_iter().partition(Prompt::is_necessary);
                necessary.shuffle(rng);
                optional.shuffle(rng);
                let mut seats = ids.clone();
                seats.shuffle(rng);
                seats
                    .into_iter()
                    .zip(necessary.into_iter().chain(optional))
                    .map(|(id, p)| (id, p, vec![]))
                    .collect()
            }
        };

        let assigned = handed_out.len();
        for (id, prompt, options) in handed_out {
            if let Some(p) = players.get_mut(id) {
                p.last_prompt = Some(prompt.id.clone());
            }
            connections.send_to(
                id,
                &ServerMessage::ShowPrompt {
                    text: prompt.text.clone(),
                    input_type: prompt.input_type(),
                    options: options.clone(),
                },
            );
            self.assignments.insert(
                id,
                Assignment {
                    prompt_id: prompt.id,
                    options,
                },
            );
        }

        for id in ids {
            if !self.assignments.contains_key(&id) {
                tracing::warn!(
                    player_id = %id,
                    round,
                    "No prompt for player, skipping them this round"
                );
                players.set_ready(id, true);
            }
        }
        tracing::info!(round, assigned, players = players.count(), "Round started");
        assigned
    }

    /// Records one submission per player per round.
    pub fn submit(
        &mut self,
        id: PlayerId,
        text: &str,
        players: &mut PlayerRegistry,
    ) -> Result<(), SessionError> {
        if self.phase != RoundPhase::AwaitingSubmissions {
            return Err(SessionError::NotAccepting);
        }
        let player = players.get(id).ok_or(SessionError::UnknownPlayer(id))?;
        if player.ready || self.submissions.contains_key(&id) {
            return Err(SessionError::AlreadySubmitted);
        }
        tracing::info!(player_id = %id, round = self.round, text, "Prompt submitted");
        self.submissions.insert(id, sanitize(text));
        players.set_ready(id, true);
        Ok(())
    }

    /// Shuffles the submissions into presentation order. Returns how many there are.
    pub fn begin_reveal<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut entries: Vec<RevealEntry> = self
            .submissions
            .iter()
            .map(|(id, text)| RevealEntry {
                presenter: *id,
                answer: text.clone(),
            })
            .collect();
        // HashMap order is not seeded; fix it before shuffling
        entries.sort_by_key(|e| e.presenter);
        entries.shuffle(rng);
        self.reveal_order = entries.into();
        self.phase = RoundPhase::Revealing;
        tracing::info!(round = self.round, entries = self.reveal_order.len(), "Reveal started");
        self.reveal_order.len()
    }

    /// Moves the next answer onto the host screen.
    pub fn next_entry(&mut self) -> Option<RevealEntry> {
        self.presenting = None;
        let entry = self.reveal_order.pop_front()?;
        self.staged = Some(entry.clone());
        Some(entry)
    }

    /// `None` once the presenter has left while their answer was on screen.
    pub fn take_staged(&mut self) -> Option<RevealEntry> {
        self.staged.take()
    }

    /// The real answer plus distractors, shuffled. Resolution answers are
    /// mixed with the other players' resolution answers.
    ///
    /// `None` means the entry is not voted on: exposition answers, or a
    /// presenter whose prompt can no longer be resolved.
    pub fn vote_options<R: Rng + ?Sized>(
        &self,
        entry: &RevealEntry,
        players: &PlayerRegistry,
        prompts: &PromptStore,
        rng: &mut R,
    ) -> Option<Vec<String>> {
        let prompt_id = players.get(entry.presenter)?.last_prompt.as_deref()?;
        let Some(prompt) = prompts.consumed(prompt_id) else {
            tracing::warn!(player_id = %entry.presenter, prompt_id, "Presenter's prompt not found");
            return None;
        };
        let distractors = match &prompt.kind {
            PromptKind::Exposition { .. } => return None,
            PromptKind::RisingAction { options, .. } => options.clone(),
            PromptKind::Climax { .. } => self
                .assignments
                .get(&entry.presenter)
                .map(|a| a.options.clone())
                .unwrap_or_default(),
            // endings are guessed among everyone's endings
            PromptKind::Resolution { .. } => {
                let mut others: Vec<(PlayerId, String)> = self
                    .submissions
                    .iter()
                    .filter(|(id, _)| **id != entry.presenter)
                    .map(|(id, text)| (*id, text.clone()))
                    .collect();
                others.sort();
                others.into_iter().map(|(_, text)| text).collect()
            }
        };

        let mut options = vec![entry.answer.clone()];
        for d in distractors {
            let d = sanitize(&d);
            if !options.iter().any(|o| same_answer(o, &d)) {
                options.push(d);
            }
        }
        options.shuffle(rng);
        Some(options)
    }

    /// Sends the entry to every phone. The presenter is marked ready so the
    /// step only waits on everyone else.
    pub fn present(
        &mut self,
        entry: RevealEntry,
        options: Option<&[String]>,
        players: &mut PlayerRegistry,
        connections: &ConnectionRegistry,
    ) {
        players.reset_ready();
        players.set_ready(entry.presenter, true);

        for p in players.iter() {
            let my_prompt = p.id == entry.presenter;
            let msg = match options {
                None => ServerMessage::ShowAnswer {
                    text: entry.answer.clone(),
                    my_prompt,
                },
                Some(opts) => ServerMessage::ShowChoices {
                    text: join_options(opts),
                    my_prompt,
                },
            };
            connections.send_to(p.id, &msg);
        }
        tracing::debug!(
            presenter = %entry.presenter,
            voting = options.is_some(),
            "Presenting answer"
        );
        self.presenting = Some(Presenting {
            entry,
            options: options.map(<[String]>::to_vec).unwrap_or_default(),
            reactions: Vec::new(),
            votes: HashMap::new(),
        });
    }

    pub fn react(
        &mut self,
        id: PlayerId,
        text: &str,
        players: &mut PlayerRegistry,
    ) -> Result<(), SessionError> {
        let presenting = self.presenting.as_mut().ok_or(SessionError::NotAccepting)?;
        let player = players.get(id).ok_or(SessionError::UnknownPlayer(id))?;
        if player.ready {
            return Err(SessionError::AlreadySubmitted);
        }
        let reaction = Reaction::new(text.trim());
        tracing::info!(
            player_id = %id,
            reaction = %reaction.reaction_type,
            text,
            "Reaction received"
        );
        presenting.reactions.push(reaction);
        players.set_ready(id, true);
        Ok(())
    }

    pub fn vote(
        &mut self,
        id: PlayerId,
        choice: &str,
        players: &mut PlayerRegistry,
    ) -> Result<(), SessionError> {
        let presenting = self.presenting.as_mut().ok_or(SessionError::NotAccepting)?;
        let player = players.get(id).ok_or(SessionError::UnknownPlayer(id))?;
        if player.ready {
            return Err(SessionError::AlreadySubmitted);
        }
        players.set_ready(id, true);
        if !presenting.options.iter().any(|o| same_answer(o, choice)) {
            tracing::warn!(player_id = %id, choice, "Vote is not one of the options, skipping it");
            return Ok(());
        }
        tracing::info!(player_id = %id, choice, "Vote received");
        presenting.votes.insert(id, choice.trim().to_string());
        Ok(())
    }

    /// Closes the current reveal step, tallying reactions and scoring votes.
    ///
    /// A voter who finds the real answer scores a point; the presenter
    /// scores a point for every voter fooled by a distractor.
    pub fn finish_reveal(&mut self, players: &mut PlayerRegistry) -> Option<RevealResult> {
        let Presenting {
            entry,
            reactions,
            votes,
            ..
        } = self.presenting.take()?;

        let mut correct_votes = 0;
        let mut fooled = 0;
        for (voter, choice) in &votes {
            if same_answer(choice, &entry.answer) {
                correct_votes += 1;
                if let Some(p) = players.get_mut(*voter) {
                    p.score += 1;
                }
            } else {
                fooled += 1;
            }
        }
        if let Some(p) = players.get_mut(entry.presenter) {
            p.score += fooled as u32;
        }

        let dominant = reactions::dominant(&reactions);
        tracing::info!(
            presenter = %entry.presenter,
            reactions = reactions.len(),
            votes = votes.len(),
            correct_votes,
            fooled,
            "Reveal finished"
        );
        Some(RevealResult {
            presenter: entry.presenter,
            answer: entry.answer,
            dominant,
            correct_votes,
            fooled,
        })
    }

    /// Forgets a departed player. Returns true when they were the presenter
    /// of the entry currently staged or shown.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        self.submissions.remove(&id);
        self.assignments.remove(&id);
        self.reveal_order.retain(|e| e.presenter != id);
        if let Some(p) = self.presenting.as_mut() {
            p.votes.remove(&id);
        }
        if self.staged.as_ref().is_some_and(|e| e.presenter == id) {
            self.staged = None;
            return true;
        }
        self.presenter() == Some(id)
    }

    pub fn end_round(&mut self, players: &mut PlayerRegistry) {
        tracing::info!(round = self.round, "Round over");
        self.clear();
        players.reset_ready();
        self.phase = RoundPhase::Idle;
    }
}

/// Which side of the climax a seat plays: even seats protagonist, odd antagonist.
fn side_options(climax: &Prompt, seat: usize) -> Vec<String> {
    match &climax.kind {
        PromptKind::Climax {
            protagonist_options,
            antagonist_options,
            ..
        } => {
            if seat % 2 == 0 {
                protagonist_options.clone()
            } else {
                antagonist_options.clone()
            }
        }
        _ => vec![],
    }
}

/// Keeps option lists splittable on the wire.
fn sanitize(text: &str) -> String {
    text.trim().replace(OPTION_SEPARATOR, "/")
}

fn same_answer(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
