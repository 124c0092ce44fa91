//! Story arc: the climax rolled at game start, the round counter and the
//! transcript of everything the players wrote.

use crate::prompts::{Prompt, PromptStore, PromptType};
use crate::reactions::ReactionType;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

pub const FINAL_ROUND: u8 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryBeat {
    pub round: u8,
    pub author: String,
    pub text: String,
    pub reaction: Option<ReactionType>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundComplete {
    Next(u8),
    Finished,
}

#[derive(Default)]
pub struct StoryManager {
    climax: Option<Prompt>,
    round: u8,
    beats: Vec<StoryBeat>,
}

impl StoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rolls the climax for the whole game and moves to round 1.
    pub fn begin<R: Rng + ?Sized>(&mut self, prompts: &PromptStore, rng: &mut R) -> u8 {
        self.climax = prompts.draw_one(PromptType::Climax, rng);
        match &self.climax {
            Some(c) => tracing::info!(climax = %c.id, "Climax chosen"),
            None => tracing::warn!("No climax prompt available"),
        }
        self.beats.clear();
        self.round = 1;
        self.round
    }

    pub fn round(&self) -> u8 {
        self.round
    }

    pub fn climax(&self) -> Option<&Prompt> {
        self.climax.as_ref()
    }

    pub fn on_round_complete(&mut self) -> RoundComplete {
        self.round = self.round.saturating_add(1);
        if self.round > FINAL_ROUND {
            tracing::info!("Story complete");
            RoundComplete::Finished
        } else {
            RoundComplete::Next(self.round)
        }
    }

    pub fn record(&mut self, author: String, text: String, reaction: Option<ReactionType>) {
        self.beats.push(StoryBeat {
            round: self.round,
            author,
            text,
            reaction,
            at: Utc::now(),
        });
    }

    pub fn beats(&self) -> &[StoryBeat] {
        &self.beats
    }

    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for beat in &self.beats {
            out.push_str(&format!("{}: {}", beat.author, beat.text));
            if let Some(r) = beat.reaction {
                out.push_str(&format!(" ({r})"));
            }
            out.push_str(". ");
        }
        out
    }
}
