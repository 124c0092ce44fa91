//! Story prompts and the per-round draw pool.

use plotline_protocol::InputType;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type PromptId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptType {
    Exposition,
    RisingAction,
    Climax,
    Resolution,
}

impl PromptType {
    pub const ALL: [PromptType; 4] = [
        PromptType::Exposition,
        PromptType::RisingAction,
        PromptType::Climax,
        PromptType::Resolution,
    ];

    /// Which kind of prompt a story round uses. Rounds outside 1..=6 have none.
    pub fn for_round(round: u8) -> Option<PromptType> {
        match round {
            1 => Some(PromptType::Exposition),
            2..=4 => Some(PromptType::RisingAction),
            5 => Some(PromptType::Climax),
            6 => Some(PromptType::Resolution),
            _ => None,
        }
    }

    pub fn input_type(&self) -> InputType {
        match self {
            PromptType::Climax => InputType::Choice,
            PromptType::Exposition | PromptType::RisingAction | PromptType::Resolution => {
                InputType::Text
            }
        }
    }
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptType::Exposition => write!(f, "exposition"),
            PromptType::RisingAction => write!(f, "rising action"),
            PromptType::Climax => write!(f, "climax"),
            PromptType::Resolution => write!(f, "resolution"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PromptKind {
    Exposition {
        story_element: String,
        necessity: bool,
    },
    RisingAction {
        round: u8,
        story_beat: String,
        options: Vec<String>,
        resonance_tag: String,
    },
    Climax {
        climax_type: String,
        protagonist_options: Vec<String>,
        antagonist_options: Vec<String>,
    },
    Resolution {
        outcome_category: String,
        tone: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: PromptId,
    pub text: String,
    pub kind: PromptKind,
}

impl Prompt {
    pub fn prompt_type(&self) -> PromptType {
        match self.kind {
            PromptKind::Exposition { .. } => PromptType::Exposition,
            PromptKind::RisingAction { .. } => PromptType::RisingAction,
            PromptKind::Climax { .. } => PromptType::Climax,
            PromptKind::Resolution { .. } => PromptType::Resolution,
        }
    }

    pub fn input_type(&self) -> InputType {
        self.prompt_type().input_type()
    }

    pub fn is_necessary(&self) -> bool {
        matches!(self.kind, PromptKind::Exposition { necessity: true, .. })
    }
}

/// Permanent prompt pools plus the working copy for the round in progress.
pub struct PromptStore {
    pools: HashMap<PromptType, Vec<Prompt>>,
    round_pool: HashMap<PromptType, Vec<Prompt>>,
    consumed: Vec<Prompt>,
}

impl PromptStore {
    pub fn new(prompts: Vec<Prompt>) -> Self {
        let mut pools: HashMap<PromptType, Vec<Prompt>> = HashMap::new();
        for p in prompts {
            pools.entry(p.prompt_type()).or_default().push(p);
        }
        let round_pool = pools.clone();
        PromptStore {
            pools,
            round_pool,
            consumed: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn pool_size(&self, ty: PromptType) -> usize {
        self.pools.get(&ty).map_or(0, Vec::len)
    }

    #[cfg(test)]
    pub fn available(&self, ty: PromptType) -> usize {
        self.round_pool.get(&ty).map_or(0, Vec::len)
    }

    /// Refills the working pool and forgets what the last round handed out.
    pub fn begin_round(&mut self) {
        self.round_pool = self.pools.clone();
        self.consumed.clear();
    }

    /// Draws prompts for one round, removing them from the working pool.
    ///
    /// Exposition draws always include every necessary prompt still in the
    /// pool, even when that exceeds `count`, and top up with random optional
    /// prompts. Every other type draws `count` at random, clamped to the pool.
    pub fn draw<R: Rng + ?Sized>(
        &mut self,
        ty: PromptType,
        count: usize,
        rng: &mut R,
    ) -> Vec<Prompt> {
        let Some(pool) = self.round_pool.get_mut(&ty) else {
            tracing::warn!(prompt_type = %ty, "No prompt pool loaded");
            return vec![];
        };
        if pool.is_empty() {
            tracing::warn!(prompt_type = %ty, "Prompt pool is empty");
            return vec![];
        }

        let drawn = match ty {
            PromptType::Exposition => {
                let (necessary, optional): (Vec<Prompt>, Vec<Prompt>) =
                    std::mem::take(pool).into_iter().partition(Prompt::is_necessary);
                let remaining = count.saturating_sub(necessary.len());
                let mut optional = optional;
                let extra = take_random(&mut optional, remaining, rng);
                *pool = optional;
                necessary.into_iter().chain(extra).collect::<Vec<_>>()
            }
            _ => take_random(pool, count, rng),
        };

        self.consumed.extend(drawn.iter().cloned());
        tracing::debug!(prompt_type = %ty, requested = count, drawn = drawn.len(), "Drew prompts");
        drawn
    }

    /// One random prompt from the permanent pool, e.g. the climax rolled at game start.
    pub fn draw_one<R: Rng + ?Sized>(&self, ty: PromptType, rng: &mut R) -> Option<Prompt> {
        let pool = self.pools.get(&ty).filter(|p| !p.is_empty())?;
        Some(pool[rng.gen_range(0..pool.len())].clone())
    }

    /// Records a prompt handed out this round that did not come from `draw`.
    pub fn mark_consumed(&mut self, prompt: Prompt) {
        if self.consumed(&prompt.id).is_none() {
            self.consumed.push(prompt);
        }
    }

    pub fn consumed(&self, id: &str) -> Option<&Prompt> {
        self.consumed.iter().find(|p| p.id == id)
    }
}

/// Removes up to `count` uniformly chosen items, returned in random order.
fn take_random<T, R: Rng + ?Sized>(pool: &mut Vec<T>, count: usize, rng: &mut R) -> Vec<T> {
    let n = count.min(pool.len());
    if n == 0 {
        return vec![];
    }
    let picked = index::sample(rng, pool.len(), n).into_vec();
    let mut slots: Vec<Option<T>> = std::mem::take(pool).into_iter().map(Some).collect();
    let out = picked.iter().filter_map(|&i| slots[i].take()).collect();
    *pool = slots.into_iter().flatten().collect();
    out
}
