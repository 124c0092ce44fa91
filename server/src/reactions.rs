use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionType {
    Comedy,
    Triumphant,
    Dark,
    Tragedy,
    Chaos,
    Bittersweet,
    None,
}

impl ReactionType {
    pub const NAMED: [ReactionType; 6] = [
        ReactionType::Comedy,
        ReactionType::Triumphant,
        ReactionType::Dark,
        ReactionType::Tragedy,
        ReactionType::Chaos,
        ReactionType::Bittersweet,
    ];

    /// Anything unrecognised maps to `None`; never an error.
    pub fn classify(text: &str) -> ReactionType {
        match text.trim().to_lowercase().as_str() {
            "comedy" => ReactionType::Comedy,
            "triumphant" => ReactionType::Triumphant,
            "dark" => ReactionType::Dark,
            "tragedy" => ReactionType::Tragedy,
            "chaos" => ReactionType::Chaos,
            "bittersweet" => ReactionType::Bittersweet,
            _ => ReactionType::None,
        }
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReactionType::Comedy => "comedy",
            ReactionType::Triumphant => "triumphant",
            ReactionType::Dark => "dark",
            ReactionType::Tragedy => "tragedy",
            ReactionType::Chaos => "chaos",
            ReactionType::Bittersweet => "bittersweet",
            ReactionType::None => "none",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub reaction_name: String,
    pub reaction_type: ReactionType,
}

impl Reaction {
    pub fn new(name: impl Into<String>) -> Self {
        let reaction_name = name.into();
        let reaction_type = ReactionType::classify(&reaction_name);
        Reaction {
            reaction_name,
            reaction_type,
        }
    }
}

/// Most frequent classified reaction. Ties go to the earlier entry in `NAMED`.
pub fn dominant(reactions: &[Reaction]) -> Option<ReactionType> {
    let mut counts: HashMap<ReactionType, usize> = HashMap::new();
    for r in reactions {
        if r.reaction_type != ReactionType::None {
            *counts.entry(r.reaction_type).or_default() += 1;
        }
    }
    let best = counts.values().copied().max()?;
    ReactionType::NAMED
        .into_iter()
        .find(|t| counts.get(t) == Some(&best))
}
