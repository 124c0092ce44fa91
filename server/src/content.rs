//! Static game content: prompt pools and dialogue lines.
//!
//! Content is read once at startup from `prompts.json` / `dialogue.json` in a
//! content directory, or from the copies compiled into the binary.

use crate::prompts::{Prompt, PromptKind, PromptType};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

const BUILTIN_PROMPTS: &str = include_str!("../content/prompts.json");
const BUILTIN_DIALOGUE: &str = include_str!("../content/dialogue.json");

pub const PROMPTS_FILE: &str = "prompts.json";
pub const DIALOGUE_FILE: &str = "dialogue.json";
pub const MISSING_DIALOGUE: &str = "Missing dialogue!";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} contains no prompts")]
    EmptyPool(String),
    #[error("duplicate prompt id `{0}`")]
    DuplicateId(String),
    #[error("prompt `{id}` is invalid: {reason}")]
    Invalid { id: String, reason: String },
}

/// Where prompt pools come from.
pub trait PromptSource {
    fn load_prompts(&self) -> Result<Vec<Prompt>, ContentError>;
}

/// Lookup of narration lines by key.
pub trait DialogueSource: Send + Sync {
    /// Missing keys yield a visible placeholder instead of failing.
    fn get_dialogue(&self, key: &str) -> String;
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PromptFile {
    exposition: Vec<ExpositionEntry>,
    rising_action: Vec<RisingActionEntry>,
    climax: Vec<ClimaxEntry>,
    resolution: Vec<ResolutionEntry>,
}

#[derive(Debug, Deserialize)]
struct ExpositionEntry {
    id: String,
    text: String,
    #[serde(default)]
    story_element: String,
    #[serde(default)]
    necessity: bool,
}

#[derive(Debug, Deserialize)]
struct RisingActionEntry {
    id: String,
    text: String,
    #[serde(default)]
    round: u8,
    #[serde(default)]
    story_beat: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    resonance_tag: String,
}

#[derive(Debug, Deserialize)]
struct ClimaxEntry {
    id: String,
    text: String,
    #[serde(default)]
    climax_type: String,
    protagonist_options: Vec<String>,
    antagonist_options: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ResolutionEntry {
    id: String,
    text: String,
    #[serde(default)]
    outcome_category: String,
    #[serde(default)]
    tone: String,
}

impl PromptFile {
    fn into_prompts(self) -> Vec<Prompt> {
        let mut out = Vec::new();
        out.extend(self.exposition.into_iter().map(|e| Prompt {
            id: e.id,
            text: e.text,
            kind: PromptKind::Exposition {
                story_element: e.story_element,
                necessity: e.necessity,
            },
        }));
        out.extend(self.rising_action.into_iter().map(|e| Prompt {
            id: e.id,
            text: e.text,
            kind: PromptKind::RisingAction {
                round: e.round,
                story_beat: e.story_beat,
                options: e.options,
                resonance_tag: e.resonance_tag,
            },
        }));
        out.extend(self.climax.into_iter().map(|e| Prompt {
            id: e.id,
            text: e.text,
            kind: PromptKind::Climax {
                climax_type: e.climax_type,
                protagonist_options: e.protagonist_options,
                antagonist_options: e.antagonist_options,
            },
        }));
        out.extend(self.resolution.into_iter().map(|e| Prompt {
            id: e.id,
            text: e.text,
            kind: PromptKind::Resolution {
                outcome_category: e.outcome_category,
                tone: e.tone,
            },
        }));
        out
    }
}

pub fn parse_prompts(json: &str, what: &str) -> Result<Vec<Prompt>, ContentError> {
    let file: PromptFile = serde_json::from_str(json).map_err(|source| ContentError::Parse {
        what: what.to_string(),
        source,
    })?;
    let prompts = file.into_prompts();
    if prompts.is_empty() {
        return Err(ContentError::EmptyPool(what.to_string()));
    }
    validate(&prompts)?;
    Ok(prompts)
}

fn validate(prompts: &[Prompt]) -> Result<(), ContentError> {
    let mut seen = HashSet::new();
    for p in prompts {
        if !seen.insert(p.id.as_str()) {
            return Err(ContentError::DuplicateId(p.id.clone()));
        }
        if p.text.trim().is_empty() {
            return Err(ContentError::Invalid {
                id: p.id.clone(),
                reason: "empty prompt text".into(),
            });
        }
        if let PromptKind::Climax {
            protagonist_options,
            antagonist_options,
            ..
        } = &p.kind
        {
            if protagonist_options.is_empty() || antagonist_options.is_empty() {
                return Err(ContentError::Invalid {
                    id: p.id.clone(),
                    reason: "climax needs options for both sides".into(),
                });
            }
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, ContentError> {
    std::fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// JSON content, from a directory when one is given, otherwise built in.
#[derive(Debug, Clone, Default)]
pub struct JsonContent {
    dir: Option<PathBuf>,
}

impl JsonContent {
    pub fn new(dir: Option<PathBuf>) -> Self {
        JsonContent { dir }
    }

    #[cfg(test)]
    pub fn builtin() -> Self {
        JsonContent { dir: None }
    }

    pub fn load_dialogue(&self) -> Result<Dialogue, ContentError> {
        match &self.dir {
            Some(dir) => {
                let path = dir.join(DIALOGUE_FILE);
                Dialogue::from_json(&read(&path)?, &path.display().to_string())
            }
            None => Dialogue::from_json(BUILTIN_DIALOGUE, "built-in dialogue"),
        }
    }
}

impl PromptSource for JsonContent {
    fn load_prompts(&self) -> Result<Vec<Prompt>, ContentError> {
        let prompts = match &self.dir {
            Some(dir) => {
                let path = dir.join(PROMPTS_FILE);
                parse_prompts(&read(&path)?, &path.display().to_string())?
            }
            None => parse_prompts(BUILTIN_PROMPTS, "built-in prompts")?,
        };
        for ty in PromptType::ALL {
            let n = prompts.iter().filter(|p| p.prompt_type() == ty).count();
            if n == 0 {
                tracing::warn!(prompt_type = %ty, "No prompts loaded for type");
            } else {
                tracing::info!(prompt_type = %ty, count = n, "Loaded prompts");
            }
        }
        Ok(prompts)
    }
}

pub fn load_prompts(dir: Option<&Path>) -> Result<Vec<Prompt>, ContentError> {
    JsonContent::new(dir.map(Path::to_path_buf)).load_prompts()
}

pub fn load_dialogue(dir: Option<&Path>) -> Result<Dialogue, ContentError> {
    JsonContent::new(dir.map(Path::to_path_buf)).load_dialogue()
}

#[derive(Debug, Clone, Default)]
pub struct Dialogue {
    lines: HashMap<String, String>,
}

impl Dialogue {
    pub fn from_json(json: &str, what: &str) -> Result<Self, ContentError> {
        let lines: HashMap<String, String> =
            serde_json::from_str(json).map_err(|source| ContentError::Parse {
                what: what.to_string(),
                source,
            })?;
        tracing::info!(count = lines.len(), "Loaded dialogue segments");
        Ok(Dialogue { lines })
    }

    #[cfg(test)]
    pub fn has(&self, key: &str) -> bool {
        self.lines.contains_key(key)
    }
}

impl DialogueSource for Dialogue {
    fn get_dialogue(&self, key: &str) -> String {
        match self.lines.get(key) {
            Some(text) => text.clone(),
            None => {
                tracing::warn!(key, "Dialogue key not found");
                MISSING_DIALOGUE.to_string()
            }
        }
    }
}
