use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// ---- Input kinds for prompts ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Free text box on the controller
    Text,
    /// One of a fixed list of options
    Choice,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputType::Text => write!(f, "text"),
            InputType::Choice => write!(f, "choice"),
        }
    }
}

impl Default for InputType {
    fn default() -> Self {
        InputType::Text
    }
}

/// Separator used when a list of options travels as a single string.
pub const OPTION_SEPARATOR: &str = "|";

pub fn join_options<S: AsRef<str>>(options: &[S]) -> String {
    options
        .iter()
        .map(|o| o.as_ref())
        .collect::<Vec<_>>()
        .join(OPTION_SEPARATOR)
}

pub fn split_options(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }
    text.split(OPTION_SEPARATOR).map(str::to_string).collect()
}

/// ---- Client → Server ----
///
/// Every frame is one JSON object tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        #[serde(rename = "playerName")]
        player_name: String,
    },
    StartGame,

    // Prompt phase, every round
    SendPrompt { text: String },
    // Reacting phase, round 1
    SendReact { text: String },
    // Voting phase, rounds 2-6
    SendChoice { text: String },
}

impl ClientMessage {
    pub const KINDS: [&'static str; 5] = [
        "join",
        "start_game",
        "send_prompt",
        "send_react",
        "send_choice",
    ];

    /// Parses one inbound frame, telling unknown kinds apart from malformed ones.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(ProtocolError::MissingType)?;
        if !Self::KINDS.contains(&kind) {
            return Err(ProtocolError::UnknownType(kind.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::StartGame => "start_game",
            ClientMessage::SendPrompt { .. } => "send_prompt",
            ClientMessage::SendReact { .. } => "send_react",
            ClientMessage::SendChoice { .. } => "send_choice",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("envelope has no string `type` field")]
    MissingType,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
}

/// ---- Server → Client ----
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Joined {
        #[serde(rename = "playerName")]
        player_name: String,
        #[serde(rename = "isHost")]
        is_host: bool,
        #[serde(rename = "readyToStart")]
        ready_to_start: bool,
    },
    StartGame,
    ShowPrompt {
        text: String,
        #[serde(rename = "inputType")]
        input_type: InputType,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        options: Vec<String>,
    },
    ShowAnswer {
        text: String,
        #[serde(rename = "myPrompt")]
        my_prompt: bool,
    },
    /// `text` holds the options joined with `|`
    ShowChoices {
        text: String,
        #[serde(rename = "myPrompt")]
        my_prompt: bool,
    },
    GameOver {
        text: String,
        scores: Vec<ScoreLine>,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreLine {
    #[serde(rename = "playerName")]
    pub player_name: String,
    pub score: u32,
}
