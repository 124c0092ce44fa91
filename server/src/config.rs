use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command line / environment configuration for the server binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "plotline-server", author, version, about = "Plotline party story game server")]
pub struct Args {
    /// Address to bind to
    #[arg(long, env = "PLOTLINE_HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// Port for both the WebSocket endpoint and the controller page
    #[arg(short, long, env = "PLOTLINE_PORT", default_value = "8080")]
    pub port: u16,
    /// Players needed before the host may start
    #[arg(long, env = "PLOTLINE_MIN_PLAYERS", default_value = "2")]
    pub min_players: usize,
    /// Connections beyond this are turned away
    #[arg(long, env = "PLOTLINE_MAX_PLAYERS", default_value = "8")]
    pub max_players: usize,
    /// Directory holding prompts.json and dialogue.json
    #[arg(long, env = "PLOTLINE_CONTENT_DIR")]
    pub content_dir: Option<PathBuf>,
    /// Logic tick length in milliseconds
    #[arg(long, env = "PLOTLINE_TICK_MS", default_value = "50")]
    pub tick_ms: u64,
    /// Minimum time a line stays on the host screen
    #[arg(long, env = "PLOTLINE_BASE_TEXT_SECS", default_value = "2.0")]
    pub base_text_secs: f32,
    /// Extra reading time per character
    #[arg(long, env = "PLOTLINE_SECS_PER_CHAR", default_value = "0.05")]
    pub secs_per_char: f32,
    /// Skip players who have not answered after this many seconds
    #[arg(long, env = "PLOTLINE_SUBMISSION_TIMEOUT_SECS")]
    pub submission_timeout_secs: Option<u64>,
    /// Seed for prompt draws and shuffles
    #[arg(long, env = "PLOTLINE_SEED")]
    pub seed: Option<u64>,
}

/// Settings the game core consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub min_players: usize,
    pub max_players: usize,
    pub submission_timeout: Option<Duration>,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            min_players: 2,
            max_players: 8,
            submission_timeout: None,
            seed: None,
        }
    }
}

/// Reading-time settings for the host screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    pub base: Duration,
    pub per_char: Duration,
}

impl Pacing {
    pub fn display_time(&self, text: &str) -> Duration {
        let by_length = self.per_char * text.chars().count() as u32;
        by_length.max(self.base)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            base: Duration::from_secs(2),
            per_char: Duration::from_millis(50),
        }
    }
}

impl Args {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn game_config(&self) -> GameConfig {
        let min_players = self.min_players.max(1);
        GameConfig {
            min_players,
            max_players: self.max_players.max(min_players),
            submission_timeout: self.submission_timeout_secs.map(Duration::from_secs),
            seed: self.seed,
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            base: Duration::from_secs_f32(self.base_text_secs.max(0.0)),
            per_char: Duration::from_secs_f32(self.secs_per_char.max(0.0)),
        }
    }
}
