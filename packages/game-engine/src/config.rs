use std::env;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_RETURN_TO_LOBBY_DELAY_SECONDS: u64 = 60;
pub const DEFAULT_DISCONNECT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_PLAYERS_LEFT_TIMEOUT_SECONDS: u64 = 5;

/// Timing and feature switches for live game sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub return_to_lobby_delay: Duration,
    pub disconnect_timeout: Duration,
    pub players_left_timeout: Duration,
    pub enable_debug_commands: bool,
    /// Keep live games in process memory between commands. When off, every
    /// command rebuilds its game from the snapshot store and drops it after.
    pub cache_games: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            return_to_lobby_delay: Duration::from_secs(DEFAULT_RETURN_TO_LOBBY_DELAY_SECONDS),
            disconnect_timeout: Duration::from_secs(DEFAULT_DISCONNECT_TIMEOUT_SECONDS),
            players_left_timeout: Duration::from_secs(DEFAULT_PLAYERS_LEFT_TIMEOUT_SECONDS),
            enable_debug_commands: false,
            cache_games: true,
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Self {
        GameConfig {
            return_to_lobby_delay: parse_seconds(
                "RETURN_TO_LOBBY_DELAY_SECONDS",
                env::var("RETURN_TO_LOBBY_DELAY_SECONDS").ok().as_deref(),
                DEFAULT_RETURN_TO_LOBBY_DELAY_SECONDS,
            ),
            disconnect_timeout: parse_seconds(
                "DISCONNECT_TIMEOUT_SECONDS",
                env::var("DISCONNECT_TIMEOUT_SECONDS").ok().as_deref(),
                DEFAULT_DISCONNECT_TIMEOUT_SECONDS,
            ),
            players_left_timeout: parse_seconds(
                "PLAYERS_LEFT_TIMEOUT_SECONDS",
                env::var("PLAYERS_LEFT_TIMEOUT_SECONDS").ok().as_deref(),
                DEFAULT_PLAYERS_LEFT_TIMEOUT_SECONDS,
            ),
            enable_debug_commands: parse_flag(env::var("ENABLE_DEBUG_COMMANDS").ok().as_deref()),
            cache_games: true,
        }
    }

    /// Settings for hosts where each invocation may land on a different
    /// process, so nothing but durable storage can be trusted.
    pub fn stateless(self) -> Self {
        GameConfig {
            cache_games: false,
            ..self
        }
    }
}

fn parse_seconds(name: &str, value: Option<&str>, default: u64) -> Duration {
    match value {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(seconds) => Duration::from_secs(seconds),
            Err(_) => {
                warn!(
                    "Ignoring invalid value {:?} for {}, using {} seconds",
                    raw, name, default
                );
                Duration::from_secs(default)
            }
        },
        None => Duration::from_secs(default),
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}
