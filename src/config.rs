//! Game configuration.
//!
//! Settings are plain data: loaded from TOML, validated once, then shared
//! read-only by the dealer and every player. Durations are stored as
//! milliseconds so the file format stays flat and exposed as [`Duration`]
//! through accessors.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Number of items that make up one claim.
pub const SET_SIZE: usize = 3;

/// Errors produced while loading or validating a [`GameConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config at {path}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
    /// A game needs at least one player.
    #[error("at least one player is required")]
    NoPlayers,
    /// More human seats than seats.
    #[error("{humans} human players requested but only {players} seats exist")]
    TooManyHumans {
        /// Requested human players.
        humans: usize,
        /// Total players.
        players: usize,
    },
    /// The board cannot hold a single claim.
    #[error("table_size {0} cannot hold a full set")]
    TableTooSmall(usize),
    /// The card space is empty or overflows.
    #[error("feature_count and feature_size must describe a non-empty deck")]
    EmptyRules,
    /// The requested deck is larger than the card space.
    #[error("deck_size {requested} exceeds the {available} distinct cards")]
    DeckTooLarge {
        /// Requested deck size.
        requested: usize,
        /// Cards available under the rules.
        available: usize,
    },
    /// Rounds need a non-zero countdown.
    #[error("turn_timeout_ms must be greater than zero")]
    ZeroTimeout,
    /// A keymap row does not cover the board.
    #[error("key row for player {player} maps {keys} keys but the table has {slots} slots")]
    Keymap {
        /// Player whose row is malformed.
        player: usize,
        /// Keys in the row.
        keys: usize,
        /// Slots on the table.
        slots: usize,
    },
}

/// Full configuration for one game.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of player actors.
    pub players: usize,
    /// The first `human_players` seats take external input; the rest get a
    /// computer driver.
    pub human_players: usize,
    /// Number of features per card.
    pub feature_count: u32,
    /// Number of values each feature can take.
    pub feature_size: u32,
    /// Restrict the deck to the first N cards. `None` uses the full deck.
    pub deck_size: Option<usize>,
    /// Number of slots on the board.
    pub table_size: usize,
    /// Round countdown before a reshuffle.
    pub turn_timeout_ms: u64,
    /// Remaining time below which the countdown turns urgent.
    pub turn_timeout_warning_ms: u64,
    /// Freeze after a valid claim.
    pub point_freeze_ms: u64,
    /// Freeze after an invalid claim.
    pub penalty_freeze_ms: u64,
    /// Simulated latency of every placement and removal.
    pub table_delay_ms: u64,
    /// Pause between two automated slot requests.
    pub computer_pace_ms: u64,
    /// Log every valid triple on the board after each fill.
    pub hints: bool,
    /// Seed for the dealer and driver random sources.
    pub seed: Option<u64>,
    /// One string per human player; the n-th character claims slot n.
    pub player_keys: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            players: 2,
            human_players: 1,
            feature_count: 4,
            feature_size: 3,
            deck_size: None,
            table_size: 12,
            turn_timeout_ms: 60_000,
            turn_timeout_warning_ms: 5_000,
            point_freeze_ms: 1_000,
            penalty_freeze_ms: 3_000,
            table_delay_ms: 100,
            computer_pace_ms: 10,
            hints: false,
            seed: None,
            player_keys: vec!["qwerasdfzxcv".to_string(), "uiopjkl;m,./".to_string()],
        }
    }
}

impl GameConfig {
    /// Parse and validate a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and a validation
    /// variant for settings that cannot produce a game.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`GameConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check that the settings describe a playable game.
    ///
    /// A penalty freeze shorter than the reward freeze is allowed but logged.
    ///
    /// # Errors
    ///
    /// Returns the first rule that is violated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players == 0 {
            return Err(ConfigError::NoPlayers);
        }
        if self.human_players > self.players {
            return Err(ConfigError::TooManyHumans {
                humans: self.human_players,
                players: self.players,
            });
        }
        if self.table_size < SET_SIZE {
            return Err(ConfigError::TableTooSmall(self.table_size));
        }
        let available = self.full_deck_size().ok_or(ConfigError::EmptyRules)?;
        if let Some(requested) = self.deck_size {
            if requested > available {
                return Err(ConfigError::DeckTooLarge { requested, available });
            }
        }
        if self.turn_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        for (player, row) in self.player_keys.iter().enumerate().take(self.human_players) {
            let keys = row.chars().count();
            if keys != self.table_size {
                return Err(ConfigError::Keymap {
                    player,
                    keys,
                    slots: self.table_size,
                });
            }
        }
        if self.penalty_freeze_ms < self.point_freeze_ms {
            tracing::warn!(
                penalty_ms = self.penalty_freeze_ms,
                point_ms = self.point_freeze_ms,
                "penalty freeze is shorter than the reward freeze"
            );
        }
        Ok(())
    }

    /// Number of distinct cards under the feature rules, if non-empty and
    /// representable.
    pub fn full_deck_size(&self) -> Option<usize> {
        if self.feature_count == 0 || self.feature_size == 0 {
            return None;
        }
        (self.feature_size as usize).checked_pow(self.feature_count)
    }

    /// Number of cards actually dealt.
    pub fn deck_len(&self) -> usize {
        let full = self.full_deck_size().unwrap_or(0);
        self.deck_size.map_or(full, |n| n.min(full))
    }

    /// Whether the given seat takes external input.
    pub const fn is_human(&self, player: usize) -> bool {
        player < self.human_players
    }

    /// Round countdown.
    pub const fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    /// Urgency threshold of the countdown.
    pub const fn turn_timeout_warning(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_warning_ms)
    }

    /// Freeze after a valid claim.
    pub const fn point_freeze(&self) -> Duration {
        Duration::from_millis(self.point_freeze_ms)
    }

    /// Freeze after an invalid claim.
    pub const fn penalty_freeze(&self) -> Duration {
        Duration::from_millis(self.penalty_freeze_ms)
    }

    /// Placement and removal latency.
    pub const fn table_delay(&self) -> Duration {
        Duration::from_millis(self.table_delay_ms)
    }

    /// Pause between automated requests.
    pub const fn computer_pace(&self) -> Duration {
        Duration::from_millis(self.computer_pace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.deck_len(), 81);
        assert!(config.penalty_freeze() > config.point_freeze());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GameConfig::from_toml_str(
            r#"
            players = 4
            human_players = 0
            turn_timeout_ms = 30000
            deck_size = 27
            "#,
        )
        .unwrap();

        assert_eq!(config.players, 4);
        assert_eq!(config.turn_timeout(), Duration::from_secs(30));
        assert_eq!(config.table_size, 12);
        assert_eq!(config.deck_len(), 27);
        assert!(!config.is_human(0));
    }

    #[test]
    fn test_rejects_unplayable_settings() {
        let no_players = GameConfig { players: 0, ..GameConfig::default() };
        assert!(matches!(no_players.validate(), Err(ConfigError::NoPlayers)));

        let humans = GameConfig { human_players: 3, ..GameConfig::default() };
        assert!(matches!(humans.validate(), Err(ConfigError::TooManyHumans { .. })));

        let small = GameConfig { table_size: 2, ..GameConfig::default() };
        assert!(matches!(small.validate(), Err(ConfigError::TableTooSmall(2))));

        let deck = GameConfig { deck_size: Some(100), ..GameConfig::default() };
        assert!(matches!(deck.validate(), Err(ConfigError::DeckTooLarge { .. })));

        let timeout = GameConfig { turn_timeout_ms: 0, ..GameConfig::default() };
        assert!(matches!(timeout.validate(), Err(ConfigError::ZeroTimeout)));

        let rules = GameConfig { feature_size: 0, ..GameConfig::default() };
        assert!(matches!(rules.validate(), Err(ConfigError::EmptyRules)));
    }

    #[test]
    fn test_keymap_must_cover_table() {
        let config = GameConfig {
            player_keys: vec!["qwe".to_string()],
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Keymap { player: 0, keys: 3, slots: 12 })
        ));
    }

    #[test]
    fn test_parse_error() {
        let err = GameConfig::from_toml_str("players = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_penalty_shorter_than_reward_is_allowed() {
        let config = GameConfig {
            point_freeze_ms: 5_000,
            penalty_freeze_ms: 1_000,
            ..GameConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
