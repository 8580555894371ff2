//! Configuration management for the election engine
//!
//! Loads tally and logging settings from environment variables with validation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Literal phrase an administrator must type to wipe all live votes
pub const RESET_CONFIRMATION_PHRASE: &str = "RESET ALL VOTES";

/// Rows requested per tally page
const DEFAULT_TALLY_PAGE_SIZE: usize = 1000;

/// Upper bound on pages read by one tally (10 million rows at the default size)
const DEFAULT_TALLY_MAX_PAGES: usize = 10_000;

/// Wall-clock budget for one tally in seconds
const DEFAULT_TALLY_TIMEOUT_SECONDS: u64 = 60;

/// Tally and reset settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Rows fetched per page when reading the vote set
    pub tally_page_size: usize,

    /// Maximum pages one tally may read before reporting it incomplete
    pub tally_max_pages: usize,

    /// Time budget for a whole tally in seconds
    pub tally_timeout_seconds: u64,

    /// Confirmation phrase required by a vote reset
    pub reset_phrase: String,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            tally_page_size: DEFAULT_TALLY_PAGE_SIZE,
            tally_max_pages: DEFAULT_TALLY_MAX_PAGES,
            tally_timeout_seconds: DEFAULT_TALLY_TIMEOUT_SECONDS,
            reset_phrase: RESET_CONFIRMATION_PHRASE.to_string(),
        }
    }
}

impl ElectionConfig {
    /// Load election configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let tally_page_size = std::env::var("ELECTION_TALLY_PAGE_SIZE")
            .unwrap_or_else(|_| DEFAULT_TALLY_PAGE_SIZE.to_string())
            .parse()
            .map_err(|_| Error::internal("Invalid ELECTION_TALLY_PAGE_SIZE"))?;

        let tally_max_pages = std::env::var("ELECTION_TALLY_MAX_PAGES")
            .unwrap_or_else(|_| DEFAULT_TALLY_MAX_PAGES.to_string())
            .parse()
            .map_err(|_| Error::internal("Invalid ELECTION_TALLY_MAX_PAGES"))?;

        let tally_timeout_seconds = std::env::var("ELECTION_TALLY_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| DEFAULT_TALLY_TIMEOUT_SECONDS.to_string())
            .parse()
            .map_err(|_| Error::internal("Invalid ELECTION_TALLY_TIMEOUT_SECONDS"))?;

        let config = Self {
            tally_page_size,
            tally_max_pages,
            tally_timeout_seconds,
            reset_phrase: RESET_CONFIRMATION_PHRASE.to_string(),
        };
        config.validate()?;

        Ok(config)
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        Self {
            tally_page_size: 1000,
            tally_max_pages: 100,
            tally_timeout_seconds: 5,
            reset_phrase: RESET_CONFIRMATION_PHRASE.to_string(),
        }
    }

    /// Reject settings that would make a tally impossible
    pub fn validate(&self) -> Result<()> {
        if self.tally_page_size == 0 {
            return Err(Error::internal("ELECTION_TALLY_PAGE_SIZE must be at least 1"));
        }
        if self.tally_max_pages == 0 {
            return Err(Error::internal("ELECTION_TALLY_MAX_PAGES must be at least 1"));
        }
        if self.tally_timeout_seconds == 0 {
            return Err(Error::internal(
                "ELECTION_TALLY_TIMEOUT_SECONDS must be at least 1",
            ));
        }
        if self.reset_phrase.trim().is_empty() {
            return Err(Error::internal("Reset phrase must not be blank"));
        }
        Ok(())
    }

    /// Tally time budget as a `Duration`
    pub fn tally_timeout(&self) -> Duration {
        Duration::from_secs(self.tally_timeout_seconds)
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub election: ElectionConfig,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
const LOG_FORMATS: [&str; 3] = ["json", "pretty", "compact"];

impl LoggingConfig {
    /// Load logging configuration from `LOG_LEVEL` and `LOG_FORMAT`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            level: std::env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "info".to_string())
                .to_lowercase(),
            format: std::env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "json".to_string())
                .to_lowercase(),
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.level.as_str()) {
            return Err(Error::internal(format!("Invalid LOG_LEVEL: {}", self.level)));
        }
        if !LOG_FORMATS.contains(&self.format.as_str()) {
            return Err(Error::internal(format!("Invalid LOG_FORMAT: {}", self.format)));
        }
        Ok(())
    }

    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub fn filter_directive(&self) -> String {
        format!("student_vote={}", self.level)
    }
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        let election = ElectionConfig::from_env()?;
        let logging = LoggingConfig::from_env()?;

        Ok(Self { election, logging })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Result<Self> {
        let election = ElectionConfig::for_testing();
        election.validate()?;

        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        };

        Ok(Self { election, logging })
    }
}
