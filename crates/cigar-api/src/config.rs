//! Server configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use cigar_intro::application::script::{default_script, load_script};
use cigar_intro::domain::reveal::RevealConfig;
use cigar_intro::domain::scene::SceneScript;
use cigar_intro::domain::sequencer::SequencerConfig;

use crate::error::AppError;
use crate::state::DEFAULT_SESSION_IDLE_TTL;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// JSON file holding the completion flag.
    pub state_file: PathBuf,
    /// Optional YAML scene script replacing the bundled story.
    pub scene_script: Option<PathBuf>,
    /// Sequencer timing.
    pub sequencer: SequencerConfig,
    /// Idle time after which an abandoned session is unmounted.
    pub session_idle_ttl: Duration,
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let state_file = lookup("CIGAR_STATE_FILE")
            .map_or_else(|| PathBuf::from("data/intro-state.json"), PathBuf::from);
        let scene_script = lookup("CIGAR_SCENE_SCRIPT").map(PathBuf::from);

        let defaults = SequencerConfig::default();
        let millis = |key: &str, default: TimeDelta| -> Result<TimeDelta, AppError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw
                    .parse::<u32>()
                    .map(|ms| TimeDelta::milliseconds(i64::from(ms)))
                    .map_err(|e| AppError::Config(format!("{key} must be milliseconds: {e}"))),
            }
        };
        let sequencer = SequencerConfig {
            reveal: RevealConfig {
                char_interval: millis("INTRO_CHAR_INTERVAL_MS", defaults.reveal.char_interval)?,
                line_pause: millis("INTRO_LINE_PAUSE_MS", defaults.reveal.line_pause)?,
            },
            auto_advance_delay: millis("INTRO_AUTO_ADVANCE_MS", defaults.auto_advance_delay)?,
            exit_delay: millis("INTRO_EXIT_DELAY_MS", defaults.exit_delay)?,
        };

        let session_idle_ttl = match lookup("INTRO_SESSION_IDLE_SECS") {
            None => DEFAULT_SESSION_IDLE_TTL,
            Some(raw) => match raw.parse::<u32>() {
                Ok(0) => {
                    return Err(AppError::Config(
                        "INTRO_SESSION_IDLE_SECS must be at least 1".to_string(),
                    ));
                }
                Ok(secs) => Duration::from_secs(u64::from(secs)),
                Err(e) => {
                    return Err(AppError::Config(format!(
                        "INTRO_SESSION_IDLE_SECS must be seconds: {e}"
                    )));
                }
            },
        };

        Ok(Self {
            host,
            port,
            state_file,
            scene_script,
            sequencer,
            session_idle_ttl,
        })
    }

    /// Loads the configured scene script, or the bundled one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Script` if the configured file is unreadable or
    /// invalid.
    pub fn load_script(&self) -> Result<SceneScript, AppError> {
        match &self.scene_script {
            Some(path) => Ok(load_script(path)?),
            None => Ok(default_script()),
        }
    }
}
