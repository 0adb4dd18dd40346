//! Error types for kitchen-timer.
//!
//! Only failures of the speech session and of the ambient plumbing (config,
//! scripts, I/O) are errors. A transcript that matches no command is a normal
//! outcome and is reported as a value, never through this type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimerVoiceError {
    // Recognition errors
    #[error("Speech recognition failed: {message}")]
    RecognitionFailure { message: String },

    #[error("Failed to start recognition session: {message}")]
    EngineStart { message: String },

    #[error("Failed to stop recognition session: {message}")]
    EngineStop { message: String },

    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Recorded session scripts
    #[error("Invalid session script: {0}")]
    Script(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TimerVoiceError>;
