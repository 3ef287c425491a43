use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipperError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("Tool resolution failed: {0}")]
    ToolResolution(String),

    #[error("Audio stream probe failed: {0}")]
    Probe(String),

    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    #[error("No movie files found in {}", .0.display())]
    NoMovies(PathBuf),

    #[error("No movies found matching '{query}'{}", format_available(.available))]
    NoMatch {
        query: String,
        available: Vec<String>,
    },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("FFmpeg error: {0}")]
    Extraction(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        return String::new();
    }
    let mut hint = String::from("\n\nAvailable movies:");
    for title in available {
        hint.push_str("\n  - ");
        hint.push_str(title);
    }
    hint
}

pub type Result<T> = std::result::Result<T, ClipperError>;
