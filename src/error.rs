//! Error types surfaced by the engine seam.
//!
//! Everything here is contained by the core: the controller logs and keeps
//! the placeholder, it never lets one of these escape to the host.

use thiserror::Error;

/// Failure to load a script resource or to construct an engine session.
#[derive(Debug, Error)]
pub enum EngineInitError {
    #[error("failed to read script {path}")]
    Fetch {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download script {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse script {resource}")]
    Parse {
        resource: String,
        #[source]
        source: ScriptError,
    },

    #[error("script {resource} contains no tokens")]
    EmptyScript { resource: String },

    #[error("engine construction failed: {0}")]
    Engine(String),
}

/// Tokenizer failure, with a 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("line {line}: empty label")]
    EmptyLabel { line: usize },

    #[error("line {line}: tag has no name")]
    EmptyTag { line: usize },

    #[error("line {line}: unterminated tag `[{tag}`")]
    UnterminatedTag { line: usize, tag: String },

    #[error("line {line}: unterminated quoted value for `{key}`")]
    UnterminatedQuote { line: usize, key: String },

    #[error("line {line}: unexpected `{ch}`")]
    UnexpectedChar { line: usize, ch: char },
}
