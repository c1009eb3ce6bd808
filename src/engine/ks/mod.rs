//! Built-in KS engine.
//!
//! Loads a script from disk or over HTTP, tokenizes it, and plays it one wait
//! at a time. It can present itself as either engine shape: pushing a fresh
//! context through the sink after every visible change, or exposing pull
//! accessors and letting the controller rebuild.

pub mod interpreter;
pub mod parser;
pub mod source;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::{Engine, RenderAccessors, RenderSink, Session};
use crate::error::EngineInitError;
use crate::types::CommandToken;

use interpreter::Interpreter;
use source::ScriptLocation;

/// How a session reports what is visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Propagation {
    #[default]
    Push,
    Pull,
}

impl std::str::FromStr for Propagation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "push" => Ok(Propagation::Push),
            "pull" => Ok(Propagation::Pull),
            other => Err(format!("unknown propagation mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KsEngine {
    client: reqwest::Client,
    base_url: Option<String>,
    propagation: Propagation,
}

impl KsEngine {
    pub fn new(propagation: Propagation) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
            propagation,
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Read and tokenize a script without starting a session.
    pub async fn load(&self, resource_id: &str) -> Result<Vec<parser::Token>, EngineInitError> {
        let location = ScriptLocation::resolve(resource_id, self.base_url.as_deref());
        let body = location.fetch(&self.client).await?;
        let tokens = parser::parse_script(&body).map_err(|source| EngineInitError::Parse {
            resource: location.to_string(),
            source,
        })?;
        if tokens.is_empty() {
            return Err(EngineInitError::EmptyScript {
                resource: location.to_string(),
            });
        }
        tracing::debug!(resource = %location, tokens = tokens.len(), "script loaded");
        Ok(tokens)
    }
}

#[async_trait]
impl Engine for KsEngine {
    type Session = KsSession;

    async fn init(&self, resource_id: &str, sink: RenderSink) -> Result<KsSession, EngineInitError> {
        let tokens = self.load(resource_id).await?;
        let mut interpreter = Interpreter::new(tokens);
        interpreter.run();

        let session = KsSession {
            interpreter,
            propagation: self.propagation,
            sink,
        };
        if session.propagation == Propagation::Push {
            session.sink.push(session.interpreter.render_context());
        }
        Ok(session)
    }
}

#[derive(Debug)]
pub struct KsSession {
    interpreter: Interpreter,
    propagation: Propagation,
    sink: RenderSink,
}

impl KsSession {
    pub fn is_finished(&self) -> bool {
        self.interpreter.is_finished()
    }
}

impl Session for KsSession {
    fn evaluate(&mut self, token: &CommandToken) {
        if !interpreter::is_advance(token.as_str()) {
            tracing::trace!(%token, "token has no meaning here");
            return;
        }
        if !self.interpreter.advance() {
            tracing::debug!("script finished");
            return;
        }
        if self.propagation == Propagation::Push {
            self.sink.push(self.interpreter.render_context());
        }
    }

    fn accessors(&self) -> Option<&dyn RenderAccessors> {
        match self.propagation {
            Propagation::Pull => Some(&self.interpreter),
            Propagation::Push => None,
        }
    }
}
