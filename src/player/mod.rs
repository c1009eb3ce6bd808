//! Runtime playback controller.
//!
//! Owns the single engine session of one mount. It initializes the session
//! once, forwards logical commands to it, and republishes whatever the engine
//! reports as visible. It never interprets a script and never decides what
//! changed; the engine is the sole author of every `RenderContext`.

pub mod publisher;

use std::sync::{Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell, watch};

use crate::engine::{Engine, RenderAccessors, Session};
use crate::error::EngineInitError;
use crate::input::CommandSink;
use crate::types::{CommandToken, RenderContext};

pub use publisher::{Publisher, UpdateGate};

/// Result of a successful `initialize` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// This call created the session.
    Started,
    /// A session already existed (or another caller created it meanwhile).
    AlreadyActive,
}

/// What happened to one forwarded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Evaluated,
    /// No session yet; the command was dropped, not queued.
    Ignored,
}

struct ActiveSession<S> {
    resource: String,
    session: Mutex<S>,
}

pub struct PlaybackController<E: Engine> {
    engine: E,
    session: OnceCell<ActiveSession<E::Session>>,
    publisher: Publisher,
    gate: StdMutex<Option<UpdateGate>>,
}

impl<E: Engine> PlaybackController<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            session: OnceCell::new(),
            publisher: Publisher::new(),
            gate: StdMutex::new(None),
        }
    }

    /// Load `resource_id` and start the session, unless one already exists.
    ///
    /// Concurrent callers share a single attempt: exactly one engine session
    /// is created and the resource is fetched once. On failure nothing is
    /// stored, the placeholder stays published, and the next call retries
    /// from scratch.
    pub async fn initialize(&self, resource_id: &str) -> Result<InitOutcome, EngineInitError> {
        if let Some(active) = self.session.get() {
            tracing::debug!(resource = %active.resource, "session already active");
            return Ok(InitOutcome::AlreadyActive);
        }

        let mut started = false;
        let started_here = &mut started;
        self.session
            .get_or_try_init(|| async move {
                let active = self.start_session(resource_id).await?;
                *started_here = true;
                Ok::<_, EngineInitError>(active)
            })
            .await?;

        Ok(if started {
            InitOutcome::Started
        } else {
            InitOutcome::AlreadyActive
        })
    }

    async fn start_session(
        &self,
        resource_id: &str,
    ) -> Result<ActiveSession<E::Session>, EngineInitError> {
        tracing::info!(resource = resource_id, "initializing engine session");
        let gate = self.publisher.gate();

        let session = match self.engine.init(resource_id, gate.sink()).await {
            Ok(session) => session,
            Err(e) => {
                gate.revoke();
                tracing::warn!(resource = resource_id, error = %e, "engine initialization failed");
                return Err(e);
            }
        };

        gate.arm();
        if let Some(accessors) = session.accessors() {
            self.publisher.publish(pull_context(accessors));
        }
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(gate);

        tracing::info!(resource = resource_id, "engine session ready");
        Ok(ActiveSession {
            resource: resource_id.to_string(),
            session: Mutex::new(session),
        })
    }

    /// Forward one command to the active session.
    ///
    /// Evaluation and the rebuild that follows it run under the session lock,
    /// so overlapping calls are serviced one after another and a reader never
    /// observes a half-applied command.
    pub async fn handle_input(&self, token: CommandToken) -> InputOutcome {
        let Some(active) = self.session.get() else {
            tracing::debug!(%token, "no active session, input dropped");
            return InputOutcome::Ignored;
        };

        let mut session = active.session.lock().await;
        tracing::debug!(%token, "evaluating command");
        session.evaluate(&token);
        if let Some(accessors) = session.accessors() {
            self.publisher.publish(pull_context(accessors));
        }
        InputOutcome::Evaluated
    }

    pub fn is_loaded(&self) -> bool {
        self.session.initialized()
    }

    /// The resource the active session was loaded from.
    pub fn resource(&self) -> Option<&str> {
        self.session.get().map(|active| active.resource.as_str())
    }

    pub fn render_context(&self) -> RenderContext {
        self.publisher.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderContext> {
        self.publisher.subscribe()
    }

    pub fn publish_count(&self) -> u64 {
        self.publisher.publish_count()
    }
}

impl<E: Engine> Drop for PlaybackController<E> {
    fn drop(&mut self) {
        if let Some(gate) = self.gate.lock().unwrap_or_else(PoisonError::into_inner).take() {
            gate.revoke();
        }
        if let Some(resource) = self.resource() {
            tracing::info!(resource, "engine session torn down");
        }
    }
}

#[async_trait]
impl<E: Engine> CommandSink for PlaybackController<E> {
    async fn handle_input(&self, token: CommandToken) -> InputOutcome {
        PlaybackController::handle_input(self, token).await
    }
}

/// Rebuild a full context from pull accessors.
///
/// The line count is read once; lines are then read in order.
fn pull_context(accessors: &dyn RenderAccessors) -> RenderContext {
    let len = accessors.text_line_count();
    let text = (0..len).map(|i| accessors.text_line(i)).collect();
    let scene = accessors.image(0).into_iter().collect();
    RenderContext { text, scene }
}
