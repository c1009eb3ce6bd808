//! The narrative engine seam.
//!
//! The player never interprets a script. It talks to an engine through the
//! traits below: an async initializer, a command entry point, and one of two
//! ways of learning what is visible (push through a `RenderSink`, or pull
//! through `RenderAccessors`).
//!
//! `ks` is the built-in engine; any other implementation plugs in the same way.

pub mod ks;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineInitError;
use crate::types::{CommandToken, RenderContext};

/// Creates sessions bound to one script resource each.
#[async_trait]
pub trait Engine: Send + Sync {
    type Session: Session;

    /// Load `resource_id` and construct a live session.
    ///
    /// Push engines keep `sink` and call it whenever the visible state
    /// changes, including once right after loading. Pull engines may ignore
    /// it.
    async fn init(
        &self,
        resource_id: &str,
        sink: RenderSink,
    ) -> Result<Self::Session, EngineInitError>;
}

/// One live engine instance.
pub trait Session: Send {
    /// Evaluate one logical command. Unknown tokens are the engine's business.
    fn evaluate(&mut self, token: &CommandToken);

    /// Pull-mode accessors, or `None` for a session that pushes its updates.
    fn accessors(&self) -> Option<&dyn RenderAccessors> {
        None
    }
}

/// Pull-mode view of what is currently visible.
pub trait RenderAccessors {
    fn text_line_count(&self) -> usize;

    fn text_line(&self, index: usize) -> String;

    fn image(&self, index: usize) -> Option<String>;
}

/// Render-update callback handed to the engine at init.
#[derive(Clone)]
pub struct RenderSink {
    callback: Arc<dyn Fn(RenderContext) + Send + Sync>,
}

impl RenderSink {
    pub fn new(callback: impl Fn(RenderContext) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// A sink that discards everything.
    pub fn detached() -> Self {
        Self::new(|_| {})
    }

    pub fn push(&self, ctx: RenderContext) {
        (self.callback)(ctx)
    }
}

impl fmt::Debug for RenderSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSink").finish_non_exhaustive()
    }
}
