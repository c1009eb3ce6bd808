//! Scripted engine used by the integration scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ks_player::engine::{Engine, RenderAccessors, RenderSink, Session};
use ks_player::error::EngineInitError;
use ks_player::types::{CommandToken, RenderContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Push,
    Pull,
}

#[derive(Debug, Default)]
pub struct Counters {
    pub fetches: AtomicUsize,
    pub inits: AtomicUsize,
    pub evaluated: Mutex<Vec<String>>,
    failures_left: AtomicUsize,
}

impl Counters {
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.evaluated.lock().unwrap().clone()
    }
}

/// Serves `lorerei.ks`: two lines over `bg1.png`, one more line per `Enter`.
#[derive(Clone)]
pub struct ScriptedEngine {
    shape: Shape,
    counters: Arc<Counters>,
}

impl ScriptedEngine {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            counters: Arc::default(),
        }
    }

    /// The next `n` initializations fail at fetch time.
    pub fn failing_first(self, n: usize) -> Self {
        self.counters.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    type Session = ScriptedSession;

    async fn init(&self, resource_id: &str, sink: RenderSink) -> Result<ScriptedSession, EngineInitError> {
        self.counters.fetches.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to pile up on the same attempt.
        tokio::task::yield_now().await;

        let fail = self
            .counters
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail || resource_id != "lorerei.ks" {
            return Err(EngineInitError::Fetch {
                path: resource_id.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            });
        }

        self.counters.inits.fetch_add(1, Ordering::SeqCst);
        let session = ScriptedSession {
            shape: self.shape,
            counters: self.counters.clone(),
            text: vec!["line1".into(), "line2".into()],
            scene: vec!["bg1.png".into()],
            sink,
        };
        session.push();
        Ok(session)
    }
}

pub struct ScriptedSession {
    shape: Shape,
    counters: Arc<Counters>,
    text: Vec<String>,
    scene: Vec<String>,
    sink: RenderSink,
}

impl ScriptedSession {
    fn push(&self) {
        if self.shape == Shape::Push {
            self.sink
                .push(RenderContext::new(self.text.clone(), self.scene.clone()));
        }
    }
}

impl Session for ScriptedSession {
    fn evaluate(&mut self, token: &CommandToken) {
        self.counters
            .evaluated
            .lock()
            .unwrap()
            .push(token.as_str().to_string());
        if token.as_str() == "Enter" {
            self.text.push(format!("line{}", self.text.len() + 1));
            self.push();
        }
    }

    fn accessors(&self) -> Option<&dyn RenderAccessors> {
        match self.shape {
            Shape::Pull => Some(self),
            Shape::Push => None,
        }
    }
}

impl RenderAccessors for ScriptedSession {
    fn text_line_count(&self) -> usize {
        self.text.len()
    }

    fn text_line(&self, index: usize) -> String {
        self.text[index].clone()
    }

    fn image(&self, index: usize) -> Option<String> {
        self.scene.get(index).cloned()
    }
}
