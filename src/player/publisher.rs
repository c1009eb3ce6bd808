//! Wholesale publication of render contexts.
//!
//! Both propagation modes end in `Publisher::publish`. A context is replaced
//! as a single value, so a reader holding one snapshot can never see text
//! from one update next to a scene from another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::engine::RenderSink;
use crate::types::RenderContext;

#[derive(Clone)]
pub struct Publisher {
    inner: Arc<Inner>,
}

struct Inner {
    tx: watch::Sender<RenderContext>,
    published: AtomicU64,
}

impl Publisher {
    /// A publisher holding the placeholder context.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RenderContext::placeholder());
        Self {
            inner: Arc::new(Inner {
                tx,
                published: AtomicU64::new(0),
            }),
        }
    }

    pub fn publish(&self, ctx: RenderContext) {
        tracing::trace!(lines = ctx.text.len(), scene = ?ctx.background(), "publishing render context");
        self.inner.tx.send_replace(ctx);
        self.inner.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn current(&self) -> RenderContext {
        self.inner.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderContext> {
        self.inner.tx.subscribe()
    }

    /// Number of contexts published since creation. The placeholder does not
    /// count.
    pub fn publish_count(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    /// A fresh gate for one initialization attempt.
    pub fn gate(&self) -> UpdateGate {
        UpdateGate {
            publisher: self.clone(),
            state: Arc::new(Mutex::new(GateState::Pending(None))),
        }
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
enum GateState {
    /// Init still running; keeps only the latest pushed context.
    Pending(Option<RenderContext>),
    Armed,
    Revoked,
}

/// Holds back pushed updates until the attempt that produced them succeeds.
///
/// A failed attempt revokes its gate, so anything the engine pushed before
/// failing is discarded and the placeholder stays in place.
#[derive(Clone)]
pub struct UpdateGate {
    publisher: Publisher,
    state: Arc<Mutex<GateState>>,
}

impl UpdateGate {
    pub fn sink(&self) -> RenderSink {
        let gate = self.clone();
        RenderSink::new(move |ctx| gate.offer(ctx))
    }

    fn offer(&self, ctx: RenderContext) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            GateState::Pending(pending) => *pending = Some(ctx),
            GateState::Armed => self.publisher.publish(ctx),
            GateState::Revoked => tracing::debug!("render update after teardown dropped"),
        }
    }

    /// Start forwarding, flushing whatever arrived during init.
    pub fn arm(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let GateState::Pending(pending) = &mut *state {
            let pending = pending.take();
            *state = GateState::Armed;
            if let Some(ctx) = pending {
                self.publisher.publish(ctx);
            }
        }
    }

    pub fn revoke(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = GateState::Revoked;
    }
}
