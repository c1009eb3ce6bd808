//! Input processing for the player.
//!
//! This module owns the device-to-command mapping so the controller can stay
//! agnostic about terminals and `crossterm` events. Key releases become a
//! token carrying the key's identifier verbatim; a pointer press anywhere on
//! the surface becomes the fixed pointer token. Which keys mean anything is
//! left to the engine.

pub mod surface;

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, MouseEventKind};

use crate::player::InputOutcome;
use crate::types::CommandToken;

pub use surface::{InputSurface, KeyTrigger, TerminalInput};

/// Receiver of logical commands.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn handle_input(&self, token: CommandToken) -> InputOutcome;
}

struct Binding {
    sink: Arc<dyn CommandSink>,
    trigger: KeyTrigger,
}

/// Scoped input binding for one mounted session.
///
/// `bind` attaches the keyboard and pointer listeners; `unbind` (or dropping
/// the dispatcher) detaches them. Binding twice is a no-op, so there is never
/// more than one active listener pair.
pub struct InputDispatcher<S: InputSurface> {
    surface: S,
    binding: Option<Binding>,
}

impl<S: InputSurface> InputDispatcher<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            binding: None,
        }
    }

    pub fn bind(&mut self, sink: Arc<dyn CommandSink>) -> io::Result<()> {
        if self.binding.is_some() {
            tracing::debug!("input already bound");
            return Ok(());
        }
        let trigger = self.surface.attach()?;
        tracing::info!(?trigger, "input bound");
        self.binding = Some(Binding { sink, trigger });
        Ok(())
    }

    pub fn unbind(&mut self) {
        if self.binding.take().is_none() {
            return;
        }
        match self.surface.detach() {
            Ok(()) => tracing::info!("input unbound"),
            Err(e) => tracing::warn!(error = %e, "failed to detach input listeners"),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Translate a raw event, or `None` if it carries no command or nothing
    /// is bound.
    pub fn translate(&self, event: &Event) -> Option<CommandToken> {
        let binding = self.binding.as_ref()?;
        translate(event, binding.trigger)
    }

    /// Translate and forward a raw event to the bound sink.
    pub async fn dispatch(&self, event: &Event) -> Option<InputOutcome> {
        let binding = self.binding.as_ref()?;
        let token = translate(event, binding.trigger)?;
        Some(binding.sink.handle_input(token).await)
    }
}

impl<S: InputSurface> Drop for InputDispatcher<S> {
    fn drop(&mut self) {
        self.unbind();
    }
}

fn translate(event: &Event, trigger: KeyTrigger) -> Option<CommandToken> {
    match event {
        Event::Key(key) if trigger.accepts(key.kind) => Some(CommandToken::Key(key_name(key))),
        // Mouse capture keeps the terminal from starting a selection, so the
        // press reaches us instead of the host's default handling.
        Event::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
            Some(CommandToken::PointerAdvance)
        }
        _ => None,
    }
}

impl KeyTrigger {
    fn accepts(self, kind: KeyEventKind) -> bool {
        match self {
            KeyTrigger::Release => kind == KeyEventKind::Release,
            KeyTrigger::Press => kind == KeyEventKind::Press,
        }
    }
}

/// Key identifier in DOM `KeyboardEvent.key` form.
pub fn key_name(key: &KeyEvent) -> String {
    let name = match key.code {
        KeyCode::Char(c) => return c.to_string(),
        KeyCode::F(n) => return format!("F{n}"),
        KeyCode::Enter => "Enter",
        KeyCode::Esc => "Escape",
        KeyCode::Backspace => "Backspace",
        KeyCode::Tab | KeyCode::BackTab => "Tab",
        KeyCode::Left => "ArrowLeft",
        KeyCode::Right => "ArrowRight",
        KeyCode::Up => "ArrowUp",
        KeyCode::Down => "ArrowDown",
        KeyCode::Home => "Home",
        KeyCode::End => "End",
        KeyCode::PageUp => "PageUp",
        KeyCode::PageDown => "PageDown",
        KeyCode::Delete => "Delete",
        KeyCode::Insert => "Insert",
        KeyCode::CapsLock => "CapsLock",
        KeyCode::ScrollLock => "ScrollLock",
        KeyCode::NumLock => "NumLock",
        KeyCode::PrintScreen => "PrintScreen",
        KeyCode::Pause => "Pause",
        KeyCode::Menu => "ContextMenu",
        _ => "Unidentified",
    };
    name.to_string()
}
