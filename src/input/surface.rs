//! Device listeners behind the dispatcher.

use std::io;

use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{execute, terminal};

/// Which key event kind produces a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTrigger {
    Release,
    /// For terminals that never report releases.
    Press,
}

/// A source of keyboard and pointer events that can be attached and detached.
pub trait InputSurface {
    /// Register the keyboard and pointer listeners.
    fn attach(&mut self) -> io::Result<KeyTrigger>;

    /// Remove what `attach` registered.
    fn detach(&mut self) -> io::Result<()>;
}

/// The controlling terminal.
///
/// Attaching enables mouse capture, which also keeps the terminal from
/// starting a text selection on press, and asks for key release reporting
/// where the terminal supports it.
#[derive(Debug, Default)]
pub struct TerminalInput {
    enhanced: bool,
}

impl TerminalInput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputSurface for TerminalInput {
    fn attach(&mut self) -> io::Result<KeyTrigger> {
        let mut stdout = io::stdout();
        execute!(stdout, EnableMouseCapture)?;

        self.enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            Ok(KeyTrigger::Release)
        } else {
            Ok(KeyTrigger::Press)
        }
    }

    fn detach(&mut self) -> io::Result<()> {
        let mut stdout = io::stdout();
        if std::mem::take(&mut self.enhanced) {
            execute!(stdout, PopKeyboardEnhancementFlags)?;
        }
        execute!(stdout, DisableMouseCapture)
    }
}
