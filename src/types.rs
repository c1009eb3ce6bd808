//! Shared boundary types for the KS player.
//!
//! This module defines the two data contracts that cross the core:
//! - Engine → Presentation: `RenderContext`, what must currently be visible
//! - Input → Engine: `CommandToken`, one logical user intent

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shown in every field of the placeholder context.
pub const NOT_LOADED: &str = "not loaded";

/// Identifier of the pointer token, as the engine sees it.
pub const POINTER_ADVANCE: &str = "MouseClick";

// ---------------------------------------------------------------------------
// Engine → Presentation boundary
// ---------------------------------------------------------------------------

/// Snapshot of what the presentation surface must show.
///
/// `text` is in reading order. `scene[0]` is the active background by
/// convention. A context is always replaced as a whole; nothing outside the
/// engine edits one field of a published context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderContext {
    pub text: Vec<String>,
    pub scene: Vec<String>,
}

impl RenderContext {
    pub fn new(text: Vec<String>, scene: Vec<String>) -> Self {
        Self { text, scene }
    }

    /// The context published before any session has loaded.
    pub fn placeholder() -> Self {
        Self {
            text: vec![NOT_LOADED.to_string()],
            scene: vec![NOT_LOADED.to_string()],
        }
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }

    /// The active background, if the engine reported one.
    pub fn background(&self) -> Option<&str> {
        self.scene.first().map(String::as_str)
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::placeholder()
    }
}

// ---------------------------------------------------------------------------
// Input → Engine boundary
// ---------------------------------------------------------------------------

/// One logical user intent, independent of the device that produced it.
///
/// The core forwards tokens opaquely; only the engine decides what a key
/// means.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandToken {
    /// A released key, identified the way a DOM `KeyboardEvent.key` would be.
    Key(String),
    /// A pointer press anywhere on the presentation surface.
    PointerAdvance,
}

impl CommandToken {
    pub fn key(name: impl Into<String>) -> Self {
        CommandToken::Key(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            CommandToken::Key(name) => name,
            CommandToken::PointerAdvance => POINTER_ADVANCE,
        }
    }
}

impl fmt::Display for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_fills_both_fields() {
        let ctx = RenderContext::placeholder();
        assert_eq!(ctx.text, vec!["not loaded"]);
        assert_eq!(ctx.scene, vec!["not loaded"]);
        assert!(ctx.is_placeholder());
        assert_eq!(RenderContext::default(), ctx);
    }

    #[test]
    fn background_is_first_scene_entry() {
        let ctx = RenderContext::new(vec![], vec!["bg1.png".into(), "chara.png".into()]);
        assert_eq!(ctx.background(), Some("bg1.png"));
        assert_eq!(RenderContext::new(vec![], vec![]).background(), None);
    }

    #[test]
    fn pointer_token_has_fixed_identifier() {
        assert_eq!(CommandToken::PointerAdvance.as_str(), "MouseClick");
        assert_eq!(CommandToken::key("Enter").to_string(), "Enter");
    }

    #[test]
    fn context_serializes_with_field_names() {
        let ctx = RenderContext::new(vec!["line1".into()], vec!["bg1.png".into()]);
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(json, r#"{"text":["line1"],"scene":["bg1.png"]}"#);
    }
}
