use std::ffi::OsString;
use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};

use crate::engine::ks::Propagation;

const APP_NAME: &str = "ks-player";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub key_bindings: KeyBindings,
    /// Shape the built-in engine presents to the controller.
    #[serde(default)]
    pub propagation: Propagation,
    /// Prefix for relative script ids; when unset they are local paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Host-level bindings. These never reach the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_reload")]
    pub reload: String,
}

fn default_quit() -> String { "Esc".into() }
fn default_reload() -> String { "F5".into() }

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            quit: default_quit(),
            reload: default_reload(),
        }
    }
}

impl PlayerConfig {
    pub fn load() -> Self {
        let mut config = Self::load_file();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    fn load_file() -> Self {
        let path = config_file();
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable player config, using defaults");
                return Self::default();
            }
        };
        Self::from_json(&json).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "invalid player config, using defaults");
            Self::default()
        })
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Environment overrides:
    /// - `KS_PLAYER_BASE_URL` - prefix for relative script ids
    /// - `KS_PLAYER_PROPAGATION` - `push` or `pull`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup("KS_PLAYER_BASE_URL").filter(|v| !v.is_empty()) {
            self.base_url = Some(base_url);
        }
        if let Some(raw) = lookup("KS_PLAYER_PROPAGATION") {
            match raw.parse() {
                Ok(propagation) => self.propagation = propagation,
                Err(e) => tracing::warn!(error = %e, "ignoring KS_PLAYER_PROPAGATION"),
            }
        }
    }
}

/// `$XDG_CONFIG_HOME/ks-player/player.json`, falling back to `~/.config`.
pub fn config_file() -> PathBuf {
    app_dir("XDG_CONFIG_HOME", ".config", |k| std::env::var_os(k)).join("player.json")
}

/// `$XDG_CACHE_HOME/ks-player/logs`, falling back to `~/.cache`.
pub fn log_dir() -> PathBuf {
    app_dir("XDG_CACHE_HOME", ".cache", |k| std::env::var_os(k)).join("logs")
}

/// Per-user directory for this program under an XDG base directory.
fn app_dir(xdg_var: &str, home_fallback: &str, lookup: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    let base = lookup(xdg_var)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| lookup("HOME").map(|home| PathBuf::from(home).join(home_fallback)))
        .unwrap_or_else(std::env::temp_dir);
    base.join(APP_NAME)
}

/// Check whether a crossterm `KeyEvent` matches a binding string from config.
pub fn matches_binding(binding: &str, event: &KeyEvent) -> bool {
    if let Some(rest) = binding.strip_prefix("Ctrl-") {
        if !event.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }
        return single_char(rest).is_some_and(|c| event.code == KeyCode::Char(c));
    }

    // Plain bindings never fire while Ctrl or Alt is held.
    if event.modifiers.contains(KeyModifiers::CONTROL)
        || event.modifiers.contains(KeyModifiers::ALT)
    {
        return false;
    }

    match binding {
        "Enter" => event.code == KeyCode::Enter,
        "Esc" => event.code == KeyCode::Esc,
        "Space" => event.code == KeyCode::Char(' '),
        "Tab" => event.code == KeyCode::Tab,
        "Backspace" => event.code == KeyCode::Backspace,
        s => {
            if let Some(n) = s.strip_prefix('F').and_then(|rest| rest.parse::<u8>().ok()) {
                return event.code == KeyCode::F(n);
            }
            single_char(s).is_some_and(|c| event.code == KeyCode::Char(c))
        }
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config = PlayerConfig::from_json(r#"{"propagation":"pull"}"#).unwrap();
        assert_eq!(config.propagation, Propagation::Pull);
        assert_eq!(config.key_bindings.quit, "Esc");
        assert_eq!(config.key_bindings.reload, "F5");
        assert_eq!(config.base_url, None);

        let config = PlayerConfig::from_json(r#"{"key_bindings":{"quit":"q"}}"#).unwrap();
        assert_eq!(config.key_bindings.quit, "q");
        assert_eq!(config.key_bindings.reload, "F5");
        assert_eq!(config.propagation, Propagation::Push);
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("KS_PLAYER_BASE_URL", "http://localhost:5173"),
            ("KS_PLAYER_PROPAGATION", "pull"),
        ]
        .into_iter()
        .collect();
        let mut config = PlayerConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:5173"));
        assert_eq!(config.propagation, Propagation::Pull);
    }

    #[test]
    fn bad_propagation_override_is_ignored() {
        let mut config = PlayerConfig::default();
        config.apply_overrides(|k| (k == "KS_PLAYER_PROPAGATION").then(|| "sideways".to_string()));
        assert_eq!(config.propagation, Propagation::Push);
    }

    #[test]
    fn app_dir_prefers_xdg_then_home() {
        let env = |xdg: Option<&'static str>| {
            move |k: &str| match k {
                "XDG_CACHE_HOME" => xdg.map(OsString::from),
                "HOME" => Some(OsString::from("/home/reader")),
                _ => None,
            }
        };
        assert_eq!(
            app_dir("XDG_CACHE_HOME", ".cache", env(Some("/var/cache"))),
            PathBuf::from("/var/cache/ks-player")
        );
        assert_eq!(
            app_dir("XDG_CACHE_HOME", ".cache", env(Some(""))),
            PathBuf::from("/home/reader/.cache/ks-player")
        );
        assert_eq!(
            app_dir("XDG_CACHE_HOME", ".cache", env(None)),
            PathBuf::from("/home/reader/.cache/ks-player")
        );
    }

    #[test]
    fn binding_matching() {
        assert!(matches_binding("Esc", &key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(matches_binding("F5", &key(KeyCode::F(5), KeyModifiers::NONE)));
        assert!(!matches_binding("F5", &key(KeyCode::F(15), KeyModifiers::NONE)));
        assert!(matches_binding("q", &key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(!matches_binding("q", &key(KeyCode::Char('q'), KeyModifiers::CONTROL)));
        assert!(matches_binding("Ctrl-c", &key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!matches_binding("Ctrl-c", &key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!matches_binding("Space", &key(KeyCode::Enter, KeyModifiers::NONE)));
    }
}
