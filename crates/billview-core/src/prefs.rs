//! Display preferences kept next to the highlights.

use crate::storage::{KeyValueStore, THEME_KEY};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayTheme {
    #[default]
    Dark,
    Light,
}

impl DisplayTheme {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayTheme::Dark => "dark",
            DisplayTheme::Light => "light",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "dark" => Some(DisplayTheme::Dark),
            "light" => Some(DisplayTheme::Light),
            _ => None,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            DisplayTheme::Dark => DisplayTheme::Light,
            DisplayTheme::Light => DisplayTheme::Dark,
        }
    }

    /// Label for the toggle button, naming the theme it switches to.
    pub fn toggle_label(self) -> &'static str {
        match self {
            DisplayTheme::Dark => "Light mode",
            DisplayTheme::Light => "Dark mode",
        }
    }
}

impl fmt::Display for DisplayTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stored theme, if one was ever saved.
pub fn stored_theme<S: KeyValueStore + ?Sized>(storage: &S) -> Option<DisplayTheme> {
    match storage.get(THEME_KEY) {
        Ok(value) => value.as_deref().and_then(DisplayTheme::parse),
        Err(err) => {
            tracing::warn!(error = %err, "unable to read theme");
            None
        }
    }
}

pub fn load_theme<S: KeyValueStore + ?Sized>(storage: &S) -> DisplayTheme {
    stored_theme(storage).unwrap_or_default()
}

pub fn save_theme<S: KeyValueStore + ?Sized>(storage: &mut S, theme: DisplayTheme) {
    if let Err(err) = storage.set(THEME_KEY, theme.as_str()) {
        tracing::warn!(error = %err, "unable to save theme");
    }
}

/// Flips the stored theme and returns the new one.
pub fn toggle_theme<S: KeyValueStore + ?Sized>(storage: &mut S) -> DisplayTheme {
    let next = load_theme(&*storage).toggle();
    save_theme(storage, next);
    next
}

#[cfg(test)]
mod tests {
    use super::{DisplayTheme, load_theme, save_theme, stored_theme, toggle_theme};
    use crate::storage::{MemoryStore, THEME_KEY};

    #[test]
    fn missing_or_unknown_theme_is_dark() {
        assert_eq!(load_theme(&MemoryStore::new()), DisplayTheme::Dark);
        let store = MemoryStore::new().with_value(THEME_KEY, "sepia");
        assert_eq!(stored_theme(&store), None);
        assert_eq!(load_theme(&store), DisplayTheme::Dark);
    }

    #[test]
    fn toggling_persists() {
        let mut store = MemoryStore::new();
        assert_eq!(toggle_theme(&mut store), DisplayTheme::Light);
        assert_eq!(load_theme(&store), DisplayTheme::Light);
        save_theme(&mut store, DisplayTheme::Dark);
        assert_eq!(load_theme(&store), DisplayTheme::Dark);
        assert_eq!(DisplayTheme::Dark.toggle_label(), "Light mode");
    }
}
