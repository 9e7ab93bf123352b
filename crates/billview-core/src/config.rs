//! `billview.toml`: where the document and store live plus parser and
//! index tuning. Every field is optional.

use crate::error::{Error, Result};
use crate::highlight::SNIPPET_MAX;
use crate::parser::ParseOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "BILLVIEW_CONFIG";
pub const CONFIG_FILE: &str = "billview.toml";
pub const DEFAULT_DOCUMENT: &str = "billionaires tax.txt";
pub const DEFAULT_STORE: &str = ".billview/highlights.json";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub document: PathBuf,
    pub store: PathBuf,
    /// Page stylesheet: `auto`, `light` or `dark`.
    pub theme: String,
    pub parser: ParseOptions,
    pub highlights: HighlightSettings,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HighlightSettings {
    pub snippet_max: usize,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            snippet_max: SNIPPET_MAX,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document: PathBuf::from(DEFAULT_DOCUMENT),
            store: PathBuf::from(DEFAULT_STORE),
            theme: "auto".to_string(),
            parser: ParseOptions::default(),
            highlights: HighlightSettings::default(),
        }
    }
}

impl Config {
    /// Loads the first config found: `explicit`, then `$BILLVIEW_CONFIG`,
    /// then `./billview.toml`. Falls back to defaults when none exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::load_from_file(Path::new(&path));
        }
        let local = Path::new(CONFIG_FILE);
        if local.is_file() {
            return Self::load_from_file(local);
        }
        tracing::debug!("no config file, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        let config = Self::from_toml(path, &raw)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(path: &Path, raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, DEFAULT_STORE};
    use crate::error::Error;
    use std::path::{Path, PathBuf};

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml(Path::new("billview.toml"), "").expect("config");
        assert_eq!(config, Config::default());
        assert_eq!(config.store, PathBuf::from(DEFAULT_STORE));
        assert_eq!(config.highlights.snippet_max, 140);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let raw = r#"
document = "bill.txt"
theme = "dark"

[parser]
act_title = "THE SAMPLE ACT"

[highlights]
snippet_max = 60
"#;
        let config = Config::from_toml(Path::new("billview.toml"), raw).expect("config");
        assert_eq!(config.document, PathBuf::from("bill.txt"));
        assert_eq!(config.theme, "dark");
        assert_eq!(config.parser.act_title, "THE SAMPLE ACT");
        assert_eq!(config.parser.stamp_headings, vec!["RECEIVED".to_string()]);
        assert_eq!(config.highlights.snippet_max, 60);
    }

    #[test]
    fn malformed_file_names_the_path() {
        let err = Config::from_toml(Path::new("bad.toml"), "theme = [").expect_err("invalid");
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/billview.toml"))).expect_err("missing");
        assert!(matches!(err, Error::Io { .. }));
    }
}
