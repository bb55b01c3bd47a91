//! Configuration store with typed lookups.
//!
//! The configuration is an INI-style file (see [`ini`]) holding a
//! `[general]` section, a `[search]` section driving root discovery, and one
//! section per application.  [`Settings`] layers the typed accessors the
//! rest of the engine consumes on top of the raw section/key store:
//! strings, delimited lists, path sets, and presence flags.

pub mod ini;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Typed accessor over the parsed configuration store.
///
/// Lookup semantics follow the original tool: a missing section or key is
/// simply absent (`None`/empty), never an error, and boolean switches are
/// keyed on *presence* rather than value.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Settings {
    /// Load the configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotAFile`] when `path` is not a regular file,
    /// [`ConfigError::Io`] when it cannot be read, and
    /// [`ConfigError::Syntax`] when it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotAFile(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse configuration content from a string.
    ///
    /// # Examples
    ///
    /// ```
    /// use savegame_cli::config::Settings;
    ///
    /// let settings = Settings::parse("[search]\npaths = /srv\n", "demo.cfg").unwrap();
    /// assert_eq!(settings.get_str("search", "paths"), Some("/srv"));
    /// assert_eq!(settings.get_str("search", "missing"), None);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Syntax`] when the content cannot be parsed.
    pub fn parse(content: &str, file: &str) -> Result<Self, ConfigError> {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for section in ini::parse_sections_from_str(content, file)? {
            let entry = sections.entry(section.header).or_default();
            for (key, value) in section.entries {
                entry.insert(key, value);
            }
        }
        Ok(Self { sections })
    }

    /// Look up a raw string value.  Presence-only keys return `Some("")`.
    #[must_use]
    pub fn get_str(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    /// `true` when the key exists in the section, regardless of its value.
    ///
    /// Used for switches such as `not_installed` and `ignore_<rule>` where
    /// setting *anything* enables the flag.
    #[must_use]
    pub fn get_flag(&self, section: &str, key: &str) -> bool {
        self.sections.get(section).is_some_and(|s| s.contains_key(key))
    }

    /// The list delimiter, from `general.divider` (default `,`).
    #[must_use]
    pub fn divider(&self) -> &str {
        match self.get_str("general", "divider") {
            Some(d) if !d.is_empty() => d,
            _ => ",",
        }
    }

    /// Look up a delimited list value.
    ///
    /// Items are split on [`Self::divider`], trimmed, and empty items are
    /// dropped.  A missing key yields an empty list.
    ///
    /// # Examples
    ///
    /// ```
    /// use savegame_cli::config::Settings;
    ///
    /// let settings = Settings::parse("[search]\npaths = /a, /b ,\n", "t").unwrap();
    /// assert_eq!(settings.get_list("search", "paths"), ["/a", "/b"]);
    /// ```
    #[must_use]
    pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        let Some(raw) = self.get_str(section, key) else {
            return Vec::new();
        };
        raw.split(self.divider())
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect()
    }

    /// Look up a list of paths, expanding a leading `~` and absolutizing.
    ///
    /// Entries that cannot be absolutized are dropped.
    #[must_use]
    pub fn get_paths(&self, section: &str, key: &str) -> Vec<PathBuf> {
        self.get_list(section, key)
            .iter()
            .map(|p| expand_user(p))
            .filter_map(|p| std::path::absolute(&p).ok())
            .collect()
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_user(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// The user's home directory from the environment, if known.
fn home_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        std::env::var_os("USERPROFILE")
            .or_else(|| std::env::var_os("HOME"))
            .map(PathBuf::from)
    } else {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn settings(content: &str) -> Settings {
        Settings::parse(content, "test.cfg").expect("test config should parse")
    }

    #[test]
    fn get_str_missing_section_is_none() {
        let s = settings("[search]\npaths = /a\n");
        assert_eq!(s.get_str("nope", "paths"), None);
    }

    #[test]
    fn get_str_missing_key_is_none() {
        let s = settings("[search]\npaths = /a\n");
        assert_eq!(s.get_str("search", "nope"), None);
    }

    #[test]
    fn get_flag_true_for_bare_key() {
        let s = settings("[factorio]\nnot_installed\n");
        assert!(s.get_flag("factorio", "not_installed"));
    }

    #[test]
    fn get_flag_true_for_any_value() {
        let s = settings("[factorio]\nnot_installed = whatever\n");
        assert!(s.get_flag("factorio", "not_installed"));
    }

    #[test]
    fn get_flag_false_when_absent() {
        let s = settings("[factorio]\ninstalldir = /opt\n");
        assert!(!s.get_flag("factorio", "not_installed"));
    }

    #[test]
    fn default_divider_is_comma() {
        let s = settings("[search]\npaths = /a,/b\n");
        assert_eq!(s.get_list("search", "paths"), ["/a", "/b"]);
    }

    #[test]
    fn custom_divider() {
        let s = settings("[general]\ndivider = ;\n[search]\npaths = /a;/b,c\n");
        assert_eq!(s.get_list("search", "paths"), ["/a", "/b,c"]);
    }

    #[test]
    fn get_list_trims_and_drops_empty_items() {
        let s = settings("[search]\npaths = /a , , /b\n");
        assert_eq!(s.get_list("search", "paths"), ["/a", "/b"]);
    }

    #[test]
    fn get_list_missing_key_is_empty() {
        let s = settings("[search]\npaths = /a\n");
        assert!(s.get_list("search", "extra_homes").is_empty());
    }

    #[test]
    fn get_paths_absolutizes() {
        let s = settings("[search]\npaths = /abs/dir\n");
        let paths = s.get_paths("search", "paths");
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_absolute());
    }

    #[test]
    fn get_paths_expands_tilde() {
        let s = settings("[search]\npaths = ~/saves\n");
        let paths = s.get_paths("search", "paths");
        if let Some(home) = home_dir() {
            assert_eq!(paths[0], home.join("saves"));
        }
    }

    #[test]
    fn later_duplicate_key_wins() {
        let s = settings("[x]\nk = a\nk = b\n");
        assert_eq!(s.get_str("x", "k"), Some("b"));
    }

    #[test]
    fn load_missing_file_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("missing.cfg")).unwrap_err();
        assert!(err.to_string().contains("not actually a file"));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.cfg");
        std::fs::write(&path, "[search]\npaths = /a\n").unwrap();
        let s = Settings::load(&path).expect("should load");
        assert_eq!(s.get_str("search", "paths"), Some("/a"));
    }
}
