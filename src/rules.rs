//! Rule files and the variable reverse index.
//!
//! Each application has one plain-text rule file, `<app>.txt`, with one rule
//! per line: the rule name, a space, and a path template (which may itself
//! contain spaces).  Rule names are slash-separated hierarchies and double
//! as the relative output path below the application's backup folder.
//!
//! [`RuleBook`] loads every rule file once at startup and builds a reverse
//! index from variable to the applications whose rules mention it, so root
//! discovery only ever touches the applications a new root is relevant to.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::Settings;
use crate::vars::{self, Variable};

/// A single backup instruction for an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Identifier and relative output path (e.g. `saves`).
    pub name: String,
    /// Path template, possibly holding one `$variable` and/or one trailing
    /// glob segment.
    pub template: String,
}

/// All rules for all applications, plus the variable reverse index.
///
/// Built once per run and immutable afterwards.
#[derive(Debug, Default)]
pub struct RuleBook {
    apps: BTreeMap<String, Vec<Rule>>,
    var_users: BTreeMap<Variable, BTreeSet<String>>,
    rootless: Vec<(String, Rule)>,
}

impl RuleBook {
    /// Load rule files from `sources`, later sources overriding earlier
    /// ones per application.
    ///
    /// Every `*.txt` file directly inside a source directory defines the
    /// rules of the application named by its stem.  Unreadable sources or
    /// files are logged and skipped; they never fail the run.
    #[must_use]
    pub fn load(settings: &Settings, sources: &[&Path]) -> Self {
        let mut contents: BTreeMap<String, String> = BTreeMap::new();
        for source in sources {
            let entries = match std::fs::read_dir(source) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!("cannot read rules directory {}: {err}", source.display());
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_none_or(|e| e != "txt") || !path.is_file() {
                    continue;
                }
                let Some(app) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                    continue;
                };
                match std::fs::read_to_string(&path) {
                    Ok(content) => {
                        contents.insert(app, content);
                    }
                    Err(err) => {
                        tracing::warn!("cannot read rule file {}: {err}", path.display());
                    }
                }
            }
        }

        let mut book = Self::default();
        for (app, content) in contents {
            let rules = parse_rules(settings, &app, &content);
            book.index_app(&app, &rules);
            book.apps.insert(app, rules);
        }
        book
    }

    /// Build a book directly from `(app, rule file content)` pairs.
    ///
    /// Test-friendly entry point; [`Self::load`] funnels into the same
    /// indexing.
    #[must_use]
    pub fn from_contents(settings: &Settings, contents: &[(&str, &str)]) -> Self {
        let mut book = Self::default();
        for (app, content) in contents {
            let rules = parse_rules(settings, app, content);
            book.index_app(app, &rules);
            book.apps.insert((*app).to_string(), rules);
        }
        book
    }

    fn index_app(&mut self, app: &str, rules: &[Rule]) {
        for rule in rules {
            match vars::first_token(&rule.template) {
                None => self.rootless.push((app.to_string(), rule.clone())),
                Some(token) => match Variable::parse(&token) {
                    Some(var) => {
                        self.var_users
                            .entry(var)
                            .or_default()
                            .insert(app.to_string());
                    }
                    None => {
                        tracing::debug!(
                            "rule {app}/{} references unknown variable ${token}, never resolved",
                            rule.name
                        );
                    }
                },
            }
        }
    }

    /// Applications with at least one rule, in sorted order.
    pub fn apps(&self) -> impl Iterator<Item = &str> {
        self.apps.keys().map(String::as_str)
    }

    /// The rules of one application (empty when unknown).
    #[must_use]
    pub fn rules(&self, app: &str) -> &[Rule] {
        self.apps.get(app).map_or(&[], Vec::as_slice)
    }

    /// Applications whose rules mention `var`, in sorted order.
    pub fn users_of(&self, var: Variable) -> impl Iterator<Item = &str> {
        self.var_users
            .get(&var)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Root-independent rules (no variable token), ingested before any
    /// discovery.
    #[must_use]
    pub fn rootless(&self) -> &[(String, Rule)] {
        &self.rootless
    }

    /// Total number of loaded rules across all applications.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.apps.values().map(Vec::len).sum()
    }
}

/// Parse one application's rule file content.
///
/// Lines are trimmed, blank lines skipped.  The first space splits the rule
/// name from the template; lines without a template are dropped.  Rules
/// disabled through an `ignore_<name>` configuration flag are skipped here,
/// at parse time.
#[must_use]
pub fn parse_rules(settings: &Settings, app: &str, content: &str) -> Vec<Rule> {
    let mut rules = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((name, template)) = trimmed.split_once(' ') else {
            tracing::debug!("rule line without a path template in {app}: {trimmed}");
            continue;
        };
        let name = name.trim();
        if settings.get_flag(app, &format!("ignore_{name}")) {
            continue;
        }
        rules.push(Rule {
            name: name.to_string(),
            template: template.trim().to_string(),
        });
    }
    rules
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn empty_settings() -> Settings {
        Settings::parse("", "test.cfg").expect("empty config parses")
    }

    #[test]
    fn parse_splits_on_first_space_only() {
        let rules = parse_rules(
            &empty_settings(),
            "skyrim",
            "saves $documents/My Games/Skyrim/Saves\n",
        );
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "saves");
        assert_eq!(rules[0].template, "$documents/My Games/Skyrim/Saves");
    }

    #[test]
    fn parse_skips_blank_lines() {
        let rules = parse_rules(&empty_settings(), "app", "\n\nsaves $home/s\n\n");
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn parse_drops_lines_without_template() {
        let rules = parse_rules(&empty_settings(), "app", "orphan\nsaves $home/s\n");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "saves");
    }

    #[test]
    fn parse_honors_ignore_flag() {
        let settings = Settings::parse("[app]\nignore_saves\n", "t").unwrap();
        let rules = parse_rules(&settings, "app", "saves $home/s\nconfig $home/c\n");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "config");
    }

    #[test]
    fn ignore_flag_is_per_application() {
        let settings = Settings::parse("[other]\nignore_saves\n", "t").unwrap();
        let rules = parse_rules(&settings, "app", "saves $home/s\n");
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn book_indexes_variables_per_app() {
        let settings = empty_settings();
        let book = RuleBook::from_contents(
            &settings,
            &[("a", "saves $home/s\n"), ("b", "cfg $appdata/c\n")],
        );
        let home_users: Vec<&str> = book.users_of(Variable::Home).collect();
        let appdata_users: Vec<&str> = book.users_of(Variable::Appdata).collect();
        assert_eq!(home_users, ["a"]);
        assert_eq!(appdata_users, ["b"]);
        assert_eq!(book.users_of(Variable::Ubisoft).count(), 0);
    }

    #[test]
    fn book_collects_rootless_rules() {
        let settings = empty_settings();
        let book = RuleBook::from_contents(&settings, &[("a", "fixed some/relative/dir\n")]);
        assert_eq!(book.rootless().len(), 1);
        assert_eq!(book.rootless()[0].0, "a");
        assert_eq!(book.rootless()[0].1.name, "fixed");
        assert_eq!(book.users_of(Variable::Home).count(), 0);
    }

    #[test]
    fn book_ignores_unknown_variables() {
        let settings = empty_settings();
        let book = RuleBook::from_contents(&settings, &[("a", "saves $steam/s\n")]);
        assert!(book.rootless().is_empty());
        for var in Variable::ALL {
            assert_eq!(book.users_of(var).count(), 0);
        }
        // the rule is still listed for the app, it just never resolves
        assert_eq!(book.rules("a").len(), 1);
    }

    #[test]
    fn load_prefers_later_sources() {
        let settings = empty_settings();
        let builtin = tempfile::tempdir().unwrap();
        let custom = tempfile::tempdir().unwrap();
        std::fs::write(builtin.path().join("game.txt"), "saves $home/a\n").unwrap();
        std::fs::write(custom.path().join("game.txt"), "saves $home/b\n").unwrap();

        let book = RuleBook::load(&settings, &[builtin.path(), custom.path()]);
        assert_eq!(book.rules("game")[0].template, "$home/b");
    }

    #[test]
    fn load_skips_non_txt_files() {
        let settings = empty_settings();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("game.txt"), "saves $home/a\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "saves $home/b\n").unwrap();

        let book = RuleBook::load(&settings, &[dir.path()]);
        let apps: Vec<&str> = book.apps().collect();
        assert_eq!(apps, ["game"]);
    }

    #[test]
    fn load_tolerates_missing_source() {
        let settings = empty_settings();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("game.txt"), "saves $home/a\n").unwrap();
        let missing = dir.path().join("does-not-exist");

        let book = RuleBook::load(&settings, &[missing.as_path(), dir.path()]);
        assert_eq!(book.rule_count(), 1);
    }

    #[test]
    fn rule_book_snapshot() {
        let settings = empty_settings();
        let book = RuleBook::from_contents(
            &settings,
            &[("minecraft", "saves $home/.minecraft/saves\nconfig $home/.minecraft/options.txt\n")],
        );
        let rendered: Vec<String> = book
            .rules("minecraft")
            .iter()
            .map(|r| format!("{} => {}", r.name, r.template))
            .collect();
        insta::assert_snapshot!(rendered.join("\n"), @r"
        saves => $home/.minecraft/saves
        config => $home/.minecraft/options.txt
        ");
    }
}
