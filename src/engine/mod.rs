//! The ingestion engine and its per-run session state.
//!
//! A [`Session`] owns everything one backup run mutates: the news
//! diagnostics, the backlink switch, the resolved output tree, and a handle
//! to the snapshot collaborator.  All discovery phases receive the session
//! explicitly; there is no process-wide state.

mod copy;
mod ingest;

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::rules::RuleBook;
use crate::snapshot::Snapshot;
use crate::vars::{self, Variable};

/// Per-run engine state: configuration, safety filters, diagnostics sink,
/// and the snapshot collaborator.
///
/// The engine is strictly single-threaded; a session is created once per
/// run, threaded mutably through every phase, and dropped when the run's
/// summary has been printed.
pub struct Session<'a> {
    snapshot: &'a dyn Snapshot,
    output: PathBuf,
    ignored: Vec<String>,
    backlink: bool,
    hostname: String,
    news: Vec<String>,
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("output", &self.output)
            .field("ignored", &self.ignored)
            .field("backlink", &self.backlink)
            .field("hostname", &self.hostname)
            .field("news", &self.news.len())
            .finish_non_exhaustive()
    }
}

impl<'a> Session<'a> {
    /// Create a session for one run.
    ///
    /// `output` must already be absolute (the command layer absolutizes it
    /// during setup).  Ignored path prefixes are read from `search.ignore`.
    #[must_use]
    pub fn new(
        settings: &Settings,
        snapshot: &'a dyn Snapshot,
        output: PathBuf,
        backlink: bool,
        hostname: String,
    ) -> Self {
        let ignored = settings
            .get_paths("search", "ignore")
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        Self {
            snapshot,
            output,
            ignored,
            backlink,
            hostname,
            news: Vec::new(),
        }
    }

    /// The output repository root.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Host identifier used in snapshot messages and run reports.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Record a non-fatal anomaly for the end-of-run summary and log it.
    pub fn warn_news(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::warn!("{msg}");
        self.news.push(msg);
    }

    /// All diagnostics recorded so far, in emission order.
    #[must_use]
    pub fn news(&self) -> &[String] {
        &self.news
    }

    /// Whether `path` falls under a configured ignored-path prefix.
    ///
    /// Comparison is on the absolutized string form, mirroring the original
    /// prefix semantics.
    #[must_use]
    pub fn is_path_ignored(&self, path: &Path) -> bool {
        let abs = ingest::resolve_lexical(path).display().to_string();
        self.ignored.iter().any(|prefix| abs.starts_with(prefix))
    }

    /// Resolve and ingest every rule of `app` against one root binding.
    ///
    /// Rules whose template does not mention `var` are skipped (substitution
    /// reports no change).  Each resolved rule runs as a top-level ingestion
    /// with the root as its trusted base.
    pub fn ingest_resolved(&mut self, book: &RuleBook, app: &str, var: Variable, root: &Path) {
        for rule in book.rules(app) {
            if let Some(resolved) = vars::substitute(&rule.template, var, root) {
                self.ingest(app, &rule.name, &resolved, true, Some(root));
            }
        }
    }

    /// Ingest one discovered root for every application registered under
    /// its variable.
    pub fn ingest_root(&mut self, book: &RuleBook, var: Variable, root: &Path) {
        let apps: Vec<String> = book.users_of(var).map(String::from).collect();
        for app in &apps {
            self.ingest_resolved(book, app, var, root);
        }
    }
}
