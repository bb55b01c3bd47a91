//! The `backup` command: setup, rule indexing, discovery, ingestion, and
//! the guaranteed finish phase.

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::cli::BackupOpts;
use crate::config::Settings;
use crate::discovery;
use crate::engine::Session;
use crate::error::SetupError;
use crate::exec::SystemExecutor;
use crate::report;
use crate::rules::RuleBook;
use crate::snapshot::{GitSnapshot, NoSnapshot, Snapshot};
use crate::vars::Variable;

/// Run the backup command.
///
/// Only the setup phase can fail; once discovery starts, anomalies are
/// collected as news and the finish phase (run report, final snapshot,
/// news summary) always executes.
///
/// # Errors
///
/// Returns an error when the configuration file is missing or malformed,
/// the output tree cannot be prepared, no rules directory can be located,
/// or snapshotting was requested without a usable `git`.
pub fn run(opts: &BackupOpts) -> Result<()> {
    let config_path = match &opts.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    tracing::debug!("loading configuration file {}", config_path.display());
    let settings = Settings::load(&config_path)?;

    let output = prepare_output(&opts.output)?;

    let snapshot: Box<dyn Snapshot> = if opts.git {
        Box::new(GitSnapshot::new(SystemExecutor, &output)?)
    } else {
        Box::new(NoSnapshot)
    };

    let hostname = report::hostname();
    snapshot.init()?;
    if snapshot.enabled() && snapshot.is_dirty()? {
        // A dirty tree means a previous run was interrupted; shelve and
        // restore to normalize index state, then record what was left.
        snapshot.stash()?;
        snapshot.unstash()?;
        snapshot.commit(&format!("dirty repo state from hostname {hostname}"))?;
    }

    let builtin_rules = match &opts.rules {
        Some(dir) => dir.clone(),
        None => default_rules_dir()?,
    };
    let custom_rules = output.join("__rules__");
    std::fs::create_dir_all(&custom_rules)
        .with_context(|| format!("create {}", custom_rules.display()))?;
    let book = RuleBook::load(&settings, &[builtin_rules.as_path(), custom_rules.as_path()]);
    tracing::info!(
        "loaded {} rules for {} apps",
        book.rule_count(),
        book.apps().count()
    );

    let mut session = Session::new(
        &settings,
        snapshot.as_ref(),
        output,
        opts.backlink,
        hostname,
    );

    let started = SystemTime::now();
    run_discovery(&mut session, &book, &settings, opts.max_depth);
    let finished = SystemTime::now();

    tracing::info!("finishing up");
    if let Err(err) =
        report::write_run_report(session.output(), session.hostname(), started, finished)
    {
        tracing::error!("failed to write run report: {err:#}");
    }
    if snapshot.enabled() {
        if let Err(err) = snapshot.commit(&format!("run report for {}", session.hostname())) {
            tracing::error!("final snapshot commit failed: {err:#}");
        }
        if let Err(err) = snapshot.pull() {
            tracing::error!("snapshot pull failed: {err:#}");
        }
        if let Err(err) = snapshot.push() {
            tracing::error!("snapshot push failed: {err:#}");
        }
    }

    print_news(session.news());
    Ok(())
}

/// Run every discovery and ingestion phase against one session.
///
/// Phase order: root-independent rules first, then configured install
/// directories, then every discovered root.  Failures inside any single
/// ingestion are diagnostics; this function itself cannot fail.
pub fn run_discovery(
    session: &mut Session<'_>,
    book: &RuleBook,
    settings: &Settings,
    max_depth: usize,
) {
    for (app, rule) in book.rootless() {
        session.ingest(app, &rule.name, &rule.template, false, None);
    }

    let installdir_apps: Vec<String> = book.users_of(Variable::Installdir).map(String::from).collect();
    for app in &installdir_apps {
        let install_dirs = settings.get_paths(app, "installdir");
        if install_dirs.is_empty() {
            if !settings.get_flag(app, "not_installed") {
                session.warn_news(format!(
                    "installdir missing for game {app}, please add it in the game configuration section or set anything to not_installed to disable this warning"
                ));
            }
            continue;
        }
        for install_dir in install_dirs {
            if !install_dir.exists() {
                session.warn_news(format!(
                    "Game install dir for {app} doesn't exist: {}",
                    install_dir.display()
                ));
                continue;
            }
            if session.is_path_ignored(&install_dir) {
                continue;
            }
            session.ingest_resolved(book, app, Variable::Installdir, &install_dir);
        }
    }

    let roots = discovery::discover_roots(session, settings, max_depth);
    for root in roots {
        session.ingest_root(book, root.var, &root.path);
    }
}

/// Print the collected diagnostics as a summary block.
fn print_news(news: &[String]) {
    if news.is_empty() {
        return;
    }
    println!("=== IMPORTANT INFORMATION ABOUT THE RUN ===");
    for item in news {
        println!("- {item}");
    }
}

/// Absolutize the output path, create it when absent, reject non-directories.
fn prepare_output(path: &Path) -> Result<PathBuf> {
    let abs = std::path::absolute(path)
        .with_context(|| format!("absolutizing output path {}", path.display()))?;
    if abs.exists() && !abs.is_dir() {
        return Err(SetupError::OutputNotDirectory(abs.display().to_string()).into());
    }
    std::fs::create_dir_all(&abs).map_err(|source| SetupError::CreateOutput {
        path: abs.display().to_string(),
        source,
    })?;
    Ok(abs)
}

/// The default configuration file: `demo.cfg` next to the executable.
fn default_config_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("locating current executable")?;
    Ok(exe
        .parent()
        .map_or_else(|| PathBuf::from("demo.cfg"), |dir| dir.join("demo.cfg")))
}

/// Locate the built-in rules directory.
///
/// Tried in order: the `SAVEGAME_RULES` environment variable, `rules/`
/// next to the executable, the repository root when running out of
/// `target/`, and finally the current directory.
fn default_rules_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("SAVEGAME_RULES") {
        return Ok(PathBuf::from(dir));
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(parent) = exe.parent()
    {
        let candidates = [
            parent.join("rules"),
            parent.join("../../rules"), // target/<profile>/ → repo root
        ];
        for candidate in &candidates {
            if candidate.is_dir() {
                return Ok(dunce::canonicalize(candidate)?);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    if cwd.join("rules").is_dir() {
        return Ok(cwd.join("rules"));
    }

    Err(SetupError::RulesDirMissing.into())
}
