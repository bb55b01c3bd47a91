//! Recursive path ingestion: containment, glob expansion, copy, backlink.

use anyhow::{Context as _, Result};
use globset::Glob;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::Session;

impl Session<'_> {
    /// Ingest one resolved rule path for an application.
    ///
    /// `top_level` marks calls that are the direct consequence of a rule
    /// resolution (or of a glob match standing in for one) and gates the
    /// backlink branch.  `trusted_base` is the discovered root the path must
    /// stay inside; once set for a branch of recursion it is inherited by
    /// all descendants.
    ///
    /// Never fails: any unexpected error for this `(app, rule, path)` is
    /// recorded as a news diagnostic so sibling ingestions proceed.
    pub fn ingest(
        &mut self,
        app: &str,
        rule_name: &str,
        path: &str,
        top_level: bool,
        trusted_base: Option<&Path>,
    ) {
        if let Err(err) = self.ingest_inner(app, rule_name, path, top_level, trusted_base) {
            self.warn_news(format!(
                "Ingestion failed for app '{app}' rule '{rule_name}' path '{path}': {err:#}"
            ));
        }
    }

    fn ingest_inner(
        &mut self,
        app: &str,
        rule_name: &str,
        path: &str,
        top_level: bool,
        trusted_base: Option<&Path>,
    ) -> Result<()> {
        let ppath = Path::new(path);

        if let Some(base) = trusted_base {
            if !self.branch_is_contained(ppath, base) {
                self.warn_news(format!(
                    "Security: Path '{path}' for app '{app}' resolves outside of its base '{}'. Skipping.",
                    base.display()
                ));
                return Ok(());
            }
        } else if !path.contains('*') && ppath.is_absolute() {
            // Without a trusted base only glob patterns and relative paths
            // are legal rule inputs.
            self.warn_news(format!(
                "Security: Absolute path '{path}' for app '{app}' is not allowed in rules. Skipping."
            ));
            return Ok(());
        }

        if self.is_path_ignored(ppath) {
            tracing::debug!("ignoring {path}");
            return Ok(());
        }

        let output_dir = self.output().join(app).join(rule_name);

        if path.contains('*') {
            self.ingest_glob(app, rule_name, ppath, trusted_base, &output_dir)
        } else {
            self.ingest_concrete(app, rule_name, path, top_level, &output_dir)
        }
    }

    /// Expand the trailing glob segment and recurse once per match.
    ///
    /// Matches are collected from the source parent *and* from the already
    /// ingested output directory, so entries that disappeared at the source
    /// are still visited and re-audited on later runs.
    fn ingest_glob(
        &mut self,
        app: &str,
        rule_name: &str,
        ppath: &Path,
        trusted_base: Option<&Path>,
        output_dir: &Path,
    ) -> Result<()> {
        let parent = ppath.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let pattern = ppath
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if parent.display().to_string().contains('*') {
            self.warn_news(format!(
                "Rule bug: globs in any path segment but the last are unsupported. app={app} rule_name={rule_name} path='{}'",
                ppath.display()
            ));
            return Ok(());
        }

        let matcher = Glob::new(&pattern)
            .with_context(|| format!("invalid glob pattern '{pattern}'"))?
            .compile_matcher();

        let mut names: BTreeSet<String> = BTreeSet::new();
        collect_matching_names(&parent, &matcher, &mut names);
        collect_matching_names(output_dir, &matcher, &mut names);
        tracing::debug!(
            "glob '{}' expanded to {} item(s)",
            ppath.display(),
            names.len()
        );

        for name in names {
            let item = parent.join(&name);
            let child_rule = if item.is_dir() {
                format!("{rule_name}/{name}")
            } else {
                rule_name.to_string()
            };
            let base = trusted_base.map_or_else(|| parent.clone(), Path::to_path_buf);
            self.ingest(
                app,
                &child_rule,
                &item.display().to_string(),
                true,
                Some(base.as_path()),
            );
        }
        Ok(())
    }

    /// Copy an existing concrete path, snapshot the change, and apply the
    /// backlink and dangling-symlink steps.
    fn ingest_concrete(
        &mut self,
        app: &str,
        rule_name: &str,
        path: &str,
        top_level: bool,
        output_dir: &Path,
    ) -> Result<()> {
        let ppath = Path::new(path);

        if ppath.exists() {
            tracing::info!("ingest {} -> {}", path, output_dir.display());
            if ppath.is_dir() {
                self.copy_item(ppath, output_dir)?;
            } else if let Some(name) = ppath.file_name() {
                self.copy_item(ppath, &output_dir.join(name))?;
            }

            if self.snapshot.enabled() && self.snapshot.is_dirty()? {
                let message = format!(
                    "hostname={} app={app} rule={rule_name} path={path}",
                    self.hostname()
                );
                self.snapshot.commit(&message)?;
            }
        }

        if self.backlink && top_level {
            self.backlink_origin(ppath, output_dir)?;
        }

        // A link whose target vanished is either a rule bug or a backlink
        // that lost its output directory.
        if ppath.symlink_metadata().is_ok_and(|m| m.is_symlink()) && !ppath.exists() {
            self.warn_news(format!(
                "This may be a rule or a program bug: '{path}' points to a non existent location."
            ));
        }
        Ok(())
    }

    /// Containment with one deliberate exception: an origin that is itself
    /// a symlink resolving into the output repository is a backlink from an
    /// earlier run, not an escape, and stays ingestible so the link can be
    /// refreshed and audited.
    fn branch_is_contained(&self, path: &Path, base: &Path) -> bool {
        if is_contained(path, base) {
            return true;
        }
        path.symlink_metadata().is_ok_and(|m| m.is_symlink()) && self.resolves_inside_output(path)
    }

    /// Leave a symlink at the origin pointing into the output tree.
    ///
    /// An existing symlink is removed and recreated.  A real file or
    /// directory is quarantined, never deleted.
    fn backlink_origin(&mut self, origin: &Path, output_dir: &Path) -> Result<()> {
        tracing::debug!(
            "backlink {} -> {}",
            origin.display(),
            output_dir.display()
        );
        if let Some(parent) = origin.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create parent: {}", parent.display()))?;
        }

        match origin.symlink_metadata() {
            Ok(meta) if meta.is_symlink() => {
                std::fs::remove_file(origin)
                    .with_context(|| format!("remove symlink: {}", origin.display()))?;
            }
            Ok(_) => self.quarantine(origin)?,
            Err(_) => {}
        }

        tracing::info!("ln {} -> {}", origin.display(), output_dir.display());
        create_symlink(output_dir, origin)
    }

    /// Move a conflicting origin into `__backup__`, timestamp-suffixed.
    fn quarantine(&mut self, item: &Path) -> Result<()> {
        let backup_dir = self.output().join("__backup__");
        std::fs::create_dir_all(&backup_dir)
            .with_context(|| format!("create backup dir: {}", backup_dir.display()))?;

        let name = item
            .file_name()
            .map_or_else(|| "item".to_string(), |n| n.to_string_lossy().to_string());
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let target = backup_dir.join(format!("{name}.{stamp}"));

        std::fs::rename(item, &target).with_context(|| {
            format!(
                "move {} to backup at {}",
                item.display(),
                target.display()
            )
        })?;
        self.warn_news(format!(
            "Moved potentially conflicting item '{}' to the backup directory at '{}'.",
            item.display(),
            target.display()
        ));
        Ok(())
    }
}

/// Create a symlink at `link` pointing to `target`.
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).with_context(|| {
            format!(
                "creating symlink {} -> {}",
                link.display(),
                target.display()
            )
        })?;
    }

    #[cfg(windows)]
    {
        // Backlink targets are always the rule's output directory.
        std::os::windows::fs::symlink_dir(target, link).with_context(|| {
            format!(
                "creating symlink {} -> {}",
                link.display(),
                target.display()
            )
        })?;
    }

    Ok(())
}

/// Collect directory entry names under `dir` whose file name matches.
///
/// Unreadable or missing directories contribute nothing.
fn collect_matching_names(dir: &Path, matcher: &globset::GlobMatcher, names: &mut BTreeSet<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if matcher.is_match(&name) {
            names.insert(name);
        }
    }
}

/// Whether `path` resolves to a descendant of `base` (or `base` itself).
///
/// When both resolve on disk the canonical forms are compared; otherwise a
/// lexical comparison is used, so paths that do not exist yet are checked
/// again implicitly once concrete.
fn is_contained(path: &Path, base: &Path) -> bool {
    match (dunce::canonicalize(path), dunce::canonicalize(base)) {
        (Ok(resolved), Ok(resolved_base)) => resolved.starts_with(resolved_base),
        _ => resolve_lexical(path).starts_with(resolve_lexical(base)),
    }
}

/// Absolutize without touching the filesystem, folding `.` and `..`.
pub(crate) fn resolve_lexical(path: &Path) -> PathBuf {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in abs.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
