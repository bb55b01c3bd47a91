//! Idempotent, interruption-tolerant copying into the output tree.

use anyhow::{Context as _, Result};
use std::path::Path;

use super::Session;

impl Session<'_> {
    /// Copy `source` to `destination`, recursing over directories.
    ///
    /// Safety guards, in order:
    /// - a source that resolves inside the output repository is never
    ///   copied (cycle prevention when a discovered root overlaps the
    ///   output);
    /// - symlinks are never copied or followed here; origins that are
    ///   links belong exclusively to the backlink branch;
    /// - files are skipped when the destination's mtime is not older than
    ///   the source's, so re-runs and interrupted runs converge without
    ///   re-copying;
    /// - source and destination being the same underlying file is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when directory creation, enumeration, or the file
    /// copy itself fails.
    pub(crate) fn copy_item(&self, source: &Path, destination: &Path) -> Result<()> {
        tracing::debug!(
            "evaluating copy {} -> {}",
            source.display(),
            destination.display()
        );

        let Ok(meta) = source.symlink_metadata() else {
            return Ok(()); // vanished between enumeration and copy
        };

        if self.resolves_inside_output(source) {
            tracing::warn!(
                "not copying {}: origin is inside the output tree",
                source.display()
            );
            return Ok(());
        }

        if meta.is_symlink() {
            tracing::warn!("not copying {}: it is a symlink", source.display());
            return Ok(());
        }

        if meta.is_dir() {
            std::fs::create_dir_all(destination)
                .with_context(|| format!("creating directory {}", destination.display()))?;
            let entries = std::fs::read_dir(source)
                .with_context(|| format!("reading directory {}", source.display()))?;
            for entry in entries {
                let entry =
                    entry.with_context(|| format!("reading entry in {}", source.display()))?;
                self.copy_item(&entry.path(), &destination.join(entry.file_name()))?;
            }
            return Ok(());
        }

        if !destination_is_stale(source, destination) {
            tracing::debug!("not copying {}: didn't change", source.display());
            return Ok(());
        }

        if same_file(source, destination) {
            return Ok(());
        }

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create parent: {}", parent.display()))?;
        }
        tracing::info!("copying {} -> {}", source.display(), destination.display());
        std::fs::copy(source, destination).with_context(|| {
            format!(
                "copying {} to {}",
                source.display(),
                destination.display()
            )
        })?;
        Ok(())
    }

    /// Whether `path` resolves to a location under the output repository.
    pub(crate) fn resolves_inside_output(&self, path: &Path) -> bool {
        let resolved =
            dunce::canonicalize(path).unwrap_or_else(|_| super::ingest::resolve_lexical(path));
        let output = dunce::canonicalize(&self.output)
            .unwrap_or_else(|_| super::ingest::resolve_lexical(&self.output));
        resolved.starts_with(output)
    }
}

/// Whether the destination is missing or older than the source.
fn destination_is_stale(source: &Path, destination: &Path) -> bool {
    let Ok(dest_meta) = destination.metadata() else {
        return true;
    };
    match (source.metadata().and_then(|m| m.modified()), dest_meta.modified()) {
        (Ok(src_mtime), Ok(dest_mtime)) => dest_mtime < src_mtime,
        _ => true, // mtime unavailable: copy rather than risk staleness
    }
}

/// Whether two paths name the same underlying file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}
