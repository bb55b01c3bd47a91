//! Run reporting: per-host timing metrics in the output tree.

use anyhow::{Context as _, Result};
use std::io::Write as _;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Write `__meta__/<host>/last_run.txt` and append to `run_times.txt`.
///
/// `last_run.txt` holds the finish time in unix seconds; `run_times.txt`
/// accumulates one `start_unix,duration_seconds` line per run.
///
/// # Errors
///
/// Returns an error when the meta directory or either file cannot be
/// written.
pub fn write_run_report(
    output: &Path,
    hostname: &str,
    started: SystemTime,
    finished: SystemTime,
) -> Result<()> {
    let meta_dir = output.join("__meta__").join(hostname);
    std::fs::create_dir_all(&meta_dir)
        .with_context(|| format!("create meta dir: {}", meta_dir.display()))?;

    let finish_secs = unix_seconds(finished);
    std::fs::write(meta_dir.join("last_run.txt"), format!("{finish_secs}"))
        .context("write last_run.txt")?;

    let start_secs = unix_seconds(started);
    let duration = finished
        .duration_since(started)
        .unwrap_or_default()
        .as_secs_f64();
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(meta_dir.join("run_times.txt"))
        .context("open run_times.txt")?;
    writeln!(file, "{start_secs},{duration:.6}").context("append run_times.txt")?;
    Ok(())
}

/// The host identifier used in snapshot messages and report paths.
///
/// Taken from the `HOSTNAME` environment variable, falling back to the
/// `hostname` binary, then to a fixed placeholder.
#[must_use]
pub fn hostname() -> String {
    if let Ok(name) = std::env::var("HOSTNAME")
        && !name.trim().is_empty()
    {
        return name.trim().to_string();
    }
    if let Ok(output) = std::process::Command::new("hostname").output()
        && output.status.success()
    {
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !name.is_empty() {
            return name;
        }
    }
    "unknown-host".to_string()
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn writes_last_run_and_run_times() {
        let out = tempfile::tempdir().unwrap();
        let started = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let finished = started + Duration::from_secs(42);

        write_run_report(out.path(), "myhost", started, finished).unwrap();

        let meta = out.path().join("__meta__/myhost");
        assert_eq!(
            std::fs::read_to_string(meta.join("last_run.txt")).unwrap(),
            "1700000042"
        );
        let run_times = std::fs::read_to_string(meta.join("run_times.txt")).unwrap();
        assert_eq!(run_times, "1700000000,42.000000\n");
    }

    #[test]
    fn run_times_appends_across_runs() {
        let out = tempfile::tempdir().unwrap();
        let t0 = UNIX_EPOCH + Duration::from_secs(100);
        write_run_report(out.path(), "h", t0, t0 + Duration::from_secs(1)).unwrap();
        write_run_report(out.path(), "h", t0, t0 + Duration::from_secs(2)).unwrap();

        let run_times =
            std::fs::read_to_string(out.path().join("__meta__/h/run_times.txt")).unwrap();
        assert_eq!(run_times.lines().count(), 2);
    }

    #[test]
    fn hostname_is_never_empty() {
        assert!(!hostname().is_empty());
    }
}
