//! Root discovery: homes, Program-Files equivalents, vendor user folders.
//!
//! Two producers feed the root sequence: explicitly configured extra homes
//! and a bounded recursive search below `search.paths`.  A directory counts
//! as home-like the moment it contains one of the marker folders; the walk
//! still descends into it, so nested homes (wine prefixes inside a real
//! home) are each yielded.  Per home, secondary heuristics derive the
//! `$appdata`, `$documents`, `$program_files`, and `$ubisoft` bindings.

use anyhow::{Context as _, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Settings;
use crate::engine::Session;
use crate::vars::Variable;

/// Marker folders that make a directory home-like.
pub const HOME_MARKERS: [&str; 2] = [".config", "AppData"];

/// Directory names never descended into (virtualization/compat artifacts
/// and caches that are both large and save-free).
pub const IGNORED_DIR_NAMES: [&str; 4] = ["dosdevices", "nixpkgs", ".git", ".cache"];

/// A discovered directory bound to one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// The variable this root binds.
    pub var: Variable,
    /// The concrete absolute directory.
    pub path: PathBuf,
}

/// Whether `dir` contains any home marker folder.
#[must_use]
pub fn is_home_like(dir: &Path) -> bool {
    HOME_MARKERS.iter().any(|marker| dir.join(marker).exists())
}

/// Recursively search for home-like directories below `start`.
///
/// The walk is depth-bounded, never follows symlinked directories, skips
/// the fixed ignore-name list and every path `is_ignored` accepts, and
/// silently abandons unreadable branches.
#[must_use]
pub fn search_homes(
    start: &Path,
    max_depth: usize,
    is_ignored: &dyn Fn(&Path) -> bool,
) -> Vec<PathBuf> {
    WalkDir::new(start)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.file_type().is_dir()
                && !entry.path_is_symlink()
                && !entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| IGNORED_DIR_NAMES.contains(&name))
                && !is_ignored(entry.path())
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| is_home_like(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Find platform `Program Files`-equivalents near a home.
///
/// Scans the home's grandparent for directories holding a `Common Files`
/// child.  Unreadable candidates are skipped and the scan continues; the
/// result is sorted for deterministic processing.
#[must_use]
pub fn program_files_candidates(home: &Path) -> Vec<PathBuf> {
    let Some(grandparent) = home.parent().and_then(Path::parent) else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(grandparent) else {
        return Vec::new();
    };
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|candidate| candidate.join("Common Files").exists())
        .collect();
    candidates.sort();
    candidates
}

/// The vendor savegame directory below a `Program Files`-equivalent.
#[must_use]
pub fn ubisoft_savegames_dir(program_files: &Path) -> PathBuf {
    program_files
        .join("Ubisoft")
        .join("Ubisoft Game Launcher")
        .join("savegames")
}

/// Read the persisted vendor user-id cache from the output tree.
#[must_use]
pub fn load_cached_users(output: &Path) -> BTreeSet<String> {
    std::fs::read_to_string(output.join("ubisoft").join("users.txt")).map_or_else(
        |_| BTreeSet::new(),
        |content| {
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect()
        },
    )
}

/// Union the cached user ids with the ids currently present under
/// `savegames`, rewrite the cache, and return the merged set.
///
/// The union keeps ids that only ever existed on another machine, so their
/// backups keep being tracked here.
///
/// # Errors
///
/// Returns an error when the cache file cannot be written.
pub fn refresh_users(output: &Path, savegames: &Path) -> Result<BTreeSet<String>> {
    let mut users = load_cached_users(output);
    if let Ok(entries) = std::fs::read_dir(savegames) {
        for entry in entries.flatten() {
            if entry.path().is_dir() {
                users.insert(entry.file_name().to_string_lossy().to_string());
            }
        }
    }

    let meta_dir = output.join("ubisoft");
    std::fs::create_dir_all(&meta_dir)
        .with_context(|| format!("create {}", meta_dir.display()))?;
    let cache = meta_dir.join("users.txt");
    let mut content = users.iter().cloned().collect::<Vec<_>>().join("\n");
    content.push('\n');
    std::fs::write(&cache, content).with_context(|| format!("write {}", cache.display()))?;
    Ok(users)
}

/// Produce every root binding for one run, in encounter order.
///
/// Missing extra homes and homes without a `Program Files`-equivalent are
/// surfaced as diagnostics on the session; ignored paths are dropped
/// silently.
pub fn discover_roots(session: &mut Session, settings: &Settings, max_depth: usize) -> Vec<Root> {
    let output = session.output().to_path_buf();
    let mut roots = Vec::new();

    let mut homes: Vec<PathBuf> = Vec::new();
    for home in settings.get_paths("search", "extra_homes") {
        if session.is_path_ignored(&home) {
            continue;
        }
        if home.exists() {
            homes.push(home);
        } else {
            session.warn_news(format!("extra home '{}' does not exist", home.display()));
        }
    }
    for search_path in settings.get_paths("search", "paths") {
        homes.extend(search_homes(&search_path, max_depth, &|p| {
            session.is_path_ignored(p)
        }));
    }

    for home in homes {
        if session.is_path_ignored(&home) {
            continue;
        }
        tracing::debug!("looking for stuff in {}", home.display());

        roots.push(Root {
            var: Variable::Home,
            path: home.clone(),
        });
        roots.push(Root {
            var: Variable::Appdata,
            path: home.join("AppData"),
        });

        for candidate in ["Documentos", "Documents"] {
            let documents = home.join(candidate);
            if documents.exists() {
                roots.push(Root {
                    var: Variable::Documents,
                    path: documents,
                });
            }
        }

        let candidates = program_files_candidates(&home);
        if candidates.is_empty() {
            session.warn_news(format!(
                "No 'Program Files'-equivalent found near home '{}'; $program_files and $ubisoft rules were not resolved for it.",
                home.display()
            ));
        }
        for program_files in candidates {
            roots.push(Root {
                var: Variable::ProgramFiles,
                path: program_files.clone(),
            });

            let savegames = ubisoft_savegames_dir(&program_files);
            if !savegames.exists() {
                continue;
            }
            match refresh_users(&output, &savegames) {
                Ok(users) => {
                    for user in users {
                        roots.push(Root {
                            var: Variable::Ubisoft,
                            path: savegames.join(user),
                        });
                    }
                }
                Err(err) => {
                    session.warn_news(format!("Failed to update the Ubisoft user list: {err:#}"));
                }
            }
        }
    }

    roots
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::engine::test_helpers::make_session;

    fn never_ignored(_: &Path) -> bool {
        false
    }

    #[test]
    fn finds_home_with_config_marker() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("users/alice");
        std::fs::create_dir_all(home.join(".config")).unwrap();

        let homes = search_homes(dir.path(), 10, &never_ignored);
        assert_eq!(homes, vec![home]);
    }

    #[test]
    fn finds_nested_homes() {
        let dir = tempfile::tempdir().unwrap();
        let outer = dir.path().join("alice");
        let inner = outer.join("wine/drive_c/users/alice");
        std::fs::create_dir_all(outer.join(".config")).unwrap();
        std::fs::create_dir_all(inner.join("AppData")).unwrap();

        let homes = search_homes(dir.path(), 10, &never_ignored);
        assert!(homes.contains(&outer));
        assert!(homes.contains(&inner), "walk must descend into found homes");
    }

    #[test]
    fn respects_max_depth() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a/b/c/d");
        std::fs::create_dir_all(deep.join(".config")).unwrap();

        assert!(search_homes(dir.path(), 2, &never_ignored).is_empty());
        assert_eq!(search_homes(dir.path(), 5, &never_ignored), vec![deep]);
    }

    #[test]
    fn skips_ignored_directory_names() {
        let dir = tempfile::tempdir().unwrap();
        let hidden = dir.path().join(".cache/fake-home");
        std::fs::create_dir_all(hidden.join(".config")).unwrap();

        assert!(search_homes(dir.path(), 10, &never_ignored).is_empty());
    }

    #[test]
    fn skips_configured_ignored_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let skipped = dir.path().join("skipme");
        std::fs::create_dir_all(skipped.join(".config")).unwrap();

        let ignore = |p: &Path| p.starts_with(&skipped);
        assert!(search_homes(dir.path(), 10, &ignore).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn does_not_descend_into_symlinked_directories() {
        let dir = tempfile::tempdir().unwrap();
        let real = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(real.path().join("home/.config")).unwrap();
        std::os::unix::fs::symlink(real.path(), dir.path().join("portal")).unwrap();

        assert!(search_homes(dir.path(), 10, &never_ignored).is_empty());
    }

    #[test]
    fn missing_start_directory_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(search_homes(&missing, 10, &never_ignored).is_empty());
    }

    #[test]
    fn program_files_found_in_grandparent() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("drive_c/users/alice");
        std::fs::create_dir_all(&home).unwrap();
        let pf = dir.path().join("drive_c/Program Files");
        std::fs::create_dir_all(pf.join("Common Files")).unwrap();

        assert_eq!(program_files_candidates(&home), vec![pf]);
    }

    #[test]
    fn program_files_requires_common_files_child() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("drive_c/users/alice");
        std::fs::create_dir_all(&home).unwrap();
        std::fs::create_dir_all(dir.path().join("drive_c/Program Files")).unwrap();

        assert!(program_files_candidates(&home).is_empty());
    }

    #[test]
    fn cached_users_empty_without_cache_file() {
        let out = tempfile::tempdir().unwrap();
        assert!(load_cached_users(out.path()).is_empty());
    }

    #[test]
    fn refresh_users_unions_cache_with_enumeration() {
        let out = tempfile::tempdir().unwrap();
        let savegames = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(out.path().join("ubisoft")).unwrap();
        std::fs::write(out.path().join("ubisoft/users.txt"), "101\n").unwrap();
        std::fs::create_dir(savegames.path().join("202")).unwrap();
        std::fs::write(savegames.path().join("not-a-dir"), b"x").unwrap();

        let users = refresh_users(out.path(), savegames.path()).unwrap();
        let expected: BTreeSet<String> = ["101".to_string(), "202".to_string()].into();
        assert_eq!(users, expected);

        // cache rewritten with the union
        let rewritten = std::fs::read_to_string(out.path().join("ubisoft/users.txt")).unwrap();
        assert_eq!(rewritten, "101\n202\n");
    }

    #[test]
    fn refresh_users_survives_missing_savegames_dir() {
        let out = tempfile::tempdir().unwrap();
        let users =
            refresh_users(out.path(), &out.path().join("no-such-dir")).unwrap();
        assert!(users.is_empty());
    }

    #[test]
    fn discover_reports_missing_extra_home() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            "[search]\nextra_homes = {}\n",
            dir.path().join("ghost").display()
        );
        let settings = Settings::parse(&content, "t").unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut session = make_session(&settings, out.path(), false);

        let roots = discover_roots(&mut session, &settings, 10);
        assert!(roots.is_empty());
        assert_eq!(session.news().len(), 1);
        assert!(session.news()[0].contains("does not exist"));
    }

    #[test]
    fn discover_yields_home_and_derived_roots() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("drive_c/users/alice");
        std::fs::create_dir_all(home.join("AppData")).unwrap();
        std::fs::create_dir_all(home.join("Documents")).unwrap();
        let pf = dir.path().join("drive_c/Program Files");
        std::fs::create_dir_all(pf.join("Common Files")).unwrap();

        let content = format!("[search]\npaths = {}\n", dir.path().display());
        let settings = Settings::parse(&content, "t").unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut session = make_session(&settings, out.path(), false);

        let roots = discover_roots(&mut session, &settings, 10);
        let vars: Vec<Variable> = roots.iter().map(|r| r.var).collect();
        assert!(vars.contains(&Variable::Home));
        assert!(vars.contains(&Variable::Appdata));
        assert!(vars.contains(&Variable::Documents));
        assert!(vars.contains(&Variable::ProgramFiles));
        assert!(session.news().is_empty(), "news: {:?}", session.news());
    }

    #[test]
    fn discover_reports_home_without_program_files() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("users/alice");
        std::fs::create_dir_all(home.join(".config")).unwrap();

        let content = format!("[search]\npaths = {}\n", dir.path().display());
        let settings = Settings::parse(&content, "t").unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut session = make_session(&settings, out.path(), false);

        let roots = discover_roots(&mut session, &settings, 10);
        assert!(roots.iter().any(|r| r.var == Variable::Home));
        assert!(
            session
                .news()
                .iter()
                .any(|n| n.contains("Program Files")),
            "incomplete home shape must be surfaced: {:?}",
            session.news()
        );
    }

    #[test]
    fn discover_binds_ubisoft_users_from_cache_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("drive_c/users/alice");
        std::fs::create_dir_all(home.join("AppData")).unwrap();
        let pf = dir.path().join("drive_c/Program Files");
        std::fs::create_dir_all(pf.join("Common Files")).unwrap();
        let savegames = ubisoft_savegames_dir(&pf);
        std::fs::create_dir_all(savegames.join("202")).unwrap();

        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(out.path().join("ubisoft")).unwrap();
        std::fs::write(out.path().join("ubisoft/users.txt"), "101\n").unwrap();

        let content = format!("[search]\npaths = {}\n", dir.path().display());
        let settings = Settings::parse(&content, "t").unwrap();
        let mut session = make_session(&settings, out.path(), false);

        let roots = discover_roots(&mut session, &settings, 10);
        let ubisoft: Vec<&Root> = roots.iter().filter(|r| r.var == Variable::Ubisoft).collect();
        assert_eq!(ubisoft.len(), 2, "cached and enumerated users both bind");
        assert!(ubisoft.iter().any(|r| r.path == savegames.join("101")));
        assert!(ubisoft.iter().any(|r| r.path == savegames.join("202")));
    }
}
