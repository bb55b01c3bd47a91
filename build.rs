//! Build script: stamps the crate version from `SAVEGAME_VERSION` or `git describe`.

use std::process::Command;

fn main() {
    // Prefer SAVEGAME_VERSION env var if set (e.g., by CI release workflow),
    // otherwise fall back to git describe for local development builds.
    if let Ok(version) = std::env::var("SAVEGAME_VERSION") {
        println!("cargo:rustc-env=SAVEGAME_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=SAVEGAME_VERSION={version}");
    }

    // Re-run if git HEAD changes or env var changes
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=SAVEGAME_VERSION");
}
