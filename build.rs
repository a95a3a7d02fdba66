/*
 * Build script embedding the metadata read back by `EmbeddedBuildInfo`.
 * * Handles the module path, the version identifier, the toolchain and the
 * * VCS state of the working copy at compile time.
 */

use std::{
    env,
    path::{Path, PathBuf},
    process::Command,
};

/// Runs git and returns trimmed stdout, or None when git is missing or fails.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;

    if !output.status.success() {
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Git files that exist under `root` and change with new commits or edits.
pub fn git_watch_paths(root: &Path) -> Vec<PathBuf> {
    [".git/HEAD", ".git/index"]
        .iter()
        .map(|rel| root.join(rel))
        .filter(|path| path.exists())
        .collect()
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=VERINFO_VERSION");

    // Module path: the repository without its scheme, else the package name
    let module_path = env::var("CARGO_PKG_REPOSITORY")
        .ok()
        .filter(|repo| !repo.is_empty())
        .map(|repo| {
            repo.trim_start_matches("https://")
                .trim_start_matches("http://")
                .to_string()
        })
        .unwrap_or_else(|| env::var("CARGO_PKG_NAME").unwrap_or_default());

    // Release pipelines stamp the identifier; local builds are "(devel)"
    let version = env::var("VERINFO_VERSION")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "(devel)".to_string());

    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let toolchain = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let (vcs, revision, time, modified) = match git(&["rev-parse", "HEAD"]) {
        Some(revision) => (
            "git".to_string(),
            revision,
            git(&["log", "-1", "--format=%cI"]).unwrap_or_default(),
            git(&["status", "--porcelain"])
                .map(|status| (!status.is_empty()).to_string())
                .unwrap_or_default(),
        ),
        None => Default::default(),
    };

    println!("cargo:rustc-env=VERINFO_MODULE_PATH={module_path}");
    println!("cargo:rustc-env=VERINFO_MAIN_VERSION={version}");
    println!("cargo:rustc-env=VERINFO_TOOLCHAIN={toolchain}");
    println!("cargo:rustc-env=VERINFO_VCS={vcs}");
    println!("cargo:rustc-env=VERINFO_VCS_REVISION={revision}");
    println!("cargo:rustc-env=VERINFO_VCS_TIME={time}");
    println!("cargo:rustc-env=VERINFO_VCS_MODIFIED={modified}");

    // A missing watched path would re-run the script on every build
    let root = env::var("CARGO_MANIFEST_DIR").map(PathBuf::from).unwrap_or_default();
    for path in git_watch_paths(&root) {
        println!("cargo:rerun-if-changed={}", path.display());
    }
}
