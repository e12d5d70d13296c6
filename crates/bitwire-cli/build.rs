use std::env;
use std::process::Command;

/// Packagers building from a tarball set this to the release commit.
const COMMIT_OVERRIDE: &str = "BITWIRE_BUILD_COMMIT";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed={COMMIT_OVERRIDE}");

    let commit = env::var(COMMIT_OVERRIDE)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| git(&["describe", "--always", "--dirty", "--abbrev=7"]))
        .unwrap_or_else(|| "unknown".to_string());
    let date = git(&["log", "-1", "--format=%cs"]).unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=BITWIRE_BUILD_INFO={commit} {date}");
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
