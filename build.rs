use chrono::Utc;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// Short hash of the checked-out commit, if this is a git checkout
fn git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|hash| !hash.is_empty())
}

fn main() {
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").expect("cargo sets OUT_DIR"));

    let build_time = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let git_hash = git_hash().unwrap_or_else(|| "unknown".to_string());
    let generated = format!(
        "pub const BUILD_TIME: &str = {:?};\npub const GIT_HASH: &str = {:?};\n",
        build_time.to_string(),
        git_hash
    );
    fs::write(out_dir.join("build_info.rs"), generated).expect("write build_info.rs");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
