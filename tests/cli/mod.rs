//! CLI Integration Test Modules

pub mod pipeline;
pub mod toml_config;

use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::time::Duration;

/// Run `correlate` with `args`, writing `input` to its stdin
///
/// The default config location is redirected to an empty directory so a
/// developer's own config file cannot leak into the tests.
pub fn run_correlate(args: &[&str], input: &str) -> Output {
    run_correlate_slowly(args, input, Duration::ZERO)
}

/// Like [`run_correlate`], keeping stdin open for `linger` after the input
pub fn run_correlate_slowly(args: &[&str], input: &str, linger: Duration) -> Output {
    let config_home = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_correlate"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start correlate");

    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(input.as_bytes()).unwrap();
    stdin.flush().unwrap();
    std::thread::sleep(linger);
    drop(stdin);

    child.wait_with_output().unwrap()
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
