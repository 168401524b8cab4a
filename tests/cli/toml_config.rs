//! Configuration file handling through the binary

use super::{run_correlate, stderr_of, stdout_of};
use std::io::Write;

const ONE_GROUP: &str = concat!(
    "{\"correlation_id\": 7, \"sequence_number\": 1, \"sequence_size\": 2, \"payload\": \"x\"}\n",
    "{\"correlation_id\": 7, \"sequence_number\": 2, \"sequence_size\": 2, \"payload\": \"y\"}\n",
);

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_output_settings_from_file() {
    let config = config_file("[output]\nappend_newline = false\n");
    let path = config.path().to_str().unwrap();

    let output = run_correlate(&["--config-file", path], ONE_GROUP);

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "[x, y]");
}

#[test]
fn test_command_line_overrides_file() {
    let config = config_file("[output]\nappend_newline = false\n");
    let path = config.path().to_str().unwrap();

    let output = run_correlate(&["-c", path, "--newline"], ONE_GROUP);

    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "[x, y]\n");
}

#[test]
fn test_missing_config_file_fails() {
    let output = run_correlate(&["--config-file", "/nonexistent/correlate.toml"], ONE_GROUP);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("does not exist"));
    assert_eq!(stdout_of(&output), "");
}

#[test]
fn test_invalid_setting_fails() {
    let config = config_file("[reaper]\ninterval_ms = 0\n");
    let path = config.path().to_str().unwrap();

    let output = run_correlate(&["-c", path], ONE_GROUP);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("reaper.interval_ms"));
}

#[test]
fn test_unknown_table_fails() {
    let config = config_file("[plugins]\nenabled = true\n");
    let path = config.path().to_str().unwrap();

    let output = run_correlate(&["-c", path], ONE_GROUP);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("Error parsing configuration file"));
}
