//! End-to-end grouping through the binary

use super::{run_correlate, run_correlate_slowly, stderr_of, stdout_of};
use std::time::Duration;

const TWO_GROUPS: &str = concat!(
    "{\"correlation_id\": \"a\", \"sequence_number\": 2, \"sequence_size\": 2, \"payload\": \"a2\"}\n",
    "{\"correlation_id\": \"b\", \"sequence_number\": 1, \"sequence_size\": 2, \"payload\": \"b1\"}\n",
    "{\"correlation_id\": \"a\", \"sequence_number\": 1, \"sequence_size\": 2, \"payload\": \"a1\"}\n",
    "{\"correlation_id\": \"b\", \"sequence_number\": 2, \"sequence_size\": 2, \"payload\": \"b2\"}\n",
);

#[test]
fn test_complete_groups_are_printed_in_release_order() {
    let output = run_correlate(&[], TWO_GROUPS);

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "[a1, a2]\n[b1, b2]\n");
}

#[test]
fn test_no_newline_flag() {
    let output = run_correlate(&["--no-newline"], TWO_GROUPS);

    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "[a1, a2][b1, b2]");
}

#[test]
fn test_incomplete_group_is_not_printed() {
    let input = "{\"correlation_id\": \"a\", \"sequence_number\": 1, \"sequence_size\": 3, \"payload\": \"a1\"}\n";
    let output = run_correlate(&[], input);

    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "");
}

#[test]
fn test_bad_lines_are_skipped_with_exit_code_2() {
    let input = format!(
        "{}not json\n{{\"payload\": \"no key\"}}\n",
        TWO_GROUPS
    );
    let output = run_correlate(&["--log-level", "warn"], &input);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout_of(&output), "[a1, a2]\n[b1, b2]\n");
    let stderr = stderr_of(&output);
    assert!(stderr.contains("malformed line 5"), "stderr: {}", stderr);
    assert!(stderr.contains("has no correlation key"), "stderr: {}", stderr);
}

#[test]
fn test_expired_group_is_force_completed() {
    let input = "{\"correlation_id\": \"late\", \"sequence_number\": 1, \"sequence_size\": 2, \"payload\": \"only\"}\n";
    let output = run_correlate_slowly(
        &[
            "--expiry-action",
            "force-complete",
            "--group-timeout-ms",
            "10",
            "--reaper-interval-ms",
            "10",
        ],
        input,
        Duration::from_millis(300),
    );

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "[only]\n");
}

#[test]
fn test_expired_group_is_discarded_to_stderr() {
    let input = "{\"correlation_id\": \"late\", \"sequence_number\": 1, \"sequence_size\": 2, \"payload\": \"dropped\"}\n";
    let output = run_correlate_slowly(
        &[
            "--log-level",
            "off",
            "--group-timeout-ms",
            "10",
            "--reaper-interval-ms",
            "10",
        ],
        input,
        Duration::from_millis(300),
    );

    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "");
    assert_eq!(stderr_of(&output), "dropped\n");
}

#[test]
fn test_input_file_option() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("messages.ndjson");
    std::fs::write(&path, TWO_GROUPS).unwrap();

    let output = run_correlate(&["--input", path.to_str().unwrap()], "");

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stdout_of(&output), "[a1, a2]\n[b1, b2]\n");
}

#[test]
fn test_missing_input_file_fails() {
    let output = run_correlate(&["--input", "/nonexistent/messages.ndjson"], "");

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("Cannot open input"));
}
