use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("ccguard-{prefix}-{}-{nanos}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, content).expect("write test file");
}

fn write_transcript(path: &Path, user_message: &str) {
    let line = serde_json::json!({
        "type": "user",
        "message": { "role": "user", "content": user_message },
    });
    write_file(path, &format!("{line}\n"));
}

/// Run the binary against an isolated home and state dir, feeding `stdin`
fn run_ccguard(root: &Path, args: &[&str], stdin: &str) -> (bool, Vec<u8>, Vec<u8>) {
    let bin = std::env::var("CARGO_BIN_EXE_ccguard").unwrap_or_else(|_| {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("target");
        path.push("debug");
        if cfg!(windows) {
            path.push("ccguard.exe");
        } else {
            path.push("ccguard");
        }
        path.to_string_lossy().into_owned()
    });
    let mut child = Command::new(bin)
        .args(args)
        .env("HOME", root)
        .env("CCGUARD_STATE_DIR", root.join("state"))
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("CCGUARD_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("run ccguard");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait ccguard");
    (output.status.success(), output.stdout, output.stderr)
}

fn hook_payload(transcript: &Path, event: &str, tool: &str, extra: Value) -> String {
    let mut payload = serde_json::json!({
        "session_id": "it-session",
        "transcript_path": transcript.display().to_string(),
        "hook_event_name": event,
        "tool_name": tool,
    });
    if let (Some(map), Value::Object(extra)) = (payload.as_object_mut(), extra) {
        map.extend(extra);
    }
    payload.to_string()
}

#[test]
fn pre_tool_without_backend_allows_and_updates_statusline() {
    let root = unique_temp_dir("pre-tool-open");
    let transcript = root.join("run.jsonl");
    write_transcript(&transcript, "list the files");

    let payload = hook_payload(
        &transcript,
        "PreToolUse",
        "Bash",
        serde_json::json!({ "tool_input": { "command": "ls -la" } }),
    );
    let (ok, stdout, stderr) = run_ccguard(&root, &["pre-tool"], &payload);
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    assert!(stdout.is_empty(), "fail-open prints nothing");

    let session = transcript.display().to_string();
    let (ok, stdout, stderr) = run_ccguard(
        &root,
        &["statusline", "--session", &session, "--no-color"],
        "",
    );
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    let line = String::from_utf8_lossy(&stdout);
    assert!(line.starts_with("pre-tool Bash ✓"), "statusline: {line}");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn post_tool_reports_same_failure_once() {
    let root = unique_temp_dir("post-tool-ack");
    let transcript = root.join("run.jsonl");
    write_transcript(&transcript, "run the tests");

    let payload = hook_payload(
        &transcript,
        "PostToolUse",
        "Bash",
        serde_json::json!({
            "tool_input": { "command": "cargo test" },
            "tool_response": { "exit_code": 101, "stderr": "test lexer::eof ... FAILED" }
        }),
    );

    let (ok, stdout, stderr) = run_ccguard(&root, &["post-tool"], &payload);
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    let json: Value = serde_json::from_slice(&stdout).expect("json");
    let context = json["hookSpecificOutput"]["additionalContext"]
        .as_str()
        .expect("additional context");
    assert!(context.contains("lexer::eof"));

    let (ok, stdout, _) = run_ccguard(&root, &["post-tool"], &payload);
    assert!(ok);
    assert!(stdout.is_empty(), "acknowledged error is not repeated");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn failed_validation_denies_tools_and_blocks_stop() {
    let root = unique_temp_dir("validate");
    let transcript = root.join("run.jsonl");
    write_transcript(&transcript, "add retry support to the client");
    let transcript_arg = transcript.display().to_string();

    let (ok, _, stderr) = run_ccguard(
        &root,
        &[
            "validate",
            "--transcript",
            &transcript_arg,
            "--status",
            "failed",
            "--tool",
            "Edit",
            "--file",
            "src/client.rs",
            "--reason",
            "retry loop never terminates",
        ],
        "",
    );
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));

    let payload = hook_payload(
        &transcript,
        "PreToolUse",
        "Write",
        serde_json::json!({ "tool_input": { "file_path": "src/other.rs", "content": "x" } }),
    );
    let (ok, stdout, _) = run_ccguard(&root, &["pre-tool"], &payload);
    assert!(ok);
    let json: Value = serde_json::from_slice(&stdout).expect("json");
    assert_eq!(json["hookSpecificOutput"]["permissionDecision"], "deny");
    let reason = json["hookSpecificOutput"]["permissionDecisionReason"]
        .as_str()
        .expect("reason");
    assert!(reason.contains("retry loop never terminates"));

    let stop = hook_payload(&transcript, "Stop", "", serde_json::json!({}));
    let (ok, stdout, _) = run_ccguard(&root, &["stop"], &stop);
    assert!(ok);
    let json: Value = serde_json::from_slice(&stdout).expect("json");
    assert_eq!(json["decision"], "block");

    // A new instruction makes the failure stale.
    write_transcript(&transcript, "forget that, update the README");
    let (ok, stdout, _) = run_ccguard(&root, &["pre-tool"], &payload);
    assert!(ok);
    assert!(stdout.is_empty());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn state_show_and_clear() {
    let root = unique_temp_dir("state");
    let transcript = root.join("run.jsonl");
    write_transcript(&transcript, "deploy");
    let session = transcript.display().to_string();

    let payload = hook_payload(
        &transcript,
        "PostToolUse",
        "Bash",
        serde_json::json!({
            "tool_input": { "command": "make deploy" },
            "tool_response": { "is_error": true, "content": "permission denied" }
        }),
    );
    let (ok, _, _) = run_ccguard(&root, &["post-tool"], &payload);
    assert!(ok);

    let (ok, stdout, stderr) = run_ccguard(&root, &["state", "show", "--session", &session, "--json"], "");
    assert!(ok, "stderr: {}", String::from_utf8_lossy(&stderr));
    let json: Value = serde_json::from_slice(&stdout).expect("json");
    assert_eq!(json["session"].as_str(), Some(session.as_str()));
    let caches = json["caches"].as_array().expect("caches");
    let ack = caches
        .iter()
        .find(|c| c["name"] == "ack")
        .expect("ack cache listed");
    assert_eq!(ack["entries"].as_u64(), Some(1));

    let (ok, stdout, _) = run_ccguard(&root, &["state", "clear", "--session", &session], "");
    assert!(ok);
    assert!(String::from_utf8_lossy(&stdout).contains("Cleared"));

    let (ok, stdout, _) = run_ccguard(&root, &["state", "show", "--session", &session, "--json"], "");
    assert!(ok);
    let json: Value = serde_json::from_slice(&stdout).expect("json");
    assert!(
        json["caches"]
            .as_array()
            .expect("caches")
            .iter()
            .filter(|c| ["escalation", "confirm", "ack", "pending-validation"]
                .contains(&c["name"].as_str().unwrap_or_default()))
            .all(|c| c["entries"].as_u64() == Some(0))
    );

    let _ = fs::remove_dir_all(root);
}

#[test]
fn hook_without_session_is_a_no_op() {
    let root = unique_temp_dir("no-session");
    let (ok, stdout, _) = run_ccguard(&root, &["pre-tool"], r#"{"tool_name":"Bash"}"#);
    assert!(ok);
    assert!(stdout.is_empty());
    let _ = fs::remove_dir_all(root);
}

#[test]
fn malformed_hook_input_exits_nonzero() {
    let root = unique_temp_dir("bad-input");
    let (ok, stdout, stderr) = run_ccguard(&root, &["pre-tool"], "{not json");
    assert!(!ok);
    assert!(stdout.is_empty());
    assert!(String::from_utf8_lossy(&stderr).contains("Invalid hook input JSON"));
    let _ = fs::remove_dir_all(root);
}
