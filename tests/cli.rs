use assert_cmd::prelude::*;
use color_eyre::Result;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Command;

fn write_json(dir: &Path, name: &str, value: &Value) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(value)?)?;
    Ok(path)
}

fn stdout_lines(output: &std::process::Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("stdout line is not JSON"))
        .collect()
}

fn sprig() -> Result<Command> {
    let mut cmd = Command::cargo_bin("sprig")?;
    cmd.env_remove("SPRIG_CONFIG").env("RUST_LOG", "warn");
    Ok(cmd)
}

#[test]
fn test_run_prints_effects_in_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let flow = write_json(
        dir.path(),
        "flow.json",
        &json!({"steps": [
            {"type": "Action.showToast", "message": "Hello @{name}"},
            {"type": "copyToClipBoard", "message": "@{upper(name)}"},
            {"type": "Action.navigateToPage", "pageId": "profile", "args": {"id": "@{id}"}},
        ]}),
    )?;
    let scope = write_json(dir.path(), "scope.json", &json!({"name": "Ada", "id": 7}))?;

    let output = sprig()?
        .arg("run")
        .arg(&flow)
        .arg("--scope")
        .arg(&scope)
        .output()?;
    assert!(
        output.status.success(),
        "sprig run failed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["effect"], json!("showToast"));
    assert_eq!(lines[0]["message"], json!("Hello Ada"));
    assert_eq!(lines[1], json!({"effect": "copyToClipboard", "text": "ADA"}));
    assert_eq!(lines[2]["pageId"], json!("profile"));
    assert_eq!(lines[2]["args"], json!({"id": 7}));
    Ok(())
}

#[test]
fn test_run_updates_state() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let flow = write_json(
        dir.path(),
        "flow.json",
        &json!([
            {"type": "setState", "updates": [{"stateName": "count", "newValue": "@{count + 1}"}]},
            {"type": "showToast", "message": "count=@{count}"},
        ]),
    )?;
    let state = write_json(dir.path(), "state.json", &json!({"count": 41}))?;

    let output = sprig()?
        .args(["run", "--dump-state", "--state"])
        .arg(&state)
        .arg(&flow)
        .output()?;
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines[0]["message"], json!("count=42"));
    assert_eq!(lines[1], json!({"state": {"page": {"count": 42}}}));
    Ok(())
}

#[test]
fn test_run_prints_listened_messages() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let flow = write_json(
        dir.path(),
        "flow.json",
        &json!([
            {"type": "postMessage", "name": "cart", "payload": {"items": 2}},
            {"type": "postMessage", "name": "ignored", "payload": null},
        ]),
    )?;

    let output = sprig()?
        .args(["run", "--listen", "cart"])
        .arg(&flow)
        .output()?;
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["message"]["name"], json!("cart"));
    assert_eq!(lines[0]["message"]["payload"], json!({"items": 2}));
    Ok(())
}

#[test]
fn test_run_failed_request_runs_on_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let flow = write_json(
        dir.path(),
        "flow.json",
        &json!([{
            "type": "callRestApi",
            "dataSource": {"url": "http://127.0.0.1:9/users"},
            "onSuccess": [{"type": "showToast", "message": "online"}],
            "onError": [{"type": "showToast", "message": "offline"}],
        }]),
    )?;

    let output = sprig()?.arg("run").arg(&flow).output()?;
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines[0]["effect"], json!("httpRequest"));
    assert_eq!(lines[0]["method"], json!("GET"));
    assert_eq!(lines[1]["message"], json!("offline"));
    assert_eq!(lines.len(), 2);
    Ok(())
}

#[test]
fn test_run_events_go_to_stderr() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let flow = write_json(
        dir.path(),
        "flow.json",
        &json!([{"type": "showToast", "message": "hi", "disableActionIf": "@{true}"}]),
    )?;

    sprig()?
        .args(["run", "--events"])
        .arg(&flow)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("\"event\":\"actionSkipped\""))
        .stderr(predicate::str::contains("\"event\":\"flowCompleted\""));
    Ok(())
}

#[test]
fn test_run_drives_registered_timer() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let flow = write_json(
        dir.path(),
        "flow.json",
        &json!([
            {"type": "controlObject", "object": "clock", "method": "start"},
            {"type": "controlObject", "object": "clock", "method": "cancel"},
        ]),
    )?;

    sprig()?
        .args(["run", "--events", "--timer", "clock=50"])
        .arg(&flow)
        .assert()
        .success()
        .stderr(predicate::str::contains("\"event\":\"actionCompleted\""))
        .stderr(predicate::str::contains("\"event\":\"actionFailed\"").not());

    sprig()?
        .args(["run", "--events"])
        .arg(&flow)
        .assert()
        .success()
        .stderr(predicate::str::contains("\"event\":\"actionFailed\""));

    sprig()?
        .args(["run", "--timer", "clock=0"])
        .arg(&flow)
        .assert()
        .failure();
    Ok(())
}

#[test]
fn test_check_reports_dropped_steps() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let flow = write_json(
        dir.path(),
        "flow.json",
        &json!({"steps": [
            {"type": "Action.teleport", "to": "mars"},
            {"type": "showToast", "message": "kept"},
            {"message": "no type"},
        ]}),
    )?;

    sprig()?
        .args(["check", "--unknown-actions", "drop"])
        .arg(&flow)
        .assert()
        .success()
        .stdout(predicate::str::contains("Action.showToast"))
        .stdout(predicate::str::contains("Action.teleport").not())
        .stderr(predicate::str::contains("2 of 3 steps dropped"));

    sprig()?
        .args(["check", "--unknown-actions", "fallback"])
        .arg(&flow)
        .assert()
        .success()
        .stdout(predicate::str::contains("Action.teleport"))
        .stderr(predicate::str::contains("1 of 3 steps dropped"));
    Ok(())
}

#[test]
fn test_check_reads_config_from_env() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let flow = write_json(dir.path(), "flow.json", &json!([{"type": "Action.teleport"}]))?;
    let config = dir.path().join("sprig.yaml");
    std::fs::write(&config, "unknown_actions: drop\n")?;

    let output = sprig()?
        .env("SPRIG_CONFIG", &config)
        .arg("check")
        .arg(&flow)
        .output()?;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "null");
    assert!(String::from_utf8_lossy(&output.stderr).contains("1 of 1 steps dropped"));
    Ok(())
}

#[test]
fn test_invalid_flow_document_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let flow = dir.path().join("broken.json");
    std::fs::write(&flow, "{ not json")?;

    sprig()?
        .arg("run")
        .arg(&flow)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not valid JSON"));
    Ok(())
}

#[test]
fn test_invalid_config_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let flow = write_json(dir.path(), "flow.json", &json!([]))?;
    let config = dir.path().join("sprig.yaml");
    std::fs::write(&config, "bus_capacity: 0\n")?;

    sprig()?
        .arg("check")
        .arg(&flow)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config"));
    Ok(())
}
