#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tour(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tour").unwrap();
    cmd.current_dir(dir.path()).env("TOUR_ROOT", dir.path());
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.arg("--json").assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

const TOURS: &str = r##"
- id: welcome
  name: Welcome
  priority: 10
  targeting:
    urlTargeting:
      mode: whitelist
      patterns:
        - type: wildcard
          value: "https://app.example.com/dashboard*"
- id: mobile-tips
  kind: tip
  targeting:
    devices: [mobile]
- id: inbox
  targeting:
    elementTargeting:
      selector: "#conversations"
- id: promo
  kind: banner
  frequency:
    type: once_per_session
"##;

fn write_tours(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("tours.yaml");
    std::fs::write(&path, TOURS).unwrap();
    path
}

fn verdicts(v: &serde_json::Value) -> Vec<(String, String, Option<String>)> {
    v["tours"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| {
            (
                t["id"].as_str().unwrap().to_string(),
                t["verdict"].as_str().unwrap().to_string(),
                t["reason"].as_str().map(str::to_string),
            )
        })
        .collect()
}

fn reason_for(v: &serde_json::Value, id: &str) -> Option<String> {
    verdicts(v)
        .into_iter()
        .find(|(tid, _, _)| tid == id)
        .and_then(|(_, _, r)| r)
}

// ---------------------------------------------------------------------------
// tour theme
// ---------------------------------------------------------------------------

#[test]
fn theme_list_shows_presets() {
    let dir = TempDir::new().unwrap();
    tour(&dir)
        .args(["theme", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blue"))
        .stdout(predicate::str::contains("navy"))
        .stdout(predicate::str::contains("default"));
}

#[test]
fn theme_show_unknown_fails() {
    let dir = TempDir::new().unwrap();
    tour(&dir)
        .args(["theme", "show", "purple"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown theme: purple"));
}

#[test]
fn theme_show_json() {
    let dir = TempDir::new().unwrap();
    let v = json_output(tour(&dir).args(["theme", "show", "green"]));
    assert_eq!(v["id"], "green");
    assert!(v["colors"]["textSecondary"].is_string());
}

// ---------------------------------------------------------------------------
// tour context
// ---------------------------------------------------------------------------

#[test]
fn context_counts_visits_and_detects_device() {
    let dir = TempDir::new().unwrap();
    let first = json_output(tour(&dir).args([
        "context",
        "--url",
        "https://app.example.com/dashboard",
        "--width",
        "390",
    ]));
    assert_eq!(first["userVisitCount"], 1);
    assert_eq!(first["device"], "mobile");

    let second = json_output(tour(&dir).args([
        "context",
        "--url",
        "https://app.example.com/dashboard",
        "--width",
        "900",
    ]));
    assert_eq!(second["userVisitCount"], 2);
    assert_eq!(second["device"], "tablet");
    assert!(dir.path().join(".tour/local.json").exists());
}

// ---------------------------------------------------------------------------
// tour state
// ---------------------------------------------------------------------------

#[test]
fn state_lifecycle() {
    let dir = TempDir::new().unwrap();
    tour(&dir).args(["state", "start", "welcome"]).assert().success();
    tour(&dir)
        .args(["state", "step", "welcome", "intro", "0"])
        .assert()
        .success();
    tour(&dir)
        .args(["state", "step", "welcome", "intro", "2"])
        .assert()
        .success();

    let v = json_output(tour(&dir).args(["state", "show", "welcome"]));
    assert_eq!(v["state"]["status"], "in_progress");
    assert_eq!(v["state"]["currentStep"], 2);
    assert_eq!(v["state"]["viewCount"], 1);
    assert_eq!(v["state"]["stepHistory"].as_array().unwrap().len(), 1);

    tour(&dir)
        .args(["state", "complete", "welcome"])
        .assert()
        .success()
        .stdout(predicate::str::contains("First completed tour"));

    let v = json_output(tour(&dir).args(["state", "show"]));
    assert_eq!(v["welcome"]["status"], "completed");
}

#[test]
fn state_dismiss_records_step() {
    let dir = TempDir::new().unwrap();
    let v = json_output(tour(&dir).args(["state", "dismiss", "welcome", "--at-step", "3"]));
    assert_eq!(v["state"]["status"], "dismissed");
    assert_eq!(v["state"]["currentStep"], 3);
}

#[test]
fn state_clear_wipes_everything() {
    let dir = TempDir::new().unwrap();
    tour(&dir).args(["state", "start", "a"]).assert().success();
    tour(&dir).args(["state", "complete", "b"]).assert().success();
    tour(&dir).args(["state", "clear"]).assert().success();
    tour(&dir)
        .args(["state", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tour state recorded"));
}

#[test]
fn corrupt_store_does_not_crash() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".tour")).unwrap();
    std::fs::write(dir.path().join(".tour/local.json"), "{not json").unwrap();
    let tours = write_tours(&dir);

    let state = json_output(tour(&dir).args(["state", "start", "welcome"]));
    assert_eq!(state["state"]["status"], "in_progress");
    let v = json_output(tour(&dir).args([
        "check",
        tours.to_str().unwrap(),
        "--url",
        "https://app.example.com/dashboard",
    ]));
    assert_eq!(v["context"]["userVisitCount"], 1);
    assert_eq!(reason_for(&v, "welcome"), None);
}

// ---------------------------------------------------------------------------
// tour check
// ---------------------------------------------------------------------------

#[test]
fn check_reports_reasons() {
    let dir = TempDir::new().unwrap();
    let tours = write_tours(&dir);
    let v = json_output(tour(&dir).args([
        "check",
        tours.to_str().unwrap(),
        "--url",
        "https://app.example.com/contacts",
        "--width",
        "1440",
    ]));
    assert_eq!(v["context"]["device"], "desktop");
    assert_eq!(reason_for(&v, "welcome").as_deref(), Some("url_mismatch"));
    assert_eq!(
        reason_for(&v, "mobile-tips").as_deref(),
        Some("device_mismatch")
    );
    assert_eq!(reason_for(&v, "inbox").as_deref(), Some("element_missing"));
    assert_eq!(reason_for(&v, "promo"), None);
}

#[test]
fn check_honours_elements_and_completion() {
    let dir = TempDir::new().unwrap();
    let tours = write_tours(&dir);
    let check = |dir: &TempDir| {
        json_output(tour(dir).args([
            "check",
            tours.to_str().unwrap(),
            "--url",
            "https://app.example.com/dashboard",
            "--element",
            "#conversations",
        ]))
    };

    let v = check(&dir);
    assert_eq!(reason_for(&v, "welcome"), None);
    assert_eq!(reason_for(&v, "inbox"), None);

    tour(&dir)
        .args(["state", "complete", "welcome"])
        .assert()
        .success();
    let v = check(&dir);
    assert_eq!(reason_for(&v, "welcome").as_deref(), Some("already_seen"));
}

#[test]
fn check_session_flag_and_reset() {
    let dir = TempDir::new().unwrap();
    let tours = write_tours(&dir);
    let check = |dir: &TempDir| {
        json_output(tour(dir).args([
            "check",
            tours.to_str().unwrap(),
            "--url",
            "https://app.example.com/dashboard",
            "--tour",
            "promo",
        ]))
    };

    tour(&dir).args(["state", "seen", "promo"]).assert().success();
    assert_eq!(reason_for(&check(&dir), "promo").as_deref(), Some("already_seen"));

    tour(&dir)
        .args(["session", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session reset"));
    assert_eq!(reason_for(&check(&dir), "promo"), None);
}

#[test]
fn check_unknown_tour_fails() {
    let dir = TempDir::new().unwrap();
    let tours = write_tours(&dir);
    tour(&dir)
        .args([
            "check",
            tours.to_str().unwrap(),
            "--url",
            "/",
            "--tour",
            "missing",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tour not found: missing"));
}

#[test]
fn check_table_output() {
    let dir = TempDir::new().unwrap();
    let tours = write_tours(&dir);
    tour(&dir)
        .args([
            "check",
            tours.to_str().unwrap(),
            "--url",
            "https://app.example.com/dashboard",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("TOUR"))
        .stdout(predicate::str::contains("welcome"))
        .stdout(predicate::str::contains("element_missing"));
}

// ---------------------------------------------------------------------------
// tour config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_defaults_ok() {
    let dir = TempDir::new().unwrap();
    tour(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config OK"));
}

#[test]
fn config_validate_rejects_bad_breakpoints() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".tour")).unwrap();
    std::fs::write(
        dir.path().join(".tour/config.yaml"),
        "viewport:\n  tablet_min_width: 900\n  desktop_min_width: 800\n",
    )
    .unwrap();
    tour(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("desktop_min_width"));
}

#[test]
fn config_validate_reports_invalid_config_error() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".tour")).unwrap();
    std::fs::write(
        dir.path().join(".tour/config.yaml"),
        "storage:\n  key_prefix: \"\"\n",
    )
    .unwrap();
    tour(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config: storage.key_prefix is empty"));
    tour(&dir)
        .args(["state", "start", "welcome"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn config_init_writes_defaults_once() {
    let dir = TempDir::new().unwrap();
    tour(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));
    let raw = std::fs::read_to_string(dir.path().join(".tour/config.yaml")).unwrap();
    assert!(raw.contains("key_prefix: at_tour"));

    tour(&dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    tour(&dir).args(["config", "init", "--force"]).assert().success();
    tour(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config OK"));
}

#[test]
fn custom_prefix_changes_storage_keys() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".tour")).unwrap();
    std::fs::write(
        dir.path().join(".tour/config.yaml"),
        "storage:\n  key_prefix: acme\n",
    )
    .unwrap();
    tour(&dir).args(["state", "start", "welcome"]).assert().success();
    let raw = std::fs::read_to_string(dir.path().join(".tour/local.json")).unwrap();
    assert!(raw.contains("acme_states"));
}
