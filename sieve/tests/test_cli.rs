use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};
use similar_asserts::assert_eq;

struct Sieve {
    dir: tempfile::TempDir,
}

impl Sieve {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str], stdin: Option<&Value>) -> Output {
        let mut child = Command::new(env!("CARGO_BIN_EXE_sieve"))
            .arg("--config")
            .arg(self.path())
            .args(args)
            .env_remove("SIEVE_CONFIG")
            .env_remove("SIEVE_PROJECT")
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let mut input = child.stdin.take().unwrap();
        if let Some(value) = stdin {
            input.write_all(value.to_string().as_bytes()).unwrap();
        }
        drop(input);

        child.wait_with_output().unwrap()
    }

    fn json(&self, args: &[&str], stdin: Option<&Value>) -> Value {
        let output = self.run(args, stdin);
        assert!(
            output.status.success(),
            "sieve failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn release_rule(release: &str, sample_rate: f64) -> Value {
    json!({
        "type": "error",
        "conditions": [
            {"category": "release", "operator": "glob", "values": [release]}
        ],
        "sampleRate": sample_rate,
    })
}

#[test]
fn test_categories_of_tracing_rules() {
    let sieve = Sieve::new();
    let categories = sieve.json(&["categories", "--type", "transaction", "--tracing"], None);

    assert_eq!(
        categories,
        json!(["release", "environment", "userId", "userSegment", "transactions"])
    );
}

#[test]
fn test_add_and_show() {
    let sieve = Sieve::new();

    let rule = sieve.json(&["-p", "42", "add"], Some(&release_rule("1.*", 0.2)));
    assert_eq!(rule["id"], json!(1));
    assert_eq!(rule["sampleRate"], json!(0.2));

    let stored = sieve.path().join("rules").join("42.json");
    assert!(stored.exists());

    let config = sieve.json(&["-p", "42", "show"], None);
    assert_eq!(config["next_id"], json!(2));
    assert_eq!(config["rules"][0]["type"], json!("error"));
    assert_eq!(
        config["rules"][0]["condition"]["inner"][0],
        json!({"op": "glob", "name": "event.release", "value": ["1.*"]})
    );
}

#[test]
fn test_rejected_rule_is_not_stored() {
    let sieve = Sieve::new();
    let mut rule = release_rule("1.*", 0.2);
    rule["sampleRate"] = json!(1.5);

    let output = sieve.run(&["-p", "7", "add"], Some(&rule));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid rule"));
    assert!(!sieve.path().join("rules").join("7.json").exists());
}

#[test]
fn test_validate_does_not_store() {
    let sieve = Sieve::new();

    let rule = sieve.json(&["-p", "3", "validate"], Some(&release_rule("2.*", 0.5)));
    assert_eq!(rule["id"], json!(1));
    assert!(!sieve.path().join("rules").join("3.json").exists());
}

#[test]
fn test_remove_keeps_ids_unique() {
    let sieve = Sieve::new();

    sieve.json(&["-p", "1", "add"], Some(&release_rule("1.*", 0.2)));
    sieve.json(&["-p", "1", "remove", "--id", "1"], None);
    let rule = sieve.json(&["-p", "1", "add"], Some(&release_rule("2.*", 0.2)));

    assert_eq!(rule["id"], json!(2));
}

#[test]
fn test_reorder_and_disable() {
    let sieve = Sieve::new();

    sieve.json(&["-p", "5", "add"], Some(&release_rule("1.*", 0.2)));
    sieve.json(&["-p", "5", "add"], Some(&release_rule("2.*", 0.4)));

    let config = sieve.json(&["-p", "5", "reorder", "--type", "error", "2", "1"], None);
    assert_eq!(config["rules"][0]["id"], json!(2));
    assert_eq!(config["rules"][1]["id"], json!(1));

    let config = sieve.json(&["-p", "5", "disable"], None);
    assert_eq!(config, json!({"rules": [], "next_id": 3}));
}

#[test]
fn test_evaluate_event() {
    let sieve = Sieve::new();
    sieve.json(&["-p", "9", "add"], Some(&release_rule("1.*", 1.0)));

    let event = json!({
        "event_id": "4a1d5c7e8f2b4a6c9d3e1f0a2b4c6d8e",
        "type": "error",
        "release": "1.2.3",
    });
    let event_path = sieve.path().join("event.json");
    fs::write(&event_path, event.to_string()).unwrap();

    let report = sieve.json(
        &["-p", "9", "evaluate", event_path.to_str().unwrap()],
        None,
    );
    assert_eq!(report["kind"], json!("error"));
    assert_eq!(report["matched"], json!(true));
    assert_eq!(report["rule"]["id"], json!(1));
    assert_eq!(report["decision"], json!("keep"));

    let unmatched = json!({"type": "error", "release": "2.0.0"});
    let report = sieve.json(&["-p", "9", "evaluate"], Some(&unmatched));
    assert_eq!(report, json!({"kind": "error", "matched": false}));
}

#[test]
fn test_missing_project() {
    let sieve = Sieve::new();
    let output = sieve.run(&["show"], None);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--project"));
}
