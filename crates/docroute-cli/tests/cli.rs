use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `docroute` isolated from the user's config directory and `.env`.
fn docroute(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("docroute").expect("bin");
    cmd.current_dir(home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("HOME", home)
        .env_remove("PARSEUR_API_KEY")
        .env_remove("DOCUPIPE_API_KEY");
    cmd
}

fn home() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

#[test]
fn help_lists_commands() {
    let home = home();
    docroute(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("suppliers"));
}

#[test]
fn suppliers_list_shows_builtin_registry() {
    let home = home();
    docroute(home.path())
        .args(["suppliers", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("soares"))
        .stdout(predicate::str::contains("501496912"))
        .stdout(predicate::str::contains("66 suppliers"));
}

#[test]
fn suppliers_show_unknown_fails() {
    let home = home();
    docroute(home.path())
        .args(["suppliers", "show", "nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown supplier"));
}

#[test]
fn suppliers_check_rejects_duplicate_tax_ids() {
    let home = home();
    let registry = home.path().join("registry.json");
    fs::write(
        &registry,
        r#"{"suppliers": [
            {"identity": "a", "display_name": "A", "tax_id": "501496912", "keywords": ["a"],
             "document_class": "invoice", "target": {"api": "parseur", "mailbox_id": "1"}},
            {"identity": "b", "display_name": "B", "tax_id": "501 496 912", "keywords": ["b"],
             "document_class": "receipt", "target": {"api": "docupipe"}}
        ]}"#,
    )
    .unwrap();

    docroute(home.path())
        .args(["suppliers", "check", "--registry"])
        .arg(&registry)
        .assert()
        .failure()
        .stderr(predicate::str::contains("501496912"));
}

#[test]
fn config_init_set_get() {
    let home = home();
    let config = home.path().join("docroute.json");

    docroute(home.path())
        .args(["config", "init", "--output"])
        .arg(&config)
        .assert()
        .success();
    assert!(config.exists());

    docroute(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "dates.min_year", "2018"])
        .assert()
        .success();

    docroute(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "dates.min_year"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2018"));

    docroute(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "dates.nonsense", "1"])
        .assert()
        .failure();
}

#[test]
fn process_empty_folder() {
    let home = home();
    let inbox = home.path().join("inbox");
    fs::create_dir(&inbox).unwrap();

    docroute(home.path())
        .args(["process", "--dry-run"])
        .arg(&inbox)
        .assert()
        .success()
        .stdout(predicate::str::contains("No PDF files"));
}

#[test]
fn process_reports_unreadable_pdf_and_leaves_it() {
    let home = home();
    let inbox = home.path().join("inbox");
    fs::create_dir(&inbox).unwrap();
    fs::write(inbox.join("broken.pdf"), b"definitely not a pdf").unwrap();
    let summary = home.path().join("summary.csv");

    docroute(home.path())
        .arg("process")
        .arg(&inbox)
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success()
        .stdout(predicate::str::contains("broken.pdf"))
        .stdout(predicate::str::contains("1 failed"));

    assert!(inbox.join("broken.pdf").exists());
    assert!(!inbox.join(".docroute.lock").exists());
    let csv = fs::read_to_string(&summary).unwrap();
    assert!(csv.starts_with("filename,supplier,method"));
    assert!(csv.contains("broken.pdf"));
}

#[test]
fn process_locked_folder_fails() {
    let home = home();
    let inbox = home.path().join("inbox");
    fs::create_dir(&inbox).unwrap();
    fs::write(inbox.join(".docroute.lock"), "pid=1").unwrap();

    docroute(home.path())
        .arg("process")
        .arg(&inbox)
        .assert()
        .failure()
        .stderr(predicate::str::contains("locked"));
}

#[test]
fn uploads_without_ledger_fails() {
    let home = home();
    docroute(home.path())
        .args(["uploads", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pending_uploads"));
}
