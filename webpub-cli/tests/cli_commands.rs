use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn webpub(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("webpub").expect("webpub binary");
    cmd.env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(home: &TempDir, yaml: &str) {
    let dir = home.path().join(".webpub");
    std::fs::create_dir_all(&dir).expect("mkdir .webpub");
    std::fs::write(dir.join("config.yaml"), yaml).expect("write config");
}

#[test]
fn bind_then_list_bindings() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    std::fs::create_dir_all(workspace.path().join("web")).unwrap();

    webpub(&home)
        .current_dir(workspace.path())
        .args(["bind", "web", "--remote", "new_/web", "--package", "contoso_core"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bound folder"));

    assert!(workspace.path().join(".webpub/bindings.json").exists());

    webpub(&home)
        .current_dir(workspace.path())
        .arg("bindings")
        .assert()
        .success()
        .stdout(predicate::str::contains("new_/web").and(predicate::str::contains("contoso_core")));
}

#[test]
fn bind_rejects_missing_path() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    webpub(&home)
        .current_dir(workspace.path())
        .args(["bind", "nope.js", "--remote", "x.js", "--package", "Default"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn unbind_unknown_path_is_not_an_error() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    webpub(&home)
        .current_dir(workspace.path())
        .args(["unbind", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No binding declared"));
}

#[test]
fn env_add_then_list() {
    let home = TempDir::new().unwrap();

    webpub(&home)
        .args(["env", "add", "dev", "--url", "https://contoso-dev.example.com/", "--no-create"])
        .assert()
        .success();

    webpub(&home)
        .args(["env", "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("https://contoso-dev.example.com")
                .and(predicate::str::contains("WEBPUB_TOKEN")),
        );

    webpub(&home)
        .args(["env", "add", "DEV", "--url", "https://other.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already configured"));
}

#[test]
fn publish_without_config_fails() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    webpub(&home)
        .current_dir(workspace.path())
        .args(["publish", "web", "--env", "dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn publish_unknown_environment_lists_known_ones() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write_config(&home, "environments:\n  - name: dev\n    url: https://dev.example.com\n");

    webpub(&home)
        .current_dir(workspace.path())
        .args(["publish", "web", "--env", "prod"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("known: dev"));
}

#[test]
fn publish_unbound_path_fails() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write_config(&home, "environments:\n  - name: dev\n    url: https://dev.example.com\n");
    std::fs::write(workspace.path().join("a.js"), "x").unwrap();

    webpub(&home)
        .current_dir(workspace.path())
        .args(["publish", "a.js", "--env", "dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no binding covers"));
}

#[test]
fn publish_without_token_fails_before_network() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write_config(
        &home,
        "environments:\n  - name: dev\n    url: https://dev.invalid\n    token_env: WEBPUB_CLI_TEST_TOKEN\n",
    );
    std::fs::write(workspace.path().join("a.js"), "x").unwrap();

    webpub(&home)
        .current_dir(workspace.path())
        .args(["bind", "a.js", "--remote", "new_/a.js", "--package", "Default"])
        .assert()
        .success();

    webpub(&home)
        .current_dir(workspace.path())
        .env_remove("WEBPUB_CLI_TEST_TOKEN")
        .args(["publish", "a.js", "--env", "dev", "--no-cache"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("WEBPUB_CLI_TEST_TOKEN"));
}
