use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn debrig() -> Command {
    let mut cmd = Command::cargo_bin("debrig").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("DEBRIG_CONFIG");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    debrig()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("repo"))
        .stdout(predicate::str::contains("python"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn test_version() {
    debrig()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_conflicting_intent_is_a_usage_error() {
    debrig()
        .args(["repo", "llvm", "--replace", "--install"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "--replace cannot be combined with --install or --purge",
        ));
}

#[test]
fn test_python_conflicting_intent_is_a_usage_error() {
    debrig()
        .args(["python", "--replace", "--purge"])
        .assert()
        .code(2);
}

#[test]
fn test_unknown_subcommand_fails() {
    debrig().arg("frobnicate").assert().code(2);
}

#[test]
fn test_missing_config_file() {
    debrig()
        .args(["repo", "llvm", "--install", "--config", "/nonexistent/debrig.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_unknown_profile_lists_available() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    debrig()
        .args(["repo", "nosuch", "--install", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("docker, llvm, postgresql"));
}

#[test]
fn test_invalid_profile_is_rejected_before_touching_the_host() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(
        &config,
        r#"
[repositories.broken]
key_url = "https://example.invalid/{flavour}.asc"
uri = "https://example.invalid/apt"
suite = "{codename}"
components = ["main"]
packages = ["broken"]
purge_patterns = ["^broken"]
"#,
    )
    .unwrap();

    debrig()
        .args(["repo", "broken", "--install", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("broken"));
}

#[test]
fn test_completions_bash() {
    debrig()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("debrig"));
}
