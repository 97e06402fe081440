use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

/// Test context that sets up a temporary skillet home and project.
struct TestContext {
    temp_dir: TempDir,
    home: PathBuf,
    project: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let home = temp_dir.path().join(".skillet");
        let project = temp_dir.path().join("project");
        std::fs::create_dir_all(&home).expect("failed to create home");
        std::fs::create_dir_all(&project).expect("failed to create project");
        Self {
            temp_dir,
            home,
            project,
        }
    }

    fn skillet_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_skillet");
        let mut cmd = Command::new(bin_path);
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("SKILLET_HOME", &self.home);
        cmd.arg("--project").arg(&self.project);
        cmd
    }
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx
        .skillet_cmd()
        .arg("--help")
        .output()
        .expect("failed to run skillet");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx
        .skillet_cmd()
        .arg("--version")
        .output()
        .expect("failed to run skillet");
    assert!(output.status.success());
}

#[test]
fn test_list_empty_workspace() {
    let ctx = TestContext::new();
    let output = ctx
        .skillet_cmd()
        .arg("list")
        .output()
        .expect("failed to run skillet list");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No packages installed"));
}

#[test]
fn test_doctor_clean_workspace() {
    let ctx = TestContext::new();
    let output = ctx
        .skillet_cmd()
        .arg("doctor")
        .output()
        .expect("failed to run skillet doctor");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("staging: clean"));
}

#[test]
fn test_search_without_registries() {
    let ctx = TestContext::new();
    let output = ctx
        .skillet_cmd()
        .arg("search")
        .arg("ripgrep")
        .output()
        .expect("failed to run skillet search");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No packages found"));
}

#[test]
fn test_install_unknown_package_fails_cleanly() {
    let ctx = TestContext::new();
    let output = ctx
        .skillet_cmd()
        .arg("install")
        .arg("ghost")
        .output()
        .expect("failed to run skillet install");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"));
    // Nothing was written to the project.
    assert!(!ctx.project.join("skillet.lock").exists());
}

#[test]
fn test_registry_add_list_remove() {
    let ctx = TestContext::new();
    let registry_dir = ctx.temp_dir.path().join("registry");

    let output = ctx
        .skillet_cmd()
        .args(["registry", "add", "main"])
        .arg(&registry_dir)
        .output()
        .expect("failed to run skillet registry add");
    assert!(output.status.success());

    let output = ctx
        .skillet_cmd()
        .args(["registry", "list"])
        .output()
        .expect("failed to run skillet registry list");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("main"));

    let output = ctx
        .skillet_cmd()
        .args(["registry", "remove", "main"])
        .output()
        .expect("failed to run skillet registry remove");
    assert!(output.status.success());
}

#[test]
fn test_publish_then_install_round_trip() {
    let ctx = TestContext::new();
    let registry_dir = ctx.temp_dir.path().join("registry");

    // Author a package.
    let pkg = ctx.temp_dir.path().join("pkg");
    std::fs::create_dir_all(pkg.join("prompts")).unwrap();
    std::fs::write(pkg.join("prompts/triage.md"), "# Triage\n").unwrap();
    std::fs::write(
        pkg.join("skillet.toml"),
        r#"
name = "triage"
version = "1.0.0"
description = "Issue triage prompt"

[[artifacts.prompts]]
name = "triage"
path = "prompts/triage.md"
"#,
    )
    .unwrap();

    let output = ctx
        .skillet_cmd()
        .args(["registry", "add", "main"])
        .arg(&registry_dir)
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = ctx
        .skillet_cmd()
        .arg("publish")
        .arg(&pkg)
        .output()
        .expect("failed to run skillet publish");
    assert!(
        output.status.success(),
        "publish failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let output = ctx
        .skillet_cmd()
        .args(["install", "triage"])
        .output()
        .expect("failed to run skillet install");
    assert!(
        output.status.success(),
        "install failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(ctx.project.join("skillet.lock").exists());
    assert!(ctx.project.join(".agents/prompts/triage.md").exists());

    // Verify reports a clean install.
    let output = ctx
        .skillet_cmd()
        .args(["verify", "triage"])
        .output()
        .expect("failed to run skillet verify");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("ok"));
}
