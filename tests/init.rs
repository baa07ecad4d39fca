use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_herald"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "herald init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".herald.toml");
    assert!(config_path.exists(), ".herald.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    for section in ["[azure]", "[slack]", "[llm]", "[review]"] {
        assert!(content.contains(section), "missing {section}");
    }

    // Everything is commented out, so parsing yields the defaults.
    let config: herald_core::HeraldConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.review.max_comments_per_file, 3);
    assert!(config.azure.pat.is_none());
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".herald.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_herald"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let kept = std::fs::read_to_string(dir.path().join(".herald.toml")).unwrap();
    assert_eq!(kept, "# existing");
}

#[test]
fn review_without_configuration_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_herald"))
        .args(["review", "42"])
        .current_dir(dir.path())
        .env_remove("AZURE_DEVOPS_ORG_URL")
        .env_remove("AZURE_DEVOPS_DEFAULT_PROJECT")
        .env_remove("AZURE_DEVOPS_PAT")
        .env_remove("OPENAI_API_KEY")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("AZURE_DEVOPS_ORG_URL"), "stderr: {stderr}");
}

#[test]
fn completions_mention_subcommands() {
    let output = Command::new(env!("CARGO_BIN_EXE_herald"))
        .args(["completions", "bash"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let script = String::from_utf8_lossy(&output.stdout);
    assert!(script.contains("herald"));
    assert!(script.contains("review"));
}
