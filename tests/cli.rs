use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use docs_portal_core::context::NO_CONTEXT_PLACEHOLDER;

fn portal_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_portal"))
}

fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs_dir = root.join("docs");
    fs::create_dir_all(docs_dir.join("guides")).unwrap();
    fs::write(
        docs_dir.join("welcome.md"),
        "# Welcome\n\nStart here to learn about the portal.",
    )
    .unwrap();
    fs::write(
        docs_dir.join("guides/deploy.md"),
        "# Deploy\n\nDeployment uses the release pipeline.",
    )
    .unwrap();
    fs::write(
        docs_dir.join("guides/setup.md"),
        "---\ntitle: Setup\n---\nInstall the CLI tool before deployment.",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/portal.sqlite"

[search]
max_results = 20

[chat]
api_key_env = "DOCS_PORTAL_CLI_TEST_UNSET_KEY"
"#,
        root.display()
    );

    let config_path = config_dir.join("portal.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path, docs_dir)
}

fn run_portal(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = portal_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("DOCS_PORTAL_CLI_TEST_UNSET_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run portal binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn init_and_import(config: &Path, docs: &Path) {
    let (_, stderr, ok) = run_portal(config, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    let (stdout, stderr, ok) = run_portal(config, &["import", docs.to_str().unwrap()]);
    assert!(ok, "import failed: {}", stderr);
    assert!(stdout.contains("1 folders created"), "{}", stdout);
    assert!(stdout.contains("3 documents created"), "{}", stdout);
}

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config, _) = setup_test_env();
    let (stdout, stderr, ok) = run_portal(&config, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully."));

    let (_, stderr, ok) = run_portal(&config, &["init"]);
    assert!(ok, "second init failed: {}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, ok) = run_portal(&tmp.path().join("absent.toml"), &["tree"]);
    assert!(!ok);
    assert!(!stderr.is_empty());
}

#[test]
fn test_import_then_search() {
    let (_tmp, config, docs) = setup_test_env();
    init_and_import(&config, &docs);

    let (stdout, stderr, ok) = run_portal(&config, &["search", "deploy"]);
    assert!(ok, "search failed: {}", stderr);
    let lines: Vec<&str> = stdout.lines().filter(|l| !l.starts_with(' ')).collect();
    assert_eq!(lines.len(), 2, "{}", stdout);
    assert!(lines[0].contains("Deploy (guides/deploy)"), "{}", stdout);
    assert!(lines[1].contains("Setup (guides/setup)"), "{}", stdout);

    let (stdout, _, ok) = run_portal(&config, &["search", "deploy", "--limit", "1"]);
    assert!(ok);
    assert_eq!(stdout.lines().filter(|l| !l.starts_with(' ')).count(), 1);

    let (stdout, _, ok) = run_portal(&config, &["search", "kubernetes"]);
    assert!(ok);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_reimport_updates_in_place() {
    let (_tmp, config, docs) = setup_test_env();
    init_and_import(&config, &docs);

    let (stdout, stderr, ok) = run_portal(&config, &["import", docs.to_str().unwrap()]);
    assert!(ok, "re-import failed: {}", stderr);
    assert!(stdout.contains("0 folders created"), "{}", stdout);
    assert!(stdout.contains("0 documents created, 3 updated"), "{}", stdout);
}

#[test]
fn test_context_for_folder_and_document() {
    let (_tmp, config, docs) = setup_test_env();
    init_and_import(&config, &docs);

    let (stdout, stderr, ok) = run_portal(&config, &["context", "guides"]);
    assert!(ok, "context failed: {}", stderr);
    assert!(stdout.contains("## Deploy\n"), "{}", stdout);
    assert!(stdout.contains("\n\n---\n\n## Setup\n"), "{}", stdout);
    assert!(!stdout.contains("## Welcome"), "{}", stdout);

    let (stdout, _, ok) = run_portal(&config, &["context", "welcome"]);
    assert!(ok);
    assert!(stdout.starts_with("## Welcome\n"), "{}", stdout);

    let (stdout, _, ok) = run_portal(&config, &["context", "guides/missing"]);
    assert!(ok);
    assert_eq!(stdout.trim_end(), NO_CONTEXT_PLACEHOLDER);
}

#[test]
fn test_tree_lists_folders_before_documents() {
    let (_tmp, config, docs) = setup_test_env();
    init_and_import(&config, &docs);

    let (stdout, stderr, ok) = run_portal(&config, &["tree"]);
    assert!(ok, "tree failed: {}", stderr);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Guides/  (guides)",
            "  Deploy  (guides/deploy)",
            "  Setup  (guides/setup)",
            "Welcome  (welcome)",
        ]
    );
}

#[test]
fn test_ask_without_credential_fails() {
    let (_tmp, config, docs) = setup_test_env();
    init_and_import(&config, &docs);

    let (_, _, ok) = run_portal(&config, &["ask", "How do I deploy?"]);
    assert!(!ok);

    let (_, stderr, ok) = run_portal(&config, &["ask", "   "]);
    assert!(!ok);
    assert!(!stderr.is_empty());
}

#[test]
fn test_process_pdfs_with_nothing_pending() {
    let (_tmp, config, _) = setup_test_env();
    run_portal(&config, &["init"]);

    let (stdout, stderr, ok) = run_portal(&config, &["process-pdfs"]);
    assert!(ok, "process-pdfs failed: {}", stderr);
    assert!(stdout.contains("Processed 0 PDFs, 0 errors (0 pending)"), "{}", stdout);
}
