use assert_cmd::Command;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const CART: &str = "package shop;\npublic class Cart {\n    public int computeTotal() {\n        return 0;\n    }\n}\n";

#[allow(deprecated)]
fn lmrisk(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lmrisk").expect("binary");
    cmd.current_dir(workdir)
        .env("LMRISK_SCORER", "stub")
        .env_remove("LMRISK_LANGUAGEMODEL_URL")
        .arg("--quiet");
    cmd
}

fn run_json(workdir: &Path, args: &[&str]) -> Value {
    let output = lmrisk(workdir).args(args).output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn setup_workspace() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::create_dir_all(root.join("assets")).unwrap();
    fs::write(root.join("src/Cart.java"), CART).unwrap();
    fs::write(root.join("notes.txt"), "todo\n").unwrap();
    fs::write(root.join("node_modules/pkg/index.js"), "module.exports = 1;\n").unwrap();
    fs::write(root.join("assets/logo.png"), "not really a png").unwrap();
    temp
}

fn file_paths(report: &Value) -> Vec<String> {
    let mut paths: Vec<String> = report["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|file| file["path"].as_str().unwrap().to_string())
        .collect();
    paths.sort();
    paths
}

#[test]
fn scan_reports_scored_files_without_excluded_ones() {
    let temp = setup_workspace();
    let report = run_json(temp.path(), &["scan"]);

    assert_eq!(file_paths(&report), vec!["root/notes.txt", "root/src/Cart.java"]);
    assert_eq!(report["policy"], "Average");
    assert_eq!(report["scoring"]["scored"], 2);
    assert_eq!(report["stats"]["pruned_directories"], 1);
    assert!(report["root_risk"].as_f64().unwrap() > 0.0);
}

#[test]
fn scan_policy_flag_changes_aggregation() {
    let temp = setup_workspace();
    let average = run_json(temp.path(), &["scan"]);
    let maximum = run_json(temp.path(), &["scan", "--policy", "Maximum"]);

    assert_eq!(maximum["policy"], "Maximum");
    assert!(maximum["root_risk"].as_f64().unwrap() >= average["root_risk"].as_f64().unwrap());
}

#[test]
fn scan_markdown_lists_riskiest_files() {
    let temp = setup_workspace();
    let output = lmrisk(temp.path())
        .args(["scan", "--markdown"])
        .output()
        .expect("command run");
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.starts_with("# Risk report"));
    assert!(text.contains("| `root/src/Cart.java` |"));
}

#[test]
fn config_file_overrides_exclusions_and_policy() {
    let temp = setup_workspace();
    fs::write(
        temp.path().join("lmrisk.toml"),
        "[exclude]\ndirectories = [\"node_modules\", \"src\"]\n\n[general]\npolicy = \"Median\"\n",
    )
    .unwrap();
    let report = run_json(temp.path(), &["scan"]);

    assert_eq!(file_paths(&report), vec!["root/notes.txt"]);
    assert_eq!(report["policy"], "Median");
}

#[test]
fn invalid_scorer_is_rejected() {
    let temp = setup_workspace();
    lmrisk(temp.path())
        .env("LMRISK_SCORER", "grpc")
        .arg("scan")
        .assert()
        .failure()
        .stderr(predicates::str::contains("LMRISK_SCORER"));
}

#[test]
fn search_reports_only_matching_lines() {
    let temp = setup_workspace();
    let report = run_json(temp.path(), &["search", "computeTotal"]);

    assert_eq!(report["files_searched"], 2);
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["path"], "root/src/Cart.java");
    let matches = files[0]["matches"].as_object().unwrap();
    assert_eq!(matches.keys().collect::<Vec<_>>(), vec!["2"]);
    assert!(matches["2"]["difference"].as_f64().unwrap() > 20.0);
}

#[test]
fn lines_reports_buckets_and_hover() {
    let temp = setup_workspace();
    let report = run_json(
        temp.path(),
        &["lines", "src/Cart.java", "--line", "0", "--column", "0"],
    );

    assert_eq!(report["language_id"], "java");
    assert_eq!(report["unsupported"], false);
    assert_eq!(report["line_entropy"][0], 2.5);
    assert_eq!(report["gutter"].as_array().unwrap().len(), 6);
    assert_eq!(report["folding"][0]["start"], 0);
    assert!(report["hover"]
        .as_str()
        .unwrap()
        .starts_with("Line entropy: 2.500 - Token 'package'"));
}

#[test]
fn complete_proposes_longest_words_first() {
    let temp = setup_workspace();
    let report = run_json(
        temp.path(),
        &["complete", "src/Cart.java", "--line", "3", "--column", "14"],
    );
    assert_eq!(report["proposals"][0]["text"], "computeTotal");
}

#[test]
fn codelens_titles_methods() {
    let temp = setup_workspace();
    let lenses = run_json(temp.path(), &["codelens", "src/Cart.java"]);
    let lenses = lenses.as_array().unwrap();

    assert_eq!(lenses.len(), 1);
    assert_eq!(lenses[0]["line"], 2);
    assert_eq!(lenses[0]["subject"], "shop.Cart.computeTotal()");
    assert!(lenses[0]["title"]
        .as_str()
        .unwrap()
        .starts_with("24 calls in the last 30 days - 0 fails"));
}

#[test]
fn coverage_colors_each_line() {
    let temp = setup_workspace();
    let lines = run_json(temp.path(), &["coverage", "notes.txt"]);
    assert_eq!(lines[0]["covered"], true);
    assert_eq!(lines[0]["color"], "rgba(0,255,0,0.2)");
}

#[test]
fn cache_writes_gutter_icons_and_minimaps() {
    let temp = setup_workspace();
    let report = run_json(temp.path(), &["cache"]);

    assert_eq!(report["gutter_icons"].as_array().unwrap().len(), 6);
    assert_eq!(report["minimaps"], 2);
    assert_eq!(report["thumbnails"], 0);
    let cache = temp.path().join(".lmrisk/cache");
    assert!(cache.join("gutter/gutter_0.svg").is_file());
    assert_eq!(fs::read_dir(cache.join("minimap")).unwrap().count(), 2);
}
