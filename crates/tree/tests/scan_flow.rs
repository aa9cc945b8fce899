use lmrisk_protocol::{AggregationPolicy, RiskLevel};
use lmrisk_tree::{aggregate, FileRisk, ScanOptions, TreeBuilder, WorkspaceWatcher};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn setup_workspace() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    fs::create_dir_all(root.join("src/model")).unwrap();
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(root.join("src/Main.java"), "class Main {\n}\n").unwrap();
    fs::write(root.join("src/model/User.java"), "class User {}").unwrap();
    fs::write(root.join("docs/diagram.png"), [137u8, 80, 78, 71]).unwrap();
    temp
}

#[test]
fn scan_then_aggregate_every_policy() {
    let temp = setup_workspace();
    let mut outcome = TreeBuilder::new(temp.path(), ScanOptions::default())
        .build(1)
        .expect("scan");

    assert!(outcome.tree.find("root/docs").is_none());
    assert_eq!(outcome.pending.len(), 2);

    let main = outcome.tree.find("root/src/Main.java").unwrap();
    let user = outcome.tree.find("root/src/model/User.java").unwrap();
    assert_eq!(outcome.tree.node(main).lines(), 3);
    assert!(outcome.tree.apply_scores(1, main, FileRisk::Lines(vec![1.0, 5.0, 0.0])));
    assert!(outcome.tree.apply_scores(1, user, FileRisk::Lines(vec![4.0])));

    let model = outcome.tree.find("root/src/model").unwrap();
    let src = outcome.tree.find("root/src").unwrap();

    aggregate(&mut outcome.tree, AggregationPolicy::Average);
    assert_eq!(outcome.tree.node(model).risk_level, RiskLevel::Value(4.0));
    assert_eq!(outcome.tree.node(main).risk_level, RiskLevel::Value(2.0));
    assert_eq!(outcome.tree.node(src).risk_level, RiskLevel::Value(3.0));

    aggregate(&mut outcome.tree, AggregationPolicy::Maximum);
    assert_eq!(outcome.tree.node(src).risk_level, RiskLevel::Value(5.0));

    aggregate(&mut outcome.tree, AggregationPolicy::Median);
    // pooled [0, 1, 4, 5] -> index 2
    assert_eq!(outcome.tree.node(src).risk_level, RiskLevel::Value(4.0));
}

#[test]
fn unsupported_file_marks_its_directory() {
    let temp = setup_workspace();
    let mut outcome = TreeBuilder::new(temp.path(), ScanOptions::default())
        .build(2)
        .expect("scan");
    let main = outcome.tree.find("root/src/Main.java").unwrap();
    let user = outcome.tree.find("root/src/model/User.java").unwrap();
    outcome.tree.apply_scores(2, main, FileRisk::Lines(vec![2.0]));
    outcome.tree.apply_scores(2, user, FileRisk::Unsupported);

    aggregate(&mut outcome.tree, AggregationPolicy::Average);
    let model = outcome.tree.find("root/src/model").unwrap();
    assert_eq!(outcome.tree.node(model).risk_level, RiskLevel::NotSupported);
    assert_eq!(
        outcome.tree.node(outcome.tree.root()).risk_level,
        RiskLevel::Value(2.0)
    );
}

#[cfg_attr(
    not(target_os = "linux"),
    ignore = "watcher latency test is only reliable on Linux"
)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watcher_batches_changes_after_debounce() {
    let temp = setup_workspace();
    let mut watcher = match WorkspaceWatcher::start(
        temp.path(),
        ScanOptions::default(),
        Duration::from_millis(150),
    ) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("skipping watcher test: {e}");
            return;
        }
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    let target = temp.path().join("src/Main.java");
    tokio::fs::write(&target, "class Main { int x; }\n")
        .await
        .expect("update file");

    let batch = tokio::time::timeout(Duration::from_secs(5), watcher.next_batch())
        .await
        .expect("debounced batch in time")
        .expect("watcher alive");
    assert!(
        batch.iter().any(|path| path.ends_with("Main.java")),
        "unexpected batch: {batch:?}"
    );
}
