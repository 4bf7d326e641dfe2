use std::path::{Path, PathBuf};
use std::time::Duration;

use pagesync_core::{Action, Discovery, UpdatePolicy};
use pagesync_daemon::{run, WatchOptions};
use pagesync_store::MemoryStore;
use pagesync_sync::{latest_report, BatchOptions, ChangeDetection, FingerprintStore, Orchestrator};
use tempfile::TempDir;
use tokio::sync::broadcast;

fn write_page(dir: &Path, slug: &str) -> PathBuf {
    let path = dir.join(format!("{slug}.json"));
    std::fs::write(
        &path,
        format!(r#"{{"title":"{slug}","slug":"{slug}","content":"body"}}"#),
    )
    .expect("write page");
    path
}

fn setup(tmp: &TempDir, pages: &[&str], delay: Duration) -> (MemoryStore, Orchestrator<MemoryStore>, Discovery) {
    let docs = tmp.path().join("docs");
    std::fs::create_dir_all(&docs).unwrap();
    for slug in pages {
        write_page(&docs, slug);
    }
    let store = MemoryStore::new();
    let orch = Orchestrator::new(
        store.clone(),
        FingerprintStore::load(tmp.path().join("state/fingerprints.json")),
        BatchOptions {
            delay,
            change_detection: ChangeDetection::Enabled,
            update_policy: UpdatePolicy::Append,
        },
    );
    let discovery = Discovery::new(vec![docs], "*.json", true).unwrap();
    (store, orch, discovery)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_after_first_cycle_returns_summary() {
    let tmp = TempDir::new().unwrap();
    let (store, orch, discovery) = setup(&tmp, &["a", "b"], Duration::ZERO);
    let report_dir = tmp.path().join("reports");
    let options = WatchOptions {
        interval: Duration::from_secs(300),
        report_dir: Some(report_dir.clone()),
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let task = tokio::spawn(run(orch, discovery, options, shutdown_tx.clone()));
    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown_tx.send(()).expect("runtime is listening");

    let summary = task.await.expect("join").expect("watch");
    assert_eq!(summary.cycles, 1);
    let last = summary.last_result.expect("one result");
    assert_eq!(last.count(Action::Created), 2);
    assert!(!last.interrupted);
    assert_eq!(store.pages().len(), 2);
    assert!(tmp.path().join("state/fingerprints.json").exists());
    assert!(latest_report(&report_dir).is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_mid_cycle_keeps_partial_result() {
    let tmp = TempDir::new().unwrap();
    // The pause after the first item gives shutdown time to land mid-cycle.
    let (store, orch, discovery) = setup(&tmp, &["a", "b", "c"], Duration::from_millis(600));
    let options = WatchOptions {
        interval: Duration::from_secs(300),
        report_dir: None,
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let task = tokio::spawn(run(orch, discovery, options, shutdown_tx.clone()));
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown_tx.send(()).expect("runtime is listening");

    let summary = task.await.expect("join").expect("watch");
    let last = summary.last_result.expect("partial result");
    assert!(last.interrupted);
    assert_eq!(last.stats.total, 3);
    assert_eq!(last.results.len(), 1);
    assert_eq!(store.pages().len(), 1);

    let fingerprints = FingerprintStore::load(tmp.path().join("state/fingerprints.json"));
    assert_eq!(fingerprints.len(), 1);
}

#[tokio::test(start_paused = true, flavor = "current_thread")]
async fn interval_drives_repeated_cycles() {
    let tmp = TempDir::new().unwrap();
    let (store, orch, discovery) = setup(&tmp, &["a"], Duration::ZERO);
    let options = WatchOptions {
        interval: Duration::from_secs(300),
        report_dir: None,
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let task = tokio::spawn(run(orch, discovery, options, shutdown_tx.clone()));
    tokio::time::sleep(Duration::from_secs(450)).await;
    shutdown_tx.send(()).expect("runtime is listening");

    let summary = task.await.expect("join").expect("watch");
    assert_eq!(summary.cycles, 2);
    // Second pass sees no changes.
    let last = summary.last_result.expect("result");
    assert_eq!(last.stats.skipped, 1);
    assert_eq!(store.write_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unsaved_fingerprints_do_not_stop_watch_mode() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    std::fs::create_dir_all(&docs).unwrap();
    write_page(&docs, "a");
    // The fingerprint directory path is taken by a regular file.
    let blocker = tmp.path().join("state");
    std::fs::write(&blocker, "").unwrap();
    let store = MemoryStore::new();
    let orch = Orchestrator::new(
        store.clone(),
        FingerprintStore::load(blocker.join("fingerprints.json")),
        BatchOptions {
            delay: Duration::ZERO,
            change_detection: ChangeDetection::Enabled,
            update_policy: UpdatePolicy::Append,
        },
    );
    let discovery = Discovery::new(vec![docs], "*.json", true).unwrap();
    let report_dir = tmp.path().join("reports");
    let options = WatchOptions {
        interval: Duration::from_secs(300),
        report_dir: Some(report_dir.clone()),
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let task = tokio::spawn(run(orch, discovery, options, shutdown_tx.clone()));
    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown_tx.send(()).expect("runtime is listening");

    let summary = task.await.expect("join").expect("watch");
    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.flush_failures, 1);
    let last = summary.last_result.expect("result kept");
    assert_eq!(last.count(Action::Created), 1);
    assert_eq!(store.pages().len(), 1);
    assert!(latest_report(&report_dir).is_some());
}
