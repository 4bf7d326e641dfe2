//! End-to-end batch behaviour against the in-memory store.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pagesync_core::{Action, Discovery, PageId, RemotePage, UpdatePolicy};
use pagesync_store::{
    AssetMeta, ContentStore, FailOn, MemoryStore, NewPage, PageUpdate, StoreCall, StoreError,
};
use pagesync_sync::{
    BatchOptions, ChangeDetection, FingerprintStore, Orchestrator, StopFlag, SyncError,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json).expect("write content file");
    path
}

fn page(slug: &str, body: &str) -> String {
    format!(r#"{{"title":"Title {slug}","slug":"{slug}","content":"{body}"}}"#)
}

fn options(detection: ChangeDetection) -> BatchOptions {
    BatchOptions {
        delay: Duration::ZERO,
        change_detection: detection,
        update_policy: UpdatePolicy::Append,
    }
}

fn orchestrator(
    store: &MemoryStore,
    dir: &Path,
    detection: ChangeDetection,
) -> Orchestrator<MemoryStore> {
    let fingerprints = FingerprintStore::load(dir.join(".pagesync").join("fingerprints.json"));
    Orchestrator::new(store.clone(), fingerprints, options(detection))
}

// ---------------------------------------------------------------------------
// 1. Validation gate
// ---------------------------------------------------------------------------

#[test]
fn invalid_item_never_reaches_the_store() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let no_body = write(tmp.path(), "a.json", r#"{"title":"A","slug":"a"}"#);
    let store = MemoryStore::new();

    let result = orchestrator(&store, tmp.path(), ChangeDetection::Enabled).run_batch(&[no_body]);

    assert_eq!(result.stats.skipped, 1);
    assert!(result.results[0].errors[0].contains("body"));
    assert!(store.calls().is_empty());
}

#[test]
fn batch_of_three_with_invalid_middle_item() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let items = vec![
        write(tmp.path(), "1.json", &page("one", "x")),
        write(tmp.path(), "2.json", r#"{"title":"Two","content":"x"}"#),
        write(tmp.path(), "3.json", &page("three", "x")),
    ];
    let store = MemoryStore::new();

    let result = orchestrator(&store, tmp.path(), ChangeDetection::Bypassed).run_batch(&items);

    assert_eq!(result.stats.total, 3);
    assert_eq!(result.stats.succeeded, 2);
    assert_eq!(result.stats.failed, 0);
    assert_eq!(result.stats.skipped, 1);
    let actions: Vec<_> = result.results.iter().map(|r| r.action).collect();
    assert_eq!(actions, vec![Action::Created, Action::Skipped, Action::Created]);
}

// ---------------------------------------------------------------------------
// 2. Change detection
// ---------------------------------------------------------------------------

#[test]
fn second_run_without_changes_is_idempotent() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let items = vec![
        write(tmp.path(), "a.json", &page("a", "x")),
        write(tmp.path(), "b.json", &page("b", "y")),
    ];
    let store = MemoryStore::new();

    let mut orch = orchestrator(&store, tmp.path(), ChangeDetection::Enabled);
    let first = orch.run_batch(&items);
    orch.flush().unwrap();
    assert_eq!(first.count(Action::Created), 2);

    let writes_before = store.write_calls();
    let calls_before = store.calls().len();

    // A fresh orchestrator reloads fingerprints from disk.
    let second = orchestrator(&store, tmp.path(), ChangeDetection::Enabled).run_batch(&items);
    assert_eq!(second.count(Action::Created), 0);
    assert_eq!(second.count(Action::Updated), 0);
    assert!(second
        .results
        .iter()
        .all(|r| r.reason.as_deref() == Some("unchanged")));
    assert_eq!(store.write_calls(), writes_before);
    assert_eq!(store.calls().len(), calls_before, "unchanged items make no calls");
}

#[test]
fn edited_file_is_picked_up_as_update() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path(), "a.json", &page("a", "first"));
    let store = MemoryStore::new();
    let mut orch = orchestrator(&store, tmp.path(), ChangeDetection::Enabled);

    let created = orch.run_batch(&[path.clone()]);
    write(tmp.path(), "a.json", &page("a", "second"));
    let updated = orch.run_batch(&[path]);

    assert_eq!(created.results[0].action, Action::Created);
    assert_eq!(updated.results[0].action, Action::Updated);
    assert_eq!(updated.results[0].remote_id, created.results[0].remote_id);
}

#[test]
fn failed_upsert_does_not_advance_fingerprint() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path(), "a.json", &page("a", "x"));
    let store = MemoryStore::new();
    store.fail_on(FailOn::Create);

    let mut orch = orchestrator(&store, tmp.path(), ChangeDetection::Enabled);
    let result = orch.run_batch(&[path.clone()]);
    assert_eq!(result.stats.failed, 1);
    assert_eq!(result.results[0].reason.as_deref(), Some("publish_error"));
    assert!(orch.fingerprints().is_empty());

    // Still counts as changed on the next pass.
    let again = orch.run_batch(&[path]);
    assert_eq!(again.stats.failed, 1);
}

// ---------------------------------------------------------------------------
// 3. Upsert through the orchestrator
// ---------------------------------------------------------------------------

#[test]
fn existing_slug_updates_first_page_and_keeps_previous_content() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path(), "a.json", &page("a", "new words"));
    let store = MemoryStore::new();
    let first = store.seed_page("a", "Old", "previous words");
    store.seed_page("a", "Dup", "dup");

    let result = orchestrator(&store, tmp.path(), ChangeDetection::Bypassed).run_batch(&[path]);

    assert_eq!(result.results[0].action, Action::Updated);
    assert_eq!(result.results[0].remote_id, Some(first));
    let content = store.page(first).unwrap().content;
    assert!(content.contains("previous words"));
    assert!(content.contains("new words"));
}

// ---------------------------------------------------------------------------
// 4. Assets
// ---------------------------------------------------------------------------

#[test]
fn missing_asset_scenario() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let path = write(
        tmp.path(),
        "a.json",
        r#"{"title":"A","slug":"a","content":"x [[IMG]] y",
            "assets":[{"path":"missing.png","placeholder":"[[IMG]]"}]}"#,
    );
    let store = MemoryStore::new();

    let result = orchestrator(&store, tmp.path(), ChangeDetection::Enabled).run_batch(&[path]);

    let outcome = &result.results[0];
    assert_eq!(outcome.action, Action::Created);
    assert_eq!(outcome.uploaded_asset_count, 0);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("asset not found"));
    assert!(store.uploads().is_empty());
    let id = outcome.remote_id.unwrap();
    assert_eq!(store.page(id).unwrap().content, "x [[IMG]] y");
}

#[test]
fn one_failed_upload_of_two_keeps_the_item() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("img")).unwrap();
    std::fs::write(tmp.path().join("img/ok.png"), b"ok").unwrap();
    std::fs::write(tmp.path().join("img/bad.png"), b"bad").unwrap();
    let path = write(
        tmp.path(),
        "a.json",
        r#"{"title":"A","slug":"a","content":"[[OK]] [[BAD]]",
            "assets":[
              {"path":"img/ok.png","placeholder":"[[OK]]","alt_text":"fine"},
              {"path":"img/bad.png","placeholder":"[[BAD]]"}
            ]}"#,
    );
    let store = MemoryStore::new();
    store.fail_upload_of("bad.png");

    let result = orchestrator(&store, tmp.path(), ChangeDetection::Enabled).run_batch(&[path]);

    let outcome = &result.results[0];
    assert_eq!(outcome.action, Action::Created);
    assert_eq!(outcome.uploaded_asset_count, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("bad.png"));

    let content = store.page(outcome.remote_id.unwrap()).unwrap().content;
    assert_eq!(content, format!("{} [[BAD]]", MemoryStore::media_url("ok.png")));
    assert_eq!(store.uploads()[0].2.alt_text, "fine");
}

// ---------------------------------------------------------------------------
// 5. Pacing and cancellation
// ---------------------------------------------------------------------------

#[test]
fn delay_applies_between_store_touching_items() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let items = vec![
        write(tmp.path(), "a.json", &page("a", "x")),
        write(tmp.path(), "b.json", &page("b", "x")),
    ];
    let store = MemoryStore::new();
    let mut opts = options(ChangeDetection::Bypassed);
    opts.delay = Duration::from_millis(80);
    let mut orch = Orchestrator::new(
        store,
        FingerprintStore::load(tmp.path().join("fp.json")),
        opts,
    );

    let start = Instant::now();
    orch.run_batch(&items);
    assert!(start.elapsed() >= Duration::from_millis(80));
}

#[test]
fn skipped_items_do_not_wait() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let items: Vec<_> = (0..3)
        .map(|i| write(tmp.path(), &format!("{i}.json"), r#"{"title":"no slug"}"#))
        .collect();
    let mut opts = options(ChangeDetection::Bypassed);
    opts.delay = Duration::from_secs(10);
    let mut orch = Orchestrator::new(
        MemoryStore::new(),
        FingerprintStore::load(tmp.path().join("fp.json")),
        opts,
    );

    let start = Instant::now();
    let result = orch.run_batch(&items);
    assert_eq!(result.stats.skipped, 3);
    assert!(start.elapsed() < Duration::from_secs(5));
}

/// Raises the stop flag as soon as the first page is created.
struct RaisingStore {
    inner: MemoryStore,
    stop: StopFlag,
}

impl ContentStore for RaisingStore {
    fn lookup_by_slug(&self, slug: &str) -> Result<Vec<RemotePage>, StoreError> {
        self.inner.lookup_by_slug(slug)
    }

    fn create_page(&self, page: &NewPage) -> Result<RemotePage, StoreError> {
        let created = self.inner.create_page(page);
        self.stop.raise();
        created
    }

    fn get_page(&self, id: PageId) -> Result<RemotePage, StoreError> {
        self.inner.get_page(id)
    }

    fn update_page(&self, id: PageId, update: &PageUpdate) -> Result<RemotePage, StoreError> {
        self.inner.update_page(id, update)
    }

    fn upload_asset(&self, bytes: &[u8], name: &str, meta: &AssetMeta) -> Result<String, StoreError> {
        self.inner.upload_asset(bytes, name, meta)
    }

    fn test_connectivity(&self) -> bool {
        self.inner.test_connectivity()
    }
}

#[test]
fn stop_between_items_keeps_partial_result() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let items = vec![
        write(tmp.path(), "a.json", &page("a", "x")),
        write(tmp.path(), "b.json", &page("b", "x")),
        write(tmp.path(), "c.json", &page("c", "x")),
    ];
    let inner = MemoryStore::new();
    let stop = StopFlag::new();
    let store = RaisingStore {
        inner: inner.clone(),
        stop: stop.clone(),
    };
    let fp_path = tmp.path().join("fp.json");
    let mut orch = Orchestrator::new(
        store,
        FingerprintStore::load(&fp_path),
        options(ChangeDetection::Enabled),
    );

    let result = orch.run_batch_until(&items, &stop);
    orch.flush().unwrap();

    assert!(result.interrupted);
    assert_eq!(result.stats.total, 3);
    assert_eq!(result.results.len(), 1);
    assert_eq!(result.results[0].action, Action::Created);
    assert_eq!(
        inner
            .calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Create { .. }))
            .count(),
        1
    );
    // The completed item's fingerprint survives the interruption.
    assert_eq!(FingerprintStore::load(&fp_path).len(), 1);
}

// ---------------------------------------------------------------------------
// 6. Cycles
// ---------------------------------------------------------------------------

#[test]
fn run_cycle_discovers_recursively_and_flushes() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    std::fs::create_dir_all(docs.join("guides")).unwrap();
    write(&docs, "a.json", &page("a", "x"));
    write(&docs.join("guides"), "b.json", &page("b", "x"));
    let discovery = Discovery::new(
        vec![docs, tmp.path().join("missing")],
        "*.json",
        true,
    )
    .unwrap();
    let store = MemoryStore::new();
    let mut orch = orchestrator(&store, tmp.path(), ChangeDetection::Enabled);

    let first = orch.run_cycle(&discovery, &StopFlag::new()).unwrap();
    let second = orch.run_cycle(&discovery, &StopFlag::new()).unwrap();
    assert!(first.flush.is_ok() && second.flush.is_ok());
    let (first, second) = (first.result, second.result);

    assert_eq!(first.stats.succeeded, 2);
    assert_eq!(second.stats.skipped, 2);
    assert!(tmp.path().join(".pagesync/fingerprints.json").exists());
}

#[test]
fn failed_fingerprint_flush_keeps_the_cycle_result() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    std::fs::create_dir_all(&docs).unwrap();
    write(&docs, "a.json", &page("a", "x"));
    // A regular file where the fingerprint directory should be.
    let blocker = tmp.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let discovery = Discovery::new(vec![docs], "*.json", false).unwrap();
    let store = MemoryStore::new();
    let mut orch = Orchestrator::new(
        store.clone(),
        FingerprintStore::load(blocker.join("fp.json")),
        options(ChangeDetection::Enabled),
    );

    let cycle = orch.run_cycle(&discovery, &StopFlag::new()).unwrap();

    assert!(matches!(cycle.flush, Err(SyncError::Io { .. })));
    assert_eq!(cycle.result.stats.succeeded, 1);
    assert_eq!(cycle.result.results[0].action, Action::Created);
    assert_eq!(store.pages().len(), 1);
    // Committed in memory, so the next cycle still skips the item.
    let again = orch.run_cycle(&discovery, &StopFlag::new()).unwrap();
    assert_eq!(again.result.stats.skipped, 1);
}

#[test]
fn publish_log_gets_one_line_per_upsert() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let items = vec![
        write(tmp.path(), "a.json", &page("a", "x")),
        write(tmp.path(), "b.json", r#"{"title":"no slug","content":""}"#),
    ];
    let log = tmp.path().join("publish.jsonl");
    let store = MemoryStore::new();
    let mut orch =
        orchestrator(&store, tmp.path(), ChangeDetection::Bypassed).with_publish_log(&log);

    orch.run_batch(&items);

    let contents = std::fs::read_to_string(&log).unwrap();
    assert_eq!(contents.lines().count(), 1);
    assert!(contents.contains(r#""action":"created""#));
}
