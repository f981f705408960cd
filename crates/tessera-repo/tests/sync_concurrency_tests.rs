//! Locking behavior of working-copy synchronization under concurrent requests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeVcs, REPO_A, SHARED, resolver_with, seeded_vcs, two_repo_settings};
use tempfile::TempDir;
use tessera_repo::{ConfigQuery, MultiRepositoryResolver, ResolveError, Settings, SyncState};

fn query(app: &str, label: Option<&str>) -> ConfigQuery {
    ConfigQuery::parse(app, "dev", label).unwrap()
}

fn slow_vcs(delay_ms: u64) -> Arc<FakeVcs> {
    let vcs = seeded_vcs().with_delay(Duration::from_millis(delay_ms));
    vcs.tag(REPO_A, "v1.0", "a0", &[("svc1.yml", "server:\n  port: 7000\n")]);
    Arc::new(vcs)
}

fn settings(basedir: &TempDir, lock_wait: Duration) -> Settings {
    let mut settings = two_repo_settings(basedir.path());
    settings.refresh_rate = Duration::from_secs(3600);
    settings.lock_wait_timeout = lock_wait;
    settings
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_requests_share_one_clone() {
    let basedir = TempDir::new().unwrap();
    let vcs = slow_vcs(100);
    let resolver = Arc::new(resolver_with(settings(&basedir, Duration::from_secs(10)), &vcs));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let resolver = Arc::clone(&resolver);
        handles.push(tokio::spawn(async move {
            resolver.find_one(&query("svc1", None)).await
        }));
    }

    for handle in handles {
        let env = handle.await.unwrap().unwrap();
        assert_eq!(env.version(), Some("a1"));
    }

    assert_eq!(vcs.clones(), 1);
    assert!(vcs.fetches() <= 1);
    assert_eq!(vcs.checkouts(), 1);
    assert_eq!(vcs.overlaps(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_labels_never_overlap_on_one_copy() {
    let basedir = TempDir::new().unwrap();
    let vcs = slow_vcs(20);
    let resolver = Arc::new(resolver_with(settings(&basedir, Duration::from_secs(30)), &vcs));

    let mut handles = Vec::new();
    for i in 0..12 {
        let resolver = Arc::clone(&resolver);
        let (app, label) = match i % 3 {
            0 => ("svc1", None),
            1 => ("svc1", Some("v1.0")),
            _ => ("billing", None),
        };
        handles.push(tokio::spawn(async move {
            let env = resolver.find_one(&query(app, label)).await.unwrap();
            (app, label, env.version().map(str::to_string))
        }));
    }

    for handle in handles {
        let (app, label, version) = handle.await.unwrap();
        let expected = match (app, label) {
            ("svc1", None) => "a1",
            ("svc1", Some(_)) => "a0",
            _ => "s1",
        };
        assert_eq!(version.as_deref(), Some(expected));
    }

    assert_eq!(vcs.overlaps(), 0);
    assert_eq!(vcs.clones(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn waiting_longer_than_the_lock_timeout_fails() {
    let basedir = TempDir::new().unwrap();
    let vcs = slow_vcs(400);
    let resolver = Arc::new(resolver_with(settings(&basedir, Duration::from_millis(100)), &vcs));

    let first = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.find_one(&query("svc1", None)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = resolver.find_one(&query("svc1", None)).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::ConcurrentSyncTimeout { ref repository, waited }
            if repository == "A" && waited == Duration::from_millis(100)
    ));
    assert!(err.is_transient());

    assert!(first.await.unwrap().is_ok());
    assert_eq!(vcs.clones(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_caller_does_not_interrupt_synchronization() {
    let basedir = TempDir::new().unwrap();
    let vcs = slow_vcs(150);
    let resolver = resolver_with(settings(&basedir, Duration::from_secs(10)), &vcs);

    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        resolver.find_one(&query("svc1", None)),
    )
    .await;
    assert!(cancelled.is_err());

    let identity = format!("A@{REPO_A}");
    let mut ready = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if resolver.status(&identity).is_some_and(|s| s.state == SyncState::Ready) {
            ready = true;
            break;
        }
    }
    assert!(ready, "synchronization did not complete after the caller went away");

    let env = resolver.find_one(&query("svc1", None)).await.unwrap();
    assert_eq!(env.version(), Some("a1"));
    assert_eq!(vcs.clones(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn leases_are_shared_and_block_synchronization() {
    let basedir = TempDir::new().unwrap();
    let vcs = slow_vcs(0);
    let resolver: MultiRepositoryResolver =
        resolver_with(settings(&basedir, Duration::from_millis(200)), &vcs);

    let (first, _) = resolver.resolve(&query("svc1", None)).await.unwrap();
    let (second, _) = tokio::time::timeout(
        Duration::from_secs(1),
        resolver.resolve(&query("svc1", None)),
    )
    .await
    .expect("a current copy must be leased without waiting")
    .unwrap();
    assert_eq!(first.revision(), second.revision());

    let err = resolver.resolve(&query("svc1", Some("v1.0"))).await.unwrap_err();
    assert!(matches!(err, ResolveError::ConcurrentSyncTimeout { .. }));

    drop(first);
    drop(second);
    let (tagged, _) = resolver.resolve(&query("svc1", Some("v1.0"))).await.unwrap();
    assert_eq!(tagged.revision(), "a0");

    let shared = resolver.status(&format!("fallback@{SHARED}"));
    assert!(shared.is_none());
}
