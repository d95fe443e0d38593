//! Concurrency tests.
//!
//! Verifies the versioning invariants under concurrent access:
//! - Version numbers stay gapless and unique under concurrent creation
//! - Exactly one version is active under concurrent activate/rollback
//! - Losers of an activation race fail with `Conflict`, never corrupt state
//! - Two services sharing one database file stay consistent

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
// Excessive nesting is acceptable in concurrent test code with thread spawns
#![allow(clippy::excessive_nesting)]

use std::sync::{Arc, Barrier};
use std::thread;

use promptvc::config::PromptVcConfig;
use promptvc::models::{NewTemplate, TemplateId};
use promptvc::services::PromptVersionService;
use promptvc::{Error, Result};
use tempfile::TempDir;

const THREADS: usize = 8;
const PER_THREAD: usize = 10;

fn shared_service() -> (Arc<PromptVersionService>, TemplateId) {
    let service = PromptVersionService::in_memory().unwrap();
    let id = TemplateId::new("shared").unwrap();
    service.create_template(NewTemplate::new(id.clone())).unwrap();
    (Arc::new(service), id)
}

fn assert_single_active(service: &PromptVersionService, id: &TemplateId) {
    let versions = service.list_versions(id).unwrap();
    let active: Vec<u32> = versions
        .iter()
        .filter(|v| v.is_active)
        .map(|v| v.version_number)
        .collect();
    assert_eq!(active.len(), 1, "expected exactly one active version, got {active:?}");
    assert_eq!(
        service.get_template(id).unwrap().active_version,
        Some(active[0])
    );
}

fn assert_gapless(service: &PromptVersionService, id: &TemplateId) -> usize {
    let numbers: Vec<u32> = service
        .list_versions(id)
        .unwrap()
        .iter()
        .map(|v| v.version_number)
        .collect();
    let expected: Vec<u32> = (1..=u32::try_from(numbers.len()).unwrap()).collect();
    assert_eq!(numbers, expected);
    numbers.len()
}

/// Retries an operation while it reports a conflict.
fn retry_on_conflict<T>(mut op: impl FnMut() -> Result<T>) -> Result<T> {
    loop {
        match op() {
            Err(Error::Conflict(_)) => thread::yield_now(),
            other => return other,
        }
    }
}

#[test]
fn test_concurrent_creation_is_gapless() {
    let (service, id) = shared_service();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let service = Arc::clone(&service);
            let id = id.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..PER_THREAD)
                    .map(|i| {
                        service
                            .create_version(&id, &format!("thread {t} item {i}"), "worker", &[])
                            .unwrap()
                            .version_number
                    })
                    .collect::<Vec<u32>>()
            })
        })
        .collect();

    let mut numbers: Vec<u32> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    numbers.sort_unstable();
    let expected: Vec<u32> = (1..=u32::try_from(THREADS * PER_THREAD).unwrap()).collect();
    assert_eq!(numbers, expected);

    assert_eq!(assert_gapless(&service, &id), THREADS * PER_THREAD);
    assert_single_active(&service, &id);
    assert_eq!(service.get_active_version(&id).unwrap().version_number, 1);
}

#[test]
fn test_concurrent_activation_keeps_one_active() {
    let (service, id) = shared_service();
    for n in 1..=5 {
        service
            .create_version(&id, &format!("content {n}"), "alice", &[])
            .unwrap();
    }
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let service = Arc::clone(&service);
            let id = id.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut conflicts = 0;
                for i in 0..PER_THREAD {
                    let target = u32::try_from((t + i) % 5).unwrap() + 1;
                    match service.activate(&id, target) {
                        Ok(version) => assert_eq!(version.version_number, target),
                        Err(Error::Conflict(_)) => conflicts += 1,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
                conflicts
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(assert_gapless(&service, &id), 5);
    assert_single_active(&service, &id);
}

#[test]
fn test_concurrent_hard_rollbacks() {
    let (service, id) = shared_service();
    for n in 1..=3 {
        service
            .create_version(&id, &format!("content {n}"), "alice", &[])
            .unwrap();
    }
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let service = Arc::clone(&service);
            let id = id.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let target = u32::try_from(t % 3).unwrap() + 1;
                match service.rollback_hard(&id, target, None, "worker") {
                    Ok(version) => {
                        assert_eq!(version.source_version, Some(target));
                        1
                    },
                    Err(Error::Conflict(_)) => 0,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            })
        })
        .collect();

    let succeeded: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(succeeded >= 1);

    assert_eq!(assert_gapless(&service, &id), 3 + succeeded);
    assert_single_active(&service, &id);

    let active = service.get_active_version(&id).unwrap();
    let source = service
        .get_version(&id, active.source_version.unwrap())
        .unwrap();
    assert_eq!(active.content, source.content);
}

#[test]
fn test_creation_across_templates() {
    let service = Arc::new(PromptVersionService::in_memory().unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                let id = TemplateId::new(format!("template-{t}")).unwrap();
                service.create_template(NewTemplate::new(id.clone())).unwrap();
                for i in 0..PER_THREAD {
                    service
                        .create_version(&id, &format!("v{i}"), "worker", &[])
                        .unwrap();
                }
                id
            })
        })
        .collect();

    for handle in handles {
        let id = handle.join().unwrap();
        assert_eq!(assert_gapless(&service, &id), PER_THREAD);
        assert_single_active(&service, &id);
    }
}

#[test]
fn test_two_services_share_one_file() {
    let dir = TempDir::new().unwrap();
    let config = PromptVcConfig::new().with_db_path(dir.path().join("shared.db"));
    let id = TemplateId::new("shared").unwrap();

    let first = Arc::new(PromptVersionService::open(&config).unwrap());
    let second = Arc::new(PromptVersionService::open(&config).unwrap());
    first.create_template(NewTemplate::new(id.clone())).unwrap();

    let handles: Vec<_> = [Arc::clone(&first), Arc::clone(&second)]
        .into_iter()
        .enumerate()
        .map(|(s, service)| {
            let id = id.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    retry_on_conflict(|| {
                        service.create_version(&id, &format!("service {s} item {i}"), "w", &[])
                    })
                    .unwrap();
                    let target = u32::try_from(i % 3).unwrap() + 1;
                    retry_on_conflict(|| service.activate(&id, target)).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(assert_gapless(&first, &id), 2 * PER_THREAD);
    assert_single_active(&first, &id);
    assert_single_active(&second, &id);
}
