//! Version lifecycle integration tests.
//!
//! Exercises the public service API end to end:
//! - The demo scenario (create, compare, hard rollback)
//! - Hard and soft rollback round trips
//! - Change-log contents and regeneration
//! - Template deletion cascades

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use promptvc::models::{
    ACTIVE_VERSION_FIELD, ChangeType, ComponentType, LineChangeType, NewTemplate, Parameter,
    ParameterType, TemplateId,
};
use promptvc::services::PromptVersionService;
use promptvc::Error;
use test_case::test_case;

// ============================================================================
// Test Helpers
// ============================================================================

fn service_with(id: &str) -> (PromptVersionService, TemplateId) {
    let service = PromptVersionService::in_memory().expect("in-memory service");
    let id = TemplateId::new(id).unwrap();
    service
        .create_template(NewTemplate::new(id.clone()).with_description("test template"))
        .unwrap();
    (service, id)
}

const STRUCTURED_V1: &str = "\
You summarize coding sessions.

[[meta]]
Be concise.
Use bullet points.

[[input]]
{{session}}

[[output:json]]
{\"summary\": \"...\"}
";

const STRUCTURED_V2: &str = "\
You summarize coding sessions.

[[meta]]
Be concise.
Use numbered lists.
Mention blockers.

[[output:json]]
{\"summary\": \"...\"}

[[examples]]
Q: fixed bug
A: 1. Fixed bug
";

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn test_demo_scenario() {
    let (service, id) = service_with("demo");

    let v1 = service.create_version(&id, "A\nB\nC", "alice", &[]).unwrap();
    assert_eq!(v1.version_number, 1);
    assert!(v1.is_active);

    let v2 = service.create_version(&id, "A\nX\nC", "alice", &[]).unwrap();
    assert_eq!(v2.version_number, 2);
    assert_eq!(service.get_active_version(&id).unwrap().version_number, 1);

    let diff = service.compare(&id, 1, 2).unwrap();
    assert_eq!(diff.components.len(), 1);
    let component = &diff.components[0];
    assert_eq!(component.change_type, ChangeType::Updated);
    assert_eq!(component.lines.len(), 1);
    assert_eq!(component.lines[0].change_type, LineChangeType::Modified);
    assert_eq!(component.lines[0].line_number, Some(2));
    assert_eq!(component.lines[0].old_text.as_deref(), Some("B"));
    assert_eq!(component.lines[0].new_text.as_deref(), Some("X"));

    let v3 = service.rollback_hard(&id, 1, None, "alice").unwrap();
    assert_eq!(v3.version_number, 3);
    assert_eq!(v3.content, "A\nB\nC");
    assert!(v3.is_active);

    let v2 = service.get_version(&id, 2).unwrap();
    assert!(!v2.is_active);
    assert_eq!(v2.content, "A\nX\nC");
}

#[test]
fn test_structured_diff() {
    let (service, id) = service_with("session-summary");
    service
        .create_version(&id, STRUCTURED_V1, "alice", &[Parameter::infer("temperature", "0.2")])
        .unwrap();
    service
        .create_version(
            &id,
            STRUCTURED_V2,
            "alice",
            &[
                Parameter::infer("temperature", "0.4"),
                Parameter::infer("max_tokens", "512"),
            ],
        )
        .unwrap();

    let v1 = service.get_version(&id, 1).unwrap();
    let components = service.get_components(&v1.id).unwrap();
    let types: Vec<ComponentType> = components.iter().map(|c| c.component_type).collect();
    assert_eq!(
        types,
        vec![
            ComponentType::Unparsed,
            ComponentType::MetaPrompt,
            ComponentType::InputTemplate,
            ComponentType::OutputTemplate,
        ]
    );

    let diff = service.compare(&id, 1, 2).unwrap();
    let by_type = |t: ComponentType| {
        diff.components
            .iter()
            .find(|c| c.component_type == t)
            .map(|c| c.change_type)
    };
    assert_eq!(by_type(ComponentType::MetaPrompt), Some(ChangeType::Updated));
    assert_eq!(by_type(ComponentType::InputTemplate), Some(ChangeType::Deleted));
    assert_eq!(by_type(ComponentType::Examples), Some(ChangeType::Created));
    assert_eq!(by_type(ComponentType::OutputTemplate), None);
    assert_eq!(by_type(ComponentType::Unparsed), None);

    let meta = diff
        .components
        .iter()
        .find(|c| c.component_type == ComponentType::MetaPrompt)
        .unwrap();
    let summary = meta.summary();
    assert_eq!(summary.modified, 1);
    assert_eq!(summary.added, 1);
    assert_eq!(summary.removed, 0);

    let keys: Vec<&str> = diff.parameters.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["max_tokens", "temperature"]);
    assert_eq!(diff.parameters[0].change_type, ChangeType::Created);
    assert_eq!(diff.parameters[1].change_type, ChangeType::Updated);

    let v2 = service.get_version(&id, 2).unwrap();
    let parameters = service.get_parameters(&v2.id).unwrap();
    assert_eq!(parameters[0].parameter_type, ParameterType::Integer);
    assert_eq!(parameters[1].parameter_type, ParameterType::Float);
}

// ============================================================================
// Rollback round trips
// ============================================================================

#[test_case(3, 1 ; "oldest of three")]
#[test_case(5, 3 ; "middle of five")]
#[test_case(4, 4 ; "active version itself")]
fn test_hard_rollback_round_trip(count: u32, target: u32) {
    let (service, id) = service_with("demo");
    for n in 1..=count {
        service
            .create_version(&id, &format!("content {n}"), "alice", &[])
            .unwrap();
    }
    service.activate(&id, count).unwrap();
    let before = service.list_versions(&id).unwrap();

    let created = service.rollback_hard(&id, target, None, "bob").unwrap();
    assert_eq!(created.version_number, count + 1);
    assert_eq!(created.content, format!("content {target}"));
    assert_eq!(created.source_version, Some(target));
    assert!(created.is_active);

    let after = service.list_versions(&id).unwrap();
    assert_eq!(after.len(), before.len() + 1);
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.id, new.id);
        assert_eq!(old.content, new.content);
        assert_eq!(old.content_hash, new.content_hash);
        assert!(!new.is_active);
    }
}

#[test]
fn test_soft_rollback_round_trip() {
    let (service, id) = service_with("demo");
    for content in ["one", "two", "three", "four"] {
        service.create_version(&id, content, "alice", &[]).unwrap();
    }

    service.activate(&id, 3).unwrap();
    service.activate(&id, 1).unwrap();
    service.activate(&id, 3).unwrap();

    let versions = service.list_versions(&id).unwrap();
    assert_eq!(versions.len(), 4);
    let active: Vec<u32> = versions
        .iter()
        .filter(|v| v.is_active)
        .map(|v| v.version_number)
        .collect();
    assert_eq!(active, vec![3]);
}

#[test]
fn test_rollback_change_log() {
    let (service, id) = service_with("demo");
    service.create_version(&id, "A\nB\nC", "alice", &[]).unwrap();
    service.create_version(&id, "A\nX\nC", "alice", &[]).unwrap();
    service.activate(&id, 2).unwrap();

    service
        .rollback_hard(&id, 1, Some("X broke summaries"), "alice")
        .unwrap();

    let changes = service.get_changes(&id, 3).unwrap();
    let rollback = changes
        .iter()
        .find(|c| c.field_name == ACTIVE_VERSION_FIELD)
        .unwrap();
    assert_eq!(rollback.old_value.as_deref(), Some("2"));
    assert_eq!(rollback.new_value.as_deref(), Some("3"));
    assert_eq!(rollback.change_summary.as_deref(), Some("X broke summaries"));

    let content = changes
        .iter()
        .find(|c| c.field_name.starts_with("component."))
        .unwrap();
    assert_eq!(content.old_value.as_deref(), Some("A\nX\nC"));
    assert_eq!(content.new_value.as_deref(), Some("A\nB\nC"));

    let history = service.history(&id, 3).unwrap();
    let targets: Vec<u32> = history.iter().map(|c| c.to_version).collect();
    assert!(targets.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(targets.first(), Some(&2));
}

// ============================================================================
// Change log
// ============================================================================

#[test]
fn test_regenerate_after_auto_record() {
    let (service, id) = service_with("demo");
    for content in ["one", "two", "three"] {
        service.create_version(&id, content, "alice", &[]).unwrap();
    }
    let recorded: Vec<_> = (2..=3)
        .flat_map(|n| service.get_changes(&id, n).unwrap())
        .collect();
    assert_eq!(recorded.len(), 2);

    assert!(service.regenerate_changes(&id).unwrap().is_empty());
}

#[test]
fn test_identical_content_versions() {
    let (service, id) = service_with("demo");
    let v1 = service.create_version(&id, "same", "alice", &[]).unwrap();
    let v2 = service.create_version(&id, "same", "alice", &[]).unwrap();

    assert_ne!(v1.id, v2.id);
    assert_eq!(v1.content_hash, v2.content_hash);
    assert!(service.compare(&id, 1, 2).unwrap().is_empty());
    assert!(service.get_changes(&id, 2).unwrap().is_empty());
}

// ============================================================================
// Errors and templates
// ============================================================================

#[test]
fn test_not_found_paths() {
    let (service, id) = service_with("demo");
    service.create_version(&id, "one", "alice", &[]).unwrap();

    assert!(matches!(service.get_version(&id, 2), Err(Error::NotFound(_))));
    assert!(matches!(service.compare(&id, 1, 9), Err(Error::NotFound(_))));
    assert!(matches!(service.get_changes(&id, 9), Err(Error::NotFound(_))));
    assert!(matches!(service.activate(&id, 9), Err(Error::NotFound(_))));
    assert!(matches!(
        service.rollback_hard(&id, 9, None, "alice"),
        Err(Error::NotFound(_))
    ));

    let empty = TemplateId::new("empty").unwrap();
    service.create_template(NewTemplate::new(empty.clone())).unwrap();
    assert!(matches!(service.get_active_version(&empty), Err(Error::NotFound(_))));
    assert!(service.list_versions(&empty).unwrap().is_empty());
}

#[test]
fn test_duplicate_template_conflicts() {
    let (service, id) = service_with("demo");
    let err = service.create_template(NewTemplate::new(id)).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert!(err.is_retryable());
}

#[test]
fn test_delete_template_cascades() {
    let (service, id) = service_with("demo");
    let v1 = service.create_version(&id, "one", "alice", &[Parameter::infer("k", "v")]).unwrap();
    service.create_version(&id, "two", "alice", &[]).unwrap();

    service.delete_template(&id).unwrap();
    assert!(matches!(service.get_template(&id), Err(Error::NotFound(_))));
    assert!(service.get_components(&v1.id).unwrap().is_empty());
    assert!(service.get_parameters(&v1.id).unwrap().is_empty());

    let stats = service.stats().unwrap();
    assert_eq!(stats.version_count, 0);
    assert_eq!(stats.change_count, 0);

    service.create_template(NewTemplate::new(id.clone())).unwrap();
    let fresh = service.create_version(&id, "again", "alice", &[]).unwrap();
    assert_eq!(fresh.version_number, 1);
    assert!(fresh.is_active);
}

#[test]
fn test_unparsed_content_is_still_stored() {
    let (service, id) = service_with("demo");
    let version = service
        .create_version(&id, "[[footer]]\nnot a known block", "alice", &[])
        .unwrap();
    assert_eq!(version.content, "[[footer]]\nnot a known block");
    assert!(service.get_components(&version.id).unwrap().is_empty());

    let blank = service.create_version(&id, "", "alice", &[]).unwrap();
    assert_eq!(blank.version_number, 2);
}
