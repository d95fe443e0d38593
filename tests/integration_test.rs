//! On-disk integration tests.
//!
//! Covers what the in-memory unit tests cannot:
//! - Persistence across service instances
//! - Configuration files driving the service
//! - CLI argument handling against a real database
//! - Machine-readable output round trips

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use promptvc::cli::output::{self, OutputFormat};
use promptvc::cli::CreateVersionArgs;
use promptvc::config::PromptVcConfig;
use promptvc::models::{Change, NewTemplate, TemplateId, Version, VersionDiff};
use promptvc::services::PromptVersionService;
use promptvc::storage::SqliteDatabase;
use promptvc::storage::sqlite::latest_version;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn config_in(dir: &TempDir) -> PromptVcConfig {
    PromptVcConfig::new().with_db_path(dir.path().join("data").join("promptvc.db"))
}

fn seeded(config: &PromptVcConfig) -> (PromptVersionService, TemplateId) {
    let service = PromptVersionService::open(config).unwrap();
    let id = TemplateId::new("session-summary").unwrap();
    service.create_template(NewTemplate::new(id.clone())).unwrap();
    service.create_version(&id, "[[meta]]\nA\nB\nC", "alice", &[]).unwrap();
    service.create_version(&id, "[[meta]]\nA\nX\nC", "alice", &[]).unwrap();
    (service, id)
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let rollback_id = {
        let (service, id) = seeded(&config);
        service.activate(&id, 2).unwrap();
        service.rollback_hard(&id, 1, Some("revert"), "bob").unwrap().id
    };

    let service = PromptVersionService::open(&config).unwrap();
    let id = TemplateId::new("session-summary").unwrap();

    let active = service.get_active_version(&id).unwrap();
    assert_eq!(active.id, rollback_id);
    assert_eq!(active.version_number, 3);
    assert_eq!(active.comment.as_deref(), Some("revert"));
    assert_eq!(service.list_versions(&id).unwrap().len(), 3);
    assert_eq!(service.get_changes(&id, 2).unwrap().len(), 1);
    assert!(service.get_changes(&id, 3).unwrap().iter().any(Change::is_rollback));

    let next = service.create_version(&id, "[[meta]]\nnew", "carol", &[]).unwrap();
    assert_eq!(next.version_number, 4);
}

#[test]
fn test_database_is_migrated_on_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fresh.db");

    let db = SqliteDatabase::open(path.clone()).unwrap();
    assert_eq!(db.schema_version().unwrap(), latest_version());
    assert_eq!(db.db_path(), path.as_path());
    drop(db);

    let reopened = SqliteDatabase::open(path).unwrap();
    assert_eq!(reopened.schema_version().unwrap(), latest_version());
}

#[test]
fn test_services_share_database() {
    let db = Arc::new(SqliteDatabase::in_memory().unwrap());
    let writer = PromptVersionService::from_database(Arc::clone(&db), Default::default());
    let reader = PromptVersionService::from_database(db, Default::default());

    let id = TemplateId::new("demo").unwrap();
    writer.create_template(NewTemplate::new(id.clone())).unwrap();
    writer.create_version(&id, "one", "alice", &[]).unwrap();

    assert_eq!(reader.get_active_version(&id).unwrap().content, "one");
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_file_drives_service() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("configured.db");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "[storage]\npath = {:?}\n\n[versioning]\ndefault_language = \"fr\"\ndefault_author = \"ci\"\nrecord_changes_on_create = false\n",
            db_path.display().to_string()
        ),
    )
    .unwrap();

    let config = PromptVcConfig::load_from_file(&config_path).unwrap();
    let service = PromptVersionService::open(&config).unwrap();
    assert!(db_path.exists());

    let id = TemplateId::new("demo").unwrap();
    let template = service.create_template(service.new_template(id.clone())).unwrap();
    assert_eq!(template.language, "fr");

    let draft = CreateVersionArgs::new("demo")
        .with_content("[[meta]]\nBonjour")
        .into_draft(&service.settings().default_author, std::io::empty())
        .unwrap();
    let v1 = service.create_version_from(&id, draft).unwrap();
    assert_eq!(v1.created_by, "ci");
    assert_eq!(service.get_components(&v1.id).unwrap()[0].language, "fr");

    service.create_version(&id, "[[meta]]\nSalut", "ci", &[]).unwrap();
    assert!(service.get_changes(&id, 2).unwrap().is_empty());
}

// ============================================================================
// CLI helpers
// ============================================================================

#[test]
fn test_cli_create_version_from_file_with_params() {
    let dir = TempDir::new().unwrap();
    let (service, id) = seeded(&config_in(&dir));
    let content_path = dir.path().join("prompt.txt");
    std::fs::write(&content_path, "[[meta]]\nA\nY\nC\n").unwrap();

    let draft = CreateVersionArgs::new(id.as_str())
        .with_file(content_path)
        .with_param("temperature=0.3")
        .with_param("temperature=0.5")
        .with_author("dana")
        .with_comment("tweak")
        .into_draft("fallback", std::io::empty())
        .unwrap();
    let v3 = service.create_version_from(&id, draft).unwrap();

    assert_eq!(v3.version_number, 3);
    assert_eq!(v3.created_by, "dana");
    let parameters = service.get_parameters(&v3.id).unwrap();
    assert_eq!(parameters.len(), 1);
    assert_eq!(parameters[0].value, "0.5");

    let changes = service.get_changes(&id, 3).unwrap();
    let fields: Vec<&str> = changes.iter().map(|c| c.field_name.as_str()).collect();
    assert_eq!(fields, vec!["component.meta_prompt.meta_prompt", "parameter.temperature"]);
}

#[test]
fn test_json_output_round_trips() {
    let dir = TempDir::new().unwrap();
    let (service, id) = seeded(&config_in(&dir));

    let versions = service.list_versions(&id).unwrap();
    let json = output::serialize(&versions, OutputFormat::Json).unwrap().unwrap();
    let parsed: Vec<Version> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, versions);

    let diff = service.compare(&id, 1, 2).unwrap();
    let yaml = output::serialize(&diff, OutputFormat::Yaml).unwrap().unwrap();
    let parsed: VersionDiff = serde_yaml_ng::from_str(&yaml).unwrap();
    assert_eq!(parsed, diff);

    let text = output::diff_text(&diff);
    assert!(text.contains("meta_prompt (updated)"));
    assert!(text.contains("B => X"));
}

#[test]
fn test_table_output_for_stored_data() {
    let dir = TempDir::new().unwrap();
    let (service, id) = seeded(&config_in(&dir));

    let table = output::templates_table(&service.list_templates().unwrap());
    assert!(table.contains("session-summary"));
    assert!(table.ends_with("Total: 1 templates"));

    let changes = output::changes_table(&service.history(&id, 2).unwrap());
    assert!(changes.contains("component.meta_prompt.meta_prompt"));

    let stats = output::stats_text(&service.stats().unwrap());
    assert!(stats.starts_with("Templates: 1\nVersions: 2\nChanges: 1"));
}

#[test]
fn test_default_paths_are_namespaced() {
    if let Some(path) = SqliteDatabase::default_path() {
        assert!(path.ends_with(PathBuf::from("promptvc").join("promptvc.db")));
    }
    if let Some(path) = PromptVcConfig::default_config_path() {
        assert!(path.ends_with(PathBuf::from("promptvc").join("config.toml")));
    }
}
