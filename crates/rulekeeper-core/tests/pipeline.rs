use rulekeeper_core::{
    FsRuleSource, RuleRequest, RuleScope, RuleService, RulesConfig, RulesError, SearchQuery,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MANIFEST: &str = "\
version: 1
languages:
  typescript:
    description: TypeScript
techs:
  react:
    dependsOn: [typescript]
groups:
  global:
    description: Always applies
  backend:
projects:
  org/svc:
    groups: [global]
    techs: [react]
defaults:
  alwaysGroups: [global]
";

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn rules_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "manifest.yml", MANIFEST);
    write(
        dir.path(),
        "global/general.md",
        "---\nappliesTo:\n  groups: [global]\ndescription: Applies everywhere\n---\nGlobal content\n",
    );
    write(
        dir.path(),
        "projects/svc.md",
        "---\nappliesTo:\n  projects: [org/svc]\n---\nService content\n",
    );
    write(
        dir.path(),
        "languages/typescript.md",
        "---\nappliesTo:\n  languages: [typescript]\ntags: [types]\n---\nPrefer strict mode.\n",
    );
    write(
        dir.path(),
        "groups/backend.md",
        "---\nappliesTo:\n  groups: [backend]\n---\nBackend content\n",
    );
    dir
}

fn service(dir: &Path) -> RuleService<FsRuleSource> {
    RuleService::new(FsRuleSource::new(RulesConfig::new(dir)))
}

#[tokio::test]
async fn project_request_pulls_in_techs_languages_and_globals() {
    let dir = rules_tree();
    let merged = service(dir.path())
        .merged_rules(&RuleRequest::new(RuleScope::Project, "org/svc"))
        .await
        .unwrap();

    assert_eq!(
        merged,
        "# Rules (project:org/svc)\n\nGlobal content\n\n---\n\nPrefer strict mode.\n\n---\n\nService content"
    );
}

#[tokio::test]
async fn group_request_matches_only_that_group() {
    let dir = rules_tree();
    let rule_set = service(dir.path())
        .rules_for(&RuleRequest::new(RuleScope::Group, "global"))
        .await
        .unwrap();
    let paths: Vec<&str> = rule_set.rules.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["global/general.md"]);
}

#[tokio::test]
async fn unmatched_request_renders_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "manifest.yml", "groups:\n  global: {}\n");
    write(
        dir.path(),
        "only-go.md",
        "---\nappliesTo:\n  languages: [go]\n---\nGo content\n",
    );

    let merged = service(dir.path())
        .merged_rules(&RuleRequest::new(RuleScope::Tech, "unknown-tech"))
        .await
        .unwrap();
    assert_eq!(merged, "# Rules (tech:unknown-tech)\n\n_No rules found._");
}

#[tokio::test]
async fn invalid_document_aborts_the_pipeline() {
    let dir = rules_tree();
    write(dir.path(), "broken.md", "---\ntags: [oops]\n---\nNo applicability\n");

    let err = service(dir.path())
        .merged_rules(&RuleRequest::new(RuleScope::Project, "org/svc"))
        .await
        .unwrap_err();
    match err {
        RulesError::Document { path, message } => {
            assert_eq!(path, Path::new("broken.md"));
            assert!(message.contains("appliesTo"));
        }
        other => panic!("expected document error, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_manifest_still_serves_rules() {
    let dir = rules_tree();
    fs::remove_file(dir.path().join("manifest.yml")).unwrap();
    let service = service(dir.path());

    let rule_set = service
        .rules_for(&RuleRequest::new(RuleScope::Group, "backend"))
        .await
        .unwrap();
    assert_eq!(rule_set.rules.len(), 1);
    assert!(service
        .available_ids(RuleScope::Project)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn malformed_manifest_degrades_to_empty() {
    let dir = rules_tree();
    write(dir.path(), "manifest.yml", "just-a-string");

    let rule_set = service(dir.path())
        .rules_for(&RuleRequest::new(RuleScope::Project, "org/svc"))
        .await
        .unwrap();
    let paths: Vec<&str> = rule_set.rules.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["projects/svc.md"]);
}

#[tokio::test]
async fn corrupt_manifest_fails_the_request() {
    let dir = rules_tree();
    write(
        dir.path(),
        "manifest.yml",
        "defaults:\n  alwaysGroups: [global\nprojects:\n  org/svc: {}\n",
    );

    let err = service(dir.path())
        .merged_rules(&RuleRequest::new(RuleScope::Project, "org/svc"))
        .await
        .unwrap_err();
    match err {
        RulesError::Io { path, .. } => assert!(path.ends_with("manifest.yml")),
        other => panic!("expected io error, got {:?}", other),
    }
}

#[tokio::test]
async fn edits_are_visible_on_the_next_request() {
    let dir = rules_tree();
    let service = service(dir.path());
    let request = RuleRequest::new(RuleScope::Group, "backend");

    let before = service.merged_rules(&request).await.unwrap();
    assert!(before.contains("Backend content"));

    write(
        dir.path(),
        "groups/backend.md",
        "---\nappliesTo:\n  groups: [backend]\n---\nRewritten backend content\n",
    );
    let after = service.merged_rules(&request).await.unwrap();
    assert!(after.contains("Rewritten backend content"));
}

#[tokio::test]
async fn listing_ids_is_sorted_per_scope() {
    let dir = rules_tree();
    let service = service(dir.path());
    assert_eq!(
        service.available_ids(RuleScope::Group).await.unwrap(),
        vec!["backend", "global"]
    );
    assert_eq!(
        service.available_ids(RuleScope::Tech).await.unwrap(),
        vec!["react"]
    );
    assert_eq!(
        service.available_ids(RuleScope::Language).await.unwrap(),
        vec!["typescript"]
    );
}

#[tokio::test]
async fn search_spans_all_rules_or_one_request() {
    let dir = rules_tree();
    let service = service(dir.path());

    let hits = service.search(&SearchQuery::new("content")).await.unwrap();
    let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["global/general.md", "groups/backend.md", "projects/svc.md"]
    );

    let hits = service
        .search(
            &SearchQuery::new("content").within(RuleRequest::new(RuleScope::Project, "org/svc")),
        )
        .await
        .unwrap();
    let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
    assert_eq!(paths, vec!["global/general.md", "projects/svc.md"]);

    let hits = service.search(&SearchQuery::new("TYPES")).await.unwrap();
    assert_eq!(hits[0].path, "languages/typescript.md");
}
