use super::*;
use crate::drive::{MemoryDrive, Owner};
use chrono::{DateTime, Utc};

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn md(id: &str, name: &str, parent: &str, modified: &str) -> FileRecord {
    FileRecord {
        id: id.into(),
        name: name.into(),
        mime_type: MARKDOWN_MIME_TYPE.into(),
        description: Some(format!("about {name}")),
        created_time: ts("2024-01-01T00:00:00Z"),
        modified_time: ts(modified),
        owners: vec![Owner { display_name: "Jonathan Q. Smith".into() }],
        parents: vec![parent.into()],
    }
}

fn config() -> ResolverConfig {
    ResolverConfig::default()
        .with_folder(Scope::Blog, "blog-folder")
        .with_folder(Scope::Recipes, "recipe-folder")
}

/// Provider ordering: most recent first, as Drive returns with `orderBy=modifiedTime desc`.
fn drive() -> MemoryDrive {
    let d = MemoryDrive::new();
    d.insert(md("b", "b.md", "blog-folder", "2024-01-03T00:00:00Z"), "# B");
    d.insert(md("a", "a.md", "blog-folder", "2024-01-02T00:00:00Z"), "# A");
    d
}

#[test]
fn mode_selection() {
    assert_eq!(Mode::from_selector(None), Mode::List);
    assert_eq!(Mode::from_selector(Some("")), Mode::List);
    assert_eq!(Mode::from_selector(Some("latest")), Mode::Latest);
    assert_eq!(Mode::from_selector(Some("pancakes")), Mode::Named("pancakes"));
}

#[test]
fn scope_from_path() {
    assert_eq!(Scope::from_path("/recipes/pancakes"), Scope::Recipes);
    assert_eq!(Scope::from_path("/prod/recipes"), Scope::Recipes);
    assert_eq!(Scope::from_path("/posts/latest"), Scope::Blog);
    assert_eq!(Scope::from_path(""), Scope::Blog);
}

#[test]
fn scope_from_route_ignores_the_post_segment() {
    assert_eq!(Scope::from_route("/posts/my-recipes-roundup", Some("my-recipes-roundup")), Scope::Blog);
    assert_eq!(Scope::from_route("/recipes/soup", Some("soup")), Scope::Recipes);
    assert_eq!(Scope::from_route("/prod/recipes/latest", Some("latest")), Scope::Recipes);
    assert_eq!(Scope::from_route("/recipes", None), Scope::Recipes);
    assert_eq!(Scope::from_route("/posts", None), Scope::Blog);
}

#[tokio::test]
async fn list_preserves_provider_order() {
    let d = MemoryDrive::new();
    d.insert(md("a", "a.md", "blog-folder", "2024-01-02T00:00:00Z"), "# A");
    d.insert(md("b", "b.md", "blog-folder", "2024-01-03T00:00:00Z"), "# B");
    let cfg = config();
    let out = Resolver::new(&d, &cfg).list(Scope::Blog).await.unwrap();
    let names: Vec<&str> = out.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(out.iter().all(|c| c.content.is_none()));
    assert_eq!(d.fetch_calls(), 0);
}

#[tokio::test]
async fn list_drops_do_not_publish_slugs() {
    let d = drive();
    d.insert(md("draft", "draft.md", "blog-folder", "2024-01-01T00:00:00Z"), "wip");
    let mut cfg = config();
    cfg.do_not_publish.insert("draft".into());
    let out = Resolver::new(&d, &cfg).list(Scope::Blog).await.unwrap();
    assert!(out.iter().all(|c| c.name != "draft"));
    assert_eq!(out.len(), 2);
}

/// A provider that ignores the mime/folder filter must still never leak ineligible records.
struct SloppyProvider(Vec<FileRecord>);

impl ListingProvider for SloppyProvider {
    async fn list_files(&self, _query: &ListQuery) -> Result<Vec<FileRecord>, DriveError> {
        Ok(self.0.clone())
    }
}

impl ContentFetcher for SloppyProvider {
    async fn fetch_content(&self, file_id: &str) -> Result<String, DriveError> {
        Ok(format!("content of {file_id}"))
    }
}

#[tokio::test]
async fn list_filters_ineligible_records_even_if_provider_does_not() {
    let mut txt = md("t", "notes.txt", "blog-folder", "2024-01-05T00:00:00Z");
    txt.mime_type = "text/plain".into();
    let other_folder = md("r", "soup.md", "recipe-folder", "2024-01-04T00:00:00Z");
    let ok = md("a", "a.md", "blog-folder", "2024-01-02T00:00:00Z");
    let p = SloppyProvider(vec![txt, other_folder, ok]);
    let cfg = config();
    let out = Resolver::new(&p, &cfg).list(Scope::Blog).await.unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "a");
}

#[tokio::test]
async fn latest_takes_first_provider_record_with_content() {
    let d = drive();
    let cfg = config();
    let got = Resolver::new(&d, &cfg).latest(Scope::Blog).await.unwrap();
    assert_eq!(got.name, "b");
    assert_eq!(got.content.as_deref(), Some("# B"));
    assert_eq!(got.modified_time, 1_704_240_000_000);
    assert_eq!(d.fetch_calls(), 1);
}

#[tokio::test]
async fn latest_on_empty_folder_is_not_found() {
    let d = MemoryDrive::new();
    let cfg = config();
    let err = Resolver::new(&d, &cfg).latest(Scope::Blog).await.unwrap_err();
    assert_eq!(err.http_status(), 404);
    assert_eq!(d.fetch_calls(), 0);
}

#[tokio::test]
async fn latest_is_not_filtered_by_do_not_publish() {
    let d = drive();
    let mut cfg = config();
    cfg.do_not_publish.insert("b".into());
    let got = Resolver::new(&d, &cfg).latest(Scope::Blog).await.unwrap();
    assert_eq!(got.name, "b");
}

#[tokio::test]
async fn named_by_query_matches_slug() {
    let d = drive();
    let cfg = config();
    let got = Resolver::new(&d, &cfg).named(Scope::Blog, "a").await.unwrap();
    assert_eq!(got.name, "a");
    assert_eq!(got.content.as_deref(), Some("# A"));
    assert_eq!(got.description.as_deref(), Some("about a.md"));
}

#[tokio::test]
async fn named_by_list_scan_matches_slug() {
    let d = drive();
    let mut cfg = config();
    cfg.named_lookup = NamedLookup::ListScan;
    let got = Resolver::new(&d, &cfg).named(Scope::Blog, "a").await.unwrap();
    assert_eq!(got.name, "a");
}

#[tokio::test]
async fn dotted_names_list_and_scan_under_first_segment() {
    let d = MemoryDrive::new();
    d.insert(md("n", "v1.2-notes.md", "blog-folder", "2024-01-03T00:00:00Z"), "notes");
    let mut cfg = config();

    let listed = Resolver::new(&d, &cfg).list(Scope::Blog).await.unwrap();
    assert_eq!(listed[0].name, "v1");

    cfg.named_lookup = NamedLookup::ListScan;
    let got = Resolver::new(&d, &cfg).named(Scope::Blog, "v1").await.unwrap();
    assert_eq!(got.name, "v1");
    assert_eq!(got.content.as_deref(), Some("notes"));
}

#[tokio::test]
async fn named_does_not_prefix_match() {
    let d = MemoryDrive::new();
    d.insert(md("p2", "pancakes-two.md", "blog-folder", "2024-01-03T00:00:00Z"), "two");
    let mut cfg = config();
    cfg.named_lookup = NamedLookup::ListScan;
    let err = Resolver::new(&d, &cfg).named(Scope::Blog, "pancakes").await.unwrap_err();
    assert_eq!(err.code_str(), "post_not_found");
}

#[tokio::test]
async fn named_miss_uses_configured_not_found_status() {
    let d = drive();
    let mut cfg = config();
    cfg.not_found_status = 410;
    let err = Resolver::new(&d, &cfg).named(Scope::Blog, "zzz").await.unwrap_err();
    assert_eq!(err.http_status(), 410);
}

#[tokio::test]
async fn named_is_scoped_to_the_scope_folder() {
    let d = drive();
    d.insert(md("soup", "soup.md", "recipe-folder", "2024-01-03T00:00:00Z"), "soup");
    let cfg = config();
    assert!(Resolver::new(&d, &cfg).named(Scope::Blog, "soup").await.is_err());
    let got = Resolver::new(&d, &cfg).named(Scope::Recipes, "soup").await.unwrap();
    assert_eq!(got.content.as_deref(), Some("soup"));
}

#[tokio::test]
async fn author_alias_and_toggle() {
    let d = drive();
    let mut cfg = config();
    cfg.author_aliases.insert("Jonathan Q. Smith".into(), "Jon".into());
    let got = Resolver::new(&d, &cfg).named(Scope::Blog, "a").await.unwrap();
    assert_eq!(got.author.as_deref(), Some("Jon"));

    cfg.include_author = false;
    let got = Resolver::new(&d, &cfg).named(Scope::Blog, "a").await.unwrap();
    assert!(got.author.is_none());
    let json = serde_json::to_value(&got).unwrap();
    assert!(json.get("author").is_none());
}

#[tokio::test]
async fn upstream_failures_use_configured_status() {
    let d = drive();
    d.fail_list(DriveError::Status { status: 403, body: "forbidden".into() });
    let mut cfg = config();
    let err = Resolver::new(&d, &cfg).list(Scope::Blog).await.unwrap_err();
    assert_eq!(err.http_status(), 500);

    cfg.upstream_failure_status = 404;
    let err = Resolver::new(&d, &cfg).list(Scope::Blog).await.unwrap_err();
    assert_eq!(err.http_status(), 404);
    assert_eq!(err.code_str(), "upstream_error");
}

#[tokio::test]
async fn fetch_failure_is_not_a_partial_response() {
    let d = drive();
    d.fail_fetch(DriveError::Transport("reset".into()));
    let cfg = config();
    let err = Resolver::new(&d, &cfg).latest(Scope::Blog).await.unwrap_err();
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn timestamps_serialize_as_integers() {
    let d = drive();
    let cfg = config();
    let res = Resolver::new(&d, &cfg).resolve(Scope::Blog, Mode::List).await.unwrap();
    let json = serde_json::to_value(&res).unwrap();
    for item in json.as_array().unwrap() {
        assert!(item["createdTime"].is_i64());
        assert!(item["modifiedTime"].is_i64());
    }
    let res = Resolver::new(&d, &cfg).resolve(Scope::Blog, Mode::Latest).await.unwrap();
    let json = serde_json::to_value(&res).unwrap();
    assert!(json["modifiedTime"].is_i64());
    assert_eq!(json["name"], "b");
}

#[test]
fn validate_rejects_bad_values() {
    let mut cfg = config();
    assert!(cfg.validate().is_ok());
    cfg.scopes.get_mut(&Scope::Blog).unwrap().page_size = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = config();
    cfg.upstream_failure_status = 200;
    assert_eq!(cfg.validate().unwrap_err().code_str(), "invalid_status");
}
