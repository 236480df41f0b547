//! Content resolution.
//!
//! A request selects one of three modes purely from its `post` selector:
//! - no selector: list the scope folder as summaries (do-not-publish slugs removed)
//! - `latest`: the first record of a one-item listing, with content
//! - anything else: the record whose slug equals the selector, with content
//!
//! The listing provider's order is trusted as most-recently-modified first; nothing
//! here re-sorts. Content is fetched for at most one file per request.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::drive::{ContentFetcher, DriveError, FileRecord, ListQuery, ListingProvider};
use crate::error::{AppError, AppResult};

pub mod normalize;

use normalize::{file_name_for, is_eligible, slug_of, summarize};

pub const MARKDOWN_MIME_TYPE: &str = "text/markdown";
pub const LATEST_SELECTOR: &str = "latest";

/// Logical partition of the drive, chosen from the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Blog,
    Recipes,
}

impl Scope {
    pub fn from_path(path: &str) -> Self {
        if path.contains("recipes") { Scope::Recipes } else { Scope::Blog }
    }

    /// Scope of a routed request. When a `post` selector was captured it is the last
    /// path segment and is dropped first, so a slug never picks the scope.
    pub fn from_route(path: &str, post: Option<&str>) -> Self {
        let collection = match post {
            Some(_) => path.rsplit_once('/').map_or(path, |(head, _)| head),
            None => path,
        };
        Self::from_path(collection)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Blog => "blog",
            Scope::Recipes => "recipes",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScopeConfig {
    /// `None` leaves the listing unscoped (the whole drive the credential can see).
    pub folder_id: Option<String>,
    pub page_size: u32,
}

impl Default for ScopeConfig {
    fn default() -> Self { Self { folder_id: None, page_size: 10 } }
}

/// How named mode finds its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamedLookup {
    /// Ask the provider for the exact stored name `<post>.<ext>`.
    #[default]
    Query,
    /// List the scope and pick the first record whose slug matches.
    ListScan,
}

/// Per-deployment behaviour. Each historical handler variant is one instance of this.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Entries given in a config file overlay the per-scope defaults field by field.
    #[serde(deserialize_with = "scopes_over_defaults")]
    pub scopes: BTreeMap<Scope, ScopeConfig>,
    pub include_author: bool,
    /// Owner display name -> published author name.
    pub author_aliases: BTreeMap<String, String>,
    /// Slugs hidden from list mode. Direct access by slug still resolves them.
    pub do_not_publish: BTreeSet<String>,
    pub named_lookup: NamedLookup,
    pub not_found_status: u16,
    pub upstream_failure_status: u16,
    pub markdown_mime_type: String,
    pub markdown_extension: String,
}

fn default_scopes() -> BTreeMap<Scope, ScopeConfig> {
    let mut scopes = BTreeMap::new();
    scopes.insert(Scope::Blog, ScopeConfig { folder_id: None, page_size: 10 });
    scopes.insert(Scope::Recipes, ScopeConfig { folder_id: None, page_size: 100 });
    scopes
}

#[derive(Deserialize)]
struct ScopeOverride {
    #[serde(default)]
    folder_id: Option<String>,
    #[serde(default)]
    page_size: Option<u32>,
}

fn scopes_over_defaults<'de, D>(d: D) -> Result<BTreeMap<Scope, ScopeConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<Scope, ScopeOverride>::deserialize(d)?;
    let mut scopes = default_scopes();
    for (scope, o) in overrides {
        let entry = scopes.entry(scope).or_default();
        if o.folder_id.is_some() {
            entry.folder_id = o.folder_id;
        }
        if let Some(page_size) = o.page_size {
            entry.page_size = page_size;
        }
    }
    Ok(scopes)
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            scopes: default_scopes(),
            include_author: true,
            author_aliases: BTreeMap::new(),
            do_not_publish: BTreeSet::new(),
            named_lookup: NamedLookup::Query,
            not_found_status: 404,
            upstream_failure_status: 500,
            markdown_mime_type: MARKDOWN_MIME_TYPE.to_string(),
            markdown_extension: "md".to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn scope(&self, scope: Scope) -> ScopeConfig {
        self.scopes.get(&scope).cloned().unwrap_or_default()
    }

    pub fn with_folder(mut self, scope: Scope, folder_id: impl Into<String>) -> Self {
        self.scopes.entry(scope).or_default().folder_id = Some(folder_id.into());
        self
    }

    /// Apply this deployment's status choices to an upstream failure.
    pub fn map_drive_error(&self, err: DriveError) -> AppError {
        match AppError::from(err) {
            nf @ AppError::NotFound { .. } => nf.with_status(self.not_found_status),
            other => other.with_status(self.upstream_failure_status),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        for (scope, sc) in &self.scopes {
            if sc.page_size == 0 {
                return Err(AppError::config("invalid_page_size".to_string(), format!("page_size for scope {} must be at least 1", scope.as_str())));
            }
        }
        for (field, status) in [("not_found_status", self.not_found_status), ("upstream_failure_status", self.upstream_failure_status)] {
            if !(400..=599).contains(&status) {
                return Err(AppError::config("invalid_status".to_string(), format!("{field} must be an HTTP error status, got {status}")));
            }
        }
        if self.markdown_mime_type.trim().is_empty() {
            return Err(AppError::config("invalid_mime_type", "markdown_mime_type must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode<'a> {
    List,
    Latest,
    Named(&'a str),
}

impl<'a> Mode<'a> {
    pub fn from_selector(post: Option<&'a str>) -> Self {
        match post {
            None | Some("") => Mode::List,
            Some(LATEST_SELECTOR) => Mode::Latest,
            Some(slug) => Mode::Named(slug),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::List => "list",
            Mode::Latest => "latest",
            Mode::Named(_) => "named",
        }
    }
}

/// Response payload for one document. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedContent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub created_time: i64,
    pub modified_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Resolution {
    Listing(Vec<ResolvedContent>),
    Single(ResolvedContent),
}

/// One resolution call: an authenticated session plus the deployment's configuration.
pub struct Resolver<'a, S> {
    session: &'a S,
    config: &'a ResolverConfig,
}

impl<'a, S> Resolver<'a, S>
where
    S: ListingProvider + ContentFetcher,
{
    pub fn new(session: &'a S, config: &'a ResolverConfig) -> Self {
        Self { session, config }
    }

    pub async fn resolve(&self, scope: Scope, mode: Mode<'_>) -> AppResult<Resolution> {
        match mode {
            Mode::List => self.list(scope).await.map(Resolution::Listing),
            Mode::Latest => self.latest(scope).await.map(Resolution::Single),
            Mode::Named(slug) => self.named(scope, slug).await.map(Resolution::Single),
        }
    }

    pub async fn list(&self, scope: Scope) -> AppResult<Vec<ResolvedContent>> {
        let sc = self.config.scope(scope);
        let records = self.query(&sc, sc.page_size, None).await?;
        let out: Vec<ResolvedContent> = records
            .iter()
            .filter(|r| is_eligible(r, &self.config.markdown_mime_type, sc.folder_id.as_deref()))
            .map(|r| summarize(r, self.config))
            .filter(|s| !self.config.do_not_publish.contains(&s.name))
            .collect();
        debug!(target: "drivepress::resolver", scope = scope.as_str(), listed = records.len(), returned = out.len(), "list");
        Ok(out)
    }

    pub async fn latest(&self, scope: Scope) -> AppResult<ResolvedContent> {
        let sc = self.config.scope(scope);
        let records = self.query(&sc, 1, None).await?;
        let record = records
            .into_iter()
            .find(|r| is_eligible(r, &self.config.markdown_mime_type, sc.folder_id.as_deref()))
            .ok_or_else(|| self.not_found("no_documents", format!("no documents in scope {}", scope.as_str())))?;
        self.with_content(&record).await
    }

    pub async fn named(&self, scope: Scope, slug: &str) -> AppResult<ResolvedContent> {
        let sc = self.config.scope(scope);
        let records = match self.config.named_lookup {
            NamedLookup::Query => {
                let name = file_name_for(slug, &self.config.markdown_extension);
                self.query(&sc, sc.page_size, Some(name)).await?
            }
            NamedLookup::ListScan => self.query(&sc, sc.page_size, None).await?,
        };
        let record = records
            .into_iter()
            .filter(|r| is_eligible(r, &self.config.markdown_mime_type, sc.folder_id.as_deref()))
            .find(|r| slug_of(&r.name) == slug)
            .ok_or_else(|| self.not_found("post_not_found", format!("no document named {slug}")))?;
        self.with_content(&record).await
    }

    async fn query(&self, sc: &ScopeConfig, page_size: u32, name: Option<String>) -> AppResult<Vec<FileRecord>> {
        let mut query = ListQuery::new(sc.folder_id.clone(), self.config.markdown_mime_type.clone(), page_size);
        query.name = name;
        self.session.list_files(&query).await.map_err(|e| self.config.map_drive_error(e))
    }

    async fn with_content(&self, record: &FileRecord) -> AppResult<ResolvedContent> {
        let content = self.session.fetch_content(&record.id).await.map_err(|e| self.config.map_drive_error(e))?;
        let mut resolved = summarize(record, self.config);
        resolved.content = Some(content);
        Ok(resolved)
    }

    fn not_found(&self, code: &str, message: String) -> AppError {
        AppError::not_found(code.to_string(), message).with_status(self.config.not_found_status)
    }
}

#[cfg(test)]
mod resolver_tests;
