use std::time::Duration;

use tracing::debug;

use super::{ContentFetcher, DriveBackend, DriveError, FileList, FileRecord, ListQuery, ListingProvider, TokenSource};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Partial-response mask for `files.list`; everything the resolver reads and nothing else.
pub const LIST_FIELDS: &str =
    "files(id,name,mimeType,description,createdTime,modifiedTime,owners(displayName),parents)";

/// Drive v3 backend. Holds the shared connection pool; credentials are fetched per session.
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    api_base: String,
    order_by: Option<String>,
    tokens: TokenSource,
}

impl DriveClient {
    pub fn new(api_base: &str, tokens: TokenSource, order_by: Option<String>, timeout: Duration) -> Result<Self, DriveError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DriveError::Transport(e.to_string()))?;
        Ok(Self::from_client(http, api_base, tokens, order_by))
    }

    pub fn from_client(http: reqwest::Client, api_base: &str, tokens: TokenSource, order_by: Option<String>) -> Self {
        Self { http, api_base: api_base.trim_end_matches('/').to_string(), order_by, tokens }
    }

    pub fn api_base(&self) -> &str { &self.api_base }
}

impl DriveBackend for DriveClient {
    type Session = DriveSession;

    async fn open(&self) -> Result<DriveSession, DriveError> {
        let token = self.tokens.fetch(&self.http).await?;
        Ok(DriveSession {
            http: self.http.clone(),
            api_base: self.api_base.clone(),
            order_by: self.order_by.clone(),
            bearer: token.access_token,
        })
    }
}

/// One authenticated invocation against Drive.
#[derive(Debug, Clone)]
pub struct DriveSession {
    http: reqwest::Client,
    api_base: String,
    order_by: Option<String>,
    bearer: String,
}

impl DriveSession {
    async fn error_from(resp: reqwest::Response) -> DriveError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        DriveError::Status { status, body }
    }
}

impl ListingProvider for DriveSession {
    async fn list_files(&self, query: &ListQuery) -> Result<Vec<FileRecord>, DriveError> {
        let url = format!("{}/files", self.api_base);
        let q = query.to_drive_q();
        let page_size = query.page_size.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("q", q.as_str()),
            ("pageSize", page_size.as_str()),
            ("fields", LIST_FIELDS),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ];
        if let Some(order) = self.order_by.as_deref() {
            params.push(("orderBy", order));
        }
        debug!(target: "drivepress::drive", q = %q, page_size = query.page_size, "files.list");
        let resp = self.http.get(&url).bearer_auth(&self.bearer).query(&params).send().await?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        let list: FileList = resp.json().await?;
        Ok(list.files)
    }
}

impl ContentFetcher for DriveSession {
    async fn fetch_content(&self, file_id: &str) -> Result<String, DriveError> {
        let url = format!("{}/files/{}", self.api_base, urlencoding::encode(file_id));
        debug!(target: "drivepress::drive", file_id = %file_id, "files.get alt=media");
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DriveError::NotFound(file_id.to_string()));
        }
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        Ok(resp.text().await?)
    }
}
