//! Storage-provider side of drivepress.
//!
//! The resolver only ever talks to the two collaborator traits defined here:
//! [`ListingProvider`] for metadata listings and [`ContentFetcher`] for raw file text.
//! A [`DriveBackend`] hands out an authenticated session implementing both, once per
//! invocation. Two backends exist: the Drive v3 HTTP client and an in-memory drive
//! used for fixtures and tests.

use std::future::Future;

use thiserror::Error;

mod client;
mod memory;
mod models;
mod token;

pub use client::{DriveClient, DriveSession, DEFAULT_API_BASE, LIST_FIELDS};
pub use memory::MemoryDrive;
pub use models::{FileList, FileRecord, Owner};
pub use token::{AccessToken, TokenSource, DRIVE_READONLY_SCOPE, METADATA_TOKEN_URL};

/// Upstream failures. Opaque to callers beyond their message, except `NotFound`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriveError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("drive returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode drive response: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("could not obtain access token: {0}")]
    Token(String),
}

impl From<reqwest::Error> for DriveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DriveError::Decode(err.to_string())
        } else {
            DriveError::Transport(err.to_string())
        }
    }
}

/// A single listing request against one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Restrict to records whose `parents` contain this folder. `None` lists the whole drive.
    pub folder_id: Option<String>,
    pub mime_type: String,
    /// Exact stored name, e.g. `pancakes.md`.
    pub name: Option<String>,
    pub page_size: u32,
}

impl ListQuery {
    pub fn new(folder_id: Option<String>, mime_type: impl Into<String>, page_size: u32) -> Self {
        Self { folder_id, mime_type: mime_type.into(), name: None, page_size }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Render the query in the Drive search language.
    pub fn to_drive_q(&self) -> String {
        let mut clauses = Vec::with_capacity(4);
        if let Some(folder) = &self.folder_id {
            clauses.push(format!("'{}' in parents", escape_q_literal(folder)));
        }
        clauses.push(format!("mimeType = '{}'", escape_q_literal(&self.mime_type)));
        if let Some(name) = &self.name {
            clauses.push(format!("name = '{}'", escape_q_literal(name)));
        }
        clauses.push("trashed = false".to_string());
        clauses.join(" and ")
    }
}

/// Escape a value for use inside a single-quoted Drive query string literal.
pub fn escape_q_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out
}

/// Returns file metadata for a folder/query, in the provider's own order.
pub trait ListingProvider: Send + Sync {
    fn list_files(&self, query: &ListQuery) -> impl Future<Output = Result<Vec<FileRecord>, DriveError>> + Send;
}

/// Returns the raw text of one file.
pub trait ContentFetcher: Send + Sync {
    fn fetch_content(&self, file_id: &str) -> impl Future<Output = Result<String, DriveError>> + Send;
}

/// Opens an authenticated, read-only session. Called once per invocation; sessions are not pooled.
pub trait DriveBackend: Send + Sync + 'static {
    type Session: ListingProvider + ContentFetcher;

    fn open(&self) -> impl Future<Output = Result<Self::Session, DriveError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_q_contains_every_clause_in_order() {
        let q = ListQuery::new(Some("folder-1".into()), "text/markdown", 10).with_name("pancakes.md");
        assert_eq!(
            q.to_drive_q(),
            "'folder-1' in parents and mimeType = 'text/markdown' and name = 'pancakes.md' and trashed = false"
        );
    }

    #[test]
    fn drive_q_without_folder() {
        let q = ListQuery::new(None, "text/markdown", 1);
        assert_eq!(q.to_drive_q(), "mimeType = 'text/markdown' and trashed = false");
    }

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        assert_eq!(escape_q_literal("mom's"), "mom\\'s");
        assert_eq!(escape_q_literal("a\\b"), "a\\\\b");
        let q = ListQuery::new(None, "text/markdown", 1).with_name("x' or name contains '");
        assert!(q.to_drive_q().contains("name = 'x\\' or name contains \\''"));
    }
}
