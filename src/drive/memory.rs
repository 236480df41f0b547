use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;
use serde::Deserialize;

use super::{ContentFetcher, DriveBackend, DriveError, FileRecord, ListQuery, ListingProvider};

/// In-memory drive. Listing order is insertion order, so callers control what "most recent first" means.
/// Clones share state, including call counters and injected failures.
#[derive(Debug, Clone, Default)]
pub struct MemoryDrive {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: RwLock<Vec<FileRecord>>,
    contents: RwLock<HashMap<String, String>>,
    failures: RwLock<Failures>,
    opens: AtomicUsize,
    lists: AtomicUsize,
    fetches: AtomicUsize,
}

#[derive(Debug, Default, Clone)]
struct Failures {
    open: Option<DriveError>,
    list: Option<DriveError>,
    fetch: Option<DriveError>,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    files: Vec<FixtureEntry>,
}

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    #[serde(flatten)]
    record: FileRecord,
    #[serde(default)]
    content: Option<String>,
}

impl MemoryDrive {
    pub fn new() -> Self { Self::default() }

    /// Load `{ "files": [ { <FileRecord fields>, "content": "..." } ] }`.
    pub fn from_fixture_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading fixture {}", path.display()))?;
        let fixture: Fixture = serde_json::from_str(&text).with_context(|| format!("parsing fixture {}", path.display()))?;
        let drive = Self::new();
        for entry in fixture.files {
            drive.insert(entry.record, entry.content.unwrap_or_default());
        }
        Ok(drive)
    }

    pub fn insert(&self, record: FileRecord, content: impl Into<String>) {
        let mut contents = self.inner.contents.write();
        contents.insert(record.id.clone(), content.into());
        let mut records = self.inner.records.write();
        records.push(record);
    }

    pub fn fail_open(&self, err: DriveError) { self.failures_mut(|f| f.open = Some(err)); }
    pub fn fail_list(&self, err: DriveError) { self.failures_mut(|f| f.list = Some(err)); }
    pub fn fail_fetch(&self, err: DriveError) { self.failures_mut(|f| f.fetch = Some(err)); }

    pub fn open_calls(&self) -> usize { self.inner.opens.load(Ordering::SeqCst) }
    pub fn list_calls(&self) -> usize { self.inner.lists.load(Ordering::SeqCst) }
    pub fn fetch_calls(&self) -> usize { self.inner.fetches.load(Ordering::SeqCst) }

    fn failures_mut(&self, f: impl FnOnce(&mut Failures)) {
        let mut guard = self.inner.failures.write();
        f(&mut guard);
    }

    fn failures(&self) -> Failures {
        self.inner.failures.read().clone()
    }

    fn matches(record: &FileRecord, query: &ListQuery) -> bool {
        if record.mime_type != query.mime_type { return false; }
        if let Some(folder) = &query.folder_id {
            if !record.in_folder(folder) { return false; }
        }
        if let Some(name) = &query.name {
            if &record.name != name { return false; }
        }
        true
    }
}

impl DriveBackend for MemoryDrive {
    type Session = MemoryDrive;

    async fn open(&self) -> Result<MemoryDrive, DriveError> {
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures().open {
            return Err(err);
        }
        Ok(self.clone())
    }
}

impl ListingProvider for MemoryDrive {
    async fn list_files(&self, query: &ListQuery) -> Result<Vec<FileRecord>, DriveError> {
        self.inner.lists.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures().list {
            return Err(err);
        }
        let records = self.inner.records.read();
        Ok(records
            .iter()
            .filter(|r| Self::matches(r, query))
            .take(query.page_size as usize)
            .cloned()
            .collect())
    }
}

impl ContentFetcher for MemoryDrive {
    async fn fetch_content(&self, file_id: &str) -> Result<String, DriveError> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures().fetch {
            return Err(err);
        }
        let contents = self.inner.contents.read();
        contents.get(file_id).cloned().ok_or_else(|| DriveError::NotFound(file_id.to_string()))
    }
}
