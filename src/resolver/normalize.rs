//! Metadata normalisation: stored file names to slugs, wire timestamps to epoch
//! milliseconds, owner display names to published author names.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{ResolvedContent, ResolverConfig};
use crate::drive::FileRecord;

/// Stored name up to its first `.`: `pancakes.md` -> `pancakes`, `v1.2-notes.md` -> `v1`.
/// Names without a dot (or dot-files) are returned unchanged.
pub fn slug_of(name: &str) -> &str {
    match name.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// The stored name a slug is looked up by.
pub fn file_name_for(slug: &str, extension: &str) -> String {
    format!("{}.{}", slug, extension.trim_start_matches('.'))
}

pub fn epoch_millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub fn resolve_author(display_name: &str, aliases: &BTreeMap<String, String>) -> String {
    aliases.get(display_name).cloned().unwrap_or_else(|| display_name.to_string())
}

pub fn is_eligible(record: &FileRecord, mime_type: &str, folder_id: Option<&str>) -> bool {
    record.mime_type == mime_type && folder_id.map_or(true, |f| record.in_folder(f))
}

/// Lightweight summary used by list mode; single-file modes add `content` afterwards.
pub fn summarize(record: &FileRecord, config: &ResolverConfig) -> ResolvedContent {
    let author = if config.include_author {
        // A record with no owners still gets an author field, just empty.
        Some(resolve_author(record.author().unwrap_or_default(), &config.author_aliases))
    } else {
        None
    };
    ResolvedContent {
        name: slug_of(&record.name).to_string(),
        description: record.description.clone(),
        content: None,
        created_time: epoch_millis(&record.created_time),
        modified_time: epoch_millis(&record.modified_time),
        author,
    }
}
