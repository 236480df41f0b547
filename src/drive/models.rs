use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One file as reported by the listing endpoint (Drive v3 `File` resource, trimmed to the fields we ask for).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_time: DateTime<Utc>,
    pub modified_time: DateTime<Utc>,
    #[serde(default)]
    pub owners: Vec<Owner>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl FileRecord {
    pub fn author(&self) -> Option<&str> {
        self.owners.first().map(|o| o.display_name.as_str())
    }

    pub fn in_folder(&self, folder_id: &str) -> bool {
        self.parents.iter().any(|p| p == folder_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    #[serde(default)]
    pub display_name: String,
}

/// `files.list` response body.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<FileRecord>,
    // Only the first page is ever served.
    #[serde(default)]
    pub next_page_token: Option<String>,
}
