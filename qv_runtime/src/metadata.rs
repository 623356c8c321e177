//! Structured view of project metadata.
//!
//! The ledger stores only an opaque reference. When the document behind
//! that reference has been fetched from the external store, this module
//! parses it. Nothing in the ledger depends on it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_GATEWAY: &str = "https://ipfs.io";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("metadata has no name")]
    MissingName,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

impl ProjectMetadata {
    /// Unknown fields are ignored; the document format belongs to the store.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        let meta: ProjectMetadata = serde_json::from_str(json)?;
        if meta.name.trim().is_empty() {
            return Err(MetadataError::MissingName);
        }
        Ok(meta)
    }

    /// The thumbnail as a fetchable URL.
    pub fn thumbnail_url(&self, gateway: &str) -> Option<String> {
        self.thumbnail.as_deref().map(|t| gateway_url(t, gateway))
    }
}

/// Rewrite `ipfs://CID[/path]` to `{gateway}/ipfs/CID[/path]`. Any other
/// reference is returned unchanged.
pub fn gateway_url(reference: &str, gateway: &str) -> String {
    match reference.strip_prefix("ipfs://") {
        Some(rest) => {
            let rest = rest.strip_prefix("ipfs/").unwrap_or(rest);
            format!("{}/ipfs/{}", gateway.trim_end_matches('/'), rest)
        }
        None => reference.to_string(),
    }
}
