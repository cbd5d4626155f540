//! # ICode Metadata Record

use ic_01_view_store::Projection;
use serde::{Deserialize, Serialize};
use shared_types::{ICodeCreated, ICodeStatus, Version};

/// Metadata of one deployed code repository.
///
/// Keyed by `id`; `git_url` is unique across records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ICodeMeta {
    pub id: String,
    pub repository_name: String,
    pub git_url: String,
    pub path: String,
    pub commit_hash: String,
    pub version: Version,
    pub status: ICodeStatus,
}

impl Projection for ICodeMeta {
    const NAMESPACE: &'static str = "icode";

    fn primary_key(&self) -> &str {
        &self.id
    }

    fn secondary_key(&self) -> Option<&str> {
        (!self.git_url.is_empty()).then_some(self.git_url.as_str())
    }
}

impl From<ICodeCreated> for ICodeMeta {
    fn from(event: ICodeCreated) -> Self {
        Self {
            id: event.id,
            repository_name: event.repository_name,
            git_url: event.git_url,
            path: event.path,
            commit_hash: event.commit_hash,
            version: event.version,
            status: ICodeStatus::default(),
        }
    }
}
