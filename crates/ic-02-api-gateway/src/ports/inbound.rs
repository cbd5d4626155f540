//! # Inbound Ports (Driving Ports / API)

use ic_01_view_store::ViewStoreError;

use crate::domain::meta::ICodeMeta;

/// Read-only access to ICode metadata.
pub trait ICodeQuery: Send + Sync {
    /// Every record; empty if none.
    fn find_all_meta(&self) -> Result<Vec<ICodeMeta>, ViewStoreError>;

    /// # Errors
    ///
    /// `ViewStoreError::NotFound` if absent.
    fn find_meta_by_id(&self, id: &str) -> Result<ICodeMeta, ViewStoreError>;

    /// # Errors
    ///
    /// `ViewStoreError::NotFound` if no record has this git url.
    fn find_meta_by_url(&self, git_url: &str) -> Result<ICodeMeta, ViewStoreError>;
}
