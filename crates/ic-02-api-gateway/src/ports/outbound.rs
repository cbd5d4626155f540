//! # Outbound Ports (Driven Ports / SPI)

use ic_01_view_store::ViewStoreError;

use crate::domain::meta::ICodeMeta;

/// Persistence of ICode metadata.
pub trait MetaRepository: Send + Sync {
    /// Insert or overwrite by id.
    fn save(&self, meta: &ICodeMeta) -> Result<(), ViewStoreError>;

    fn find_all_meta(&self) -> Result<Vec<ICodeMeta>, ViewStoreError>;

    fn find_meta_by_id(&self, id: &str) -> Result<ICodeMeta, ViewStoreError>;

    fn find_meta_by_url(&self, git_url: &str) -> Result<ICodeMeta, ViewStoreError>;

    /// Remove by id; absent ids are a no-op. Returns whether a record existed.
    fn remove(&self, id: &str) -> Result<bool, ViewStoreError>;
}
