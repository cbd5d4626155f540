//! # View-Store Meta Repository
//!
//! `MetaRepository` over a `ViewRepository<ICodeMeta>`.

use ic_01_view_store::{KeyValueStore, ViewRepository, ViewStore, ViewStoreError};
use std::sync::Arc;

use crate::domain::meta::ICodeMeta;
use crate::ports::outbound::MetaRepository;

pub struct ViewMetaRepository {
    views: ViewRepository<ICodeMeta>,
}

impl ViewMetaRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            views: ViewRepository::new(store),
        }
    }

    /// Repository over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(ic_01_view_store::InMemoryKVStore::new()))
    }
}

impl MetaRepository for ViewMetaRepository {
    fn save(&self, meta: &ICodeMeta) -> Result<(), ViewStoreError> {
        self.views.save(meta)
    }

    fn find_all_meta(&self) -> Result<Vec<ICodeMeta>, ViewStoreError> {
        self.views.find_all()
    }

    fn find_meta_by_id(&self, id: &str) -> Result<ICodeMeta, ViewStoreError> {
        self.views.find_by_id(id)
    }

    fn find_meta_by_url(&self, git_url: &str) -> Result<ICodeMeta, ViewStoreError> {
        self.views.find_by_secondary_key(git_url)
    }

    fn remove(&self, id: &str) -> Result<bool, ViewStoreError> {
        self.views.remove(id)
    }
}
