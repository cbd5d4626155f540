//! # ICode Query API
//!
//! Stateless pass-through reads. Errors are returned unchanged.

use ic_01_view_store::ViewStoreError;
use std::sync::Arc;

use crate::domain::meta::ICodeMeta;
use crate::ports::inbound::ICodeQuery;
use crate::ports::outbound::MetaRepository;

#[derive(Clone)]
pub struct ICodeQueryApi {
    repository: Arc<dyn MetaRepository>,
}

impl ICodeQueryApi {
    pub fn new(repository: Arc<dyn MetaRepository>) -> Self {
        Self { repository }
    }
}

impl ICodeQuery for ICodeQueryApi {
    fn find_all_meta(&self) -> Result<Vec<ICodeMeta>, ViewStoreError> {
        self.repository.find_all_meta()
    }

    fn find_meta_by_id(&self, id: &str) -> Result<ICodeMeta, ViewStoreError> {
        self.repository.find_meta_by_id(id)
    }

    fn find_meta_by_url(&self, git_url: &str) -> Result<ICodeMeta, ViewStoreError> {
        self.repository.find_meta_by_url(git_url)
    }
}
