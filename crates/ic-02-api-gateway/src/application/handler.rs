//! # ICode Event Handler
//!
//! Projects `icode.*` events into the metadata view.
//!
//! | Event | Effect |
//! |-------|--------|
//! | `ICodeCreated` | upsert record (status `Undeployed`, or a parked status) |
//! | `ICodeStatusChanged` | load, set status, save; parked while the record is absent |
//! | `ICodeDeleted` | remove, drop any parked status; absent ids are a no-op |
//!
//! Redelivery of an event already applied is skipped through the processed
//! event cache; a failed application is forgotten so the dead-letter
//! redelivery applies it again.

use async_trait::async_trait;
use ic_01_view_store::ViewStoreError;
use parking_lot::Mutex;
use shared_bus::{EventHandler, HandlerError, ProcessedEventCache};
use shared_types::{DomainEvent, EventPayload, ICodeCreated, ICodeDeleted, ICodeStatusChanged};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ProjectionConfig;
use crate::domain::meta::ICodeMeta;
use crate::domain::parked::ParkedStatusChanges;
use crate::ports::outbound::MetaRepository;

pub struct ICodeEventHandler {
    repository: Arc<dyn MetaRepository>,
    processed: Mutex<ProcessedEventCache>,
    parked: Mutex<ParkedStatusChanges>,
}

impl ICodeEventHandler {
    pub fn new(repository: Arc<dyn MetaRepository>, config: ProjectionConfig) -> Self {
        let processed = ProcessedEventCache::with_config(
            config.dedup_retention(),
            ProcessedEventCache::DEFAULT_GC_INTERVAL,
        );
        let parked = ParkedStatusChanges::new(
            config.max_parked_status_changes,
            config.parked_status_ttl(),
        );
        Self {
            repository,
            processed: Mutex::new(processed),
            parked: Mutex::new(parked),
        }
    }

    #[cfg(test)]
    fn parked_status_changes(&self) -> usize {
        self.parked.lock().len()
    }

    fn apply(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        match &event.payload {
            EventPayload::ICodeCreated(created) => self.on_created(created),
            EventPayload::ICodeStatusChanged(changed) => self.on_status_changed(changed),
            EventPayload::ICodeDeleted(deleted) => self.on_deleted(deleted),
            _ => {
                debug!(topic = %event.topic, "[ic-02] Ignoring unrelated event");
                Ok(())
            }
        }
    }

    fn on_created(&self, created: &ICodeCreated) -> Result<(), HandlerError> {
        let mut meta = ICodeMeta::from(created.clone());
        let parked = self.parked.lock().take(&meta.id);
        if let Some(status) = parked {
            meta.status = status;
        }

        if let Err(e) = self.repository.save(&meta) {
            if let Some(status) = parked {
                self.parked.lock().park(&meta.id, status);
            }
            return Err(to_handler_error(e));
        }
        if parked.is_some() {
            info!(id = %meta.id, status = ?meta.status, "[ic-02] Parked status change applied");
        }
        info!(
            id = %meta.id,
            url = %meta.git_url,
            version = %meta.version,
            "[ic-02] 📦 ICode registered"
        );
        Ok(())
    }

    fn on_status_changed(&self, changed: &ICodeStatusChanged) -> Result<(), HandlerError> {
        match self.repository.find_meta_by_id(&changed.id) {
            Ok(mut meta) => {
                meta.status = changed.status;
                self.repository.save(&meta).map_err(to_handler_error)?;
                info!(id = %changed.id, status = ?changed.status, "[ic-02] ICode status changed");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                self.parked.lock().park(&changed.id, changed.status);
                warn!(
                    id = %changed.id,
                    status = ?changed.status,
                    "[ic-02] Status change for unknown ICode parked until it is created"
                );
                Ok(())
            }
            Err(e) => Err(to_handler_error(e)),
        }
    }

    fn on_deleted(&self, deleted: &ICodeDeleted) -> Result<(), HandlerError> {
        if self.parked.lock().discard(&deleted.id) {
            debug!(id = %deleted.id, "[ic-02] Parked status change dropped with its ICode");
        }
        if self.repository.remove(&deleted.id).map_err(to_handler_error)? {
            info!(id = %deleted.id, "[ic-02] 🗑️ ICode removed");
        } else {
            debug!(id = %deleted.id, "[ic-02] Delete of unknown ICode ignored");
        }
        Ok(())
    }
}

/// Missing records and storage faults may clear up on redelivery; conflicts
/// and undecodable data will not.
fn to_handler_error(err: ViewStoreError) -> HandlerError {
    match err {
        ViewStoreError::NotFound { .. } | ViewStoreError::Storage(_) => {
            HandlerError::Recoverable(err.to_string())
        }
        ViewStoreError::DuplicateKey { .. } | ViewStoreError::Serialization { .. } => {
            HandlerError::Failed(err.to_string())
        }
    }
}

#[async_trait]
impl EventHandler for ICodeEventHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        let first = self.processed.lock().first_seen(event.id);
        if !first {
            debug!(event_id = %event.id, "[ic-02] Duplicate delivery skipped");
            return Ok(());
        }

        let result = self.apply(event);
        if result.is_err() {
            self.processed.lock().forget(&event.id);
        }
        result
    }

    fn name(&self) -> &str {
        "icode-projection"
    }
}
