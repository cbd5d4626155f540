//! # View Repository
//!
//! Generic store for one `Projection` type over a shared `KeyValueStore`.

use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::ViewStoreError;
use crate::domain::keys::{index_key, record_key, record_prefix};
use crate::domain::projection::Projection;
use crate::ports::inbound::ViewStore;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use crate::service::stripes::KeyStripes;

/// Materialized view of one projection type.
///
/// Writers on the same primary or secondary key are serialized by striped
/// locks; readers go straight to the store, whose batches are atomic.
pub struct ViewRepository<P: Projection> {
    store: Arc<dyn KeyValueStore>,
    stripes: KeyStripes,
    _marker: PhantomData<fn() -> P>,
}

impl<P: Projection> ViewRepository<P> {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            stripes: KeyStripes::default(),
            _marker: PhantomData,
        }
    }

    fn encode(record: &P) -> Result<Vec<u8>, ViewStoreError> {
        bincode::serialize(record).map_err(|e| ViewStoreError::Serialization {
            message: e.to_string(),
        })
    }

    fn decode(bytes: &[u8]) -> Result<P, ViewStoreError> {
        bincode::deserialize(bytes).map_err(|e| ViewStoreError::Serialization {
            message: e.to_string(),
        })
    }

    fn not_found(key: &str) -> ViewStoreError {
        ViewStoreError::NotFound {
            namespace: P::NAMESPACE.to_string(),
            key: key.to_string(),
        }
    }

    fn load(&self, id: &str) -> Result<Option<P>, ViewStoreError> {
        self.store
            .get(&record_key(P::NAMESPACE, id))?
            .map(|bytes| Self::decode(&bytes))
            .transpose()
    }

    fn index_owner(&self, secondary: &str) -> Result<Option<String>, ViewStoreError> {
        let Some(bytes) = self.store.get(&index_key(P::NAMESPACE, secondary))? else {
            return Ok(None);
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| ViewStoreError::Serialization {
                message: format!("index entry for {secondary:?}: {e}"),
            })
    }
}

fn record_lock(id: &str) -> String {
    format!("rec:{id}")
}

fn index_lock(secondary: &str) -> String {
    format!("idx:{secondary}")
}

impl<P: Projection> ViewStore<P> for ViewRepository<P> {
    fn save(&self, record: &P) -> Result<(), ViewStoreError> {
        let id = record.primary_key();
        let secondary = record.secondary_key();

        let mut lock_keys = vec![record_lock(id)];
        lock_keys.extend(secondary.map(index_lock));
        let lock_refs: Vec<&str> = lock_keys.iter().map(String::as_str).collect();
        let _guards = self.stripes.lock_all(&lock_refs);

        let mut batch = Vec::with_capacity(3);

        if let Some(secondary) = secondary {
            match self.index_owner(secondary)? {
                Some(owner) if owner != id => {
                    warn!(
                        namespace = P::NAMESPACE,
                        id,
                        secondary,
                        owner = %owner,
                        "[ic-01] Secondary key already owned"
                    );
                    return Err(ViewStoreError::DuplicateKey {
                        namespace: P::NAMESPACE.to_string(),
                        key: secondary.to_string(),
                        owner,
                    });
                }
                Some(_) => {}
                None => batch.push(BatchOperation::put(
                    index_key(P::NAMESPACE, secondary),
                    id.as_bytes(),
                )),
            }
        }

        // A changed secondary key releases the old index entry.
        if let Some(previous) = self.load(id)? {
            if let Some(old) = previous.secondary_key() {
                if Some(old) != secondary {
                    batch.push(BatchOperation::delete(index_key(P::NAMESPACE, old)));
                }
            }
        }

        batch.push(BatchOperation::put(
            record_key(P::NAMESPACE, id),
            Self::encode(record)?,
        ));
        self.store.atomic_batch_write(batch)?;

        debug!(namespace = P::NAMESPACE, id, "[ic-01] Record saved");
        Ok(())
    }

    fn find_all(&self) -> Result<Vec<P>, ViewStoreError> {
        self.store
            .prefix_scan(&record_prefix(P::NAMESPACE))?
            .iter()
            .map(|(_, bytes)| Self::decode(bytes))
            .collect()
    }

    fn find_by_id(&self, id: &str) -> Result<P, ViewStoreError> {
        self.load(id)?.ok_or_else(|| Self::not_found(id))
    }

    fn find_by_secondary_key(&self, key: &str) -> Result<P, ViewStoreError> {
        let owner = self.index_owner(key)?.ok_or_else(|| Self::not_found(key))?;
        self.load(&owner)?.ok_or_else(|| Self::not_found(key))
    }

    fn remove(&self, id: &str) -> Result<bool, ViewStoreError> {
        let _guards = self.stripes.lock_all(&[record_lock(id).as_str()]);

        let Some(previous) = self.load(id)? else {
            debug!(namespace = P::NAMESPACE, id, "[ic-01] Remove of absent record ignored");
            return Ok(false);
        };

        let mut batch = vec![BatchOperation::delete(record_key(P::NAMESPACE, id))];
        if let Some(secondary) = previous.secondary_key() {
            batch.push(BatchOperation::delete(index_key(P::NAMESPACE, secondary)));
        }
        self.store.atomic_batch_write(batch)?;

        debug!(namespace = P::NAMESPACE, id, "[ic-01] Record removed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::{FileBackedKVStore, InMemoryKVStore};
    use crate::domain::errors::KVStoreError;
    use crate::ports::outbound::ScanResult;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Repo {
        id: String,
        url: String,
        name: String,
    }

    impl Repo {
        fn new(id: &str, url: &str) -> Self {
            Self {
                id: id.into(),
                url: url.into(),
                name: format!("repo-{id}"),
            }
        }
    }

    impl Projection for Repo {
        const NAMESPACE: &'static str = "repo";

        fn primary_key(&self) -> &str {
            &self.id
        }

        fn secondary_key(&self) -> Option<&str> {
            Some(&self.url)
        }
    }

    fn repository() -> ViewRepository<Repo> {
        ViewRepository::new(Arc::new(InMemoryKVStore::new()))
    }

    #[test]
    fn test_save_then_find() {
        let repo = repository();
        let record = Repo::new("1", "git@a");
        repo.save(&record).unwrap();

        assert_eq!(repo.find_by_id("1").unwrap(), record);
        assert_eq!(repo.find_by_secondary_key("git@a").unwrap(), record);
        assert_eq!(repo.find_all().unwrap(), vec![record]);
    }

    #[test]
    fn test_save_overwrites() {
        let repo = repository();
        repo.save(&Repo::new("1", "git@a")).unwrap();

        let mut updated = Repo::new("1", "git@a");
        updated.name = "renamed".into();
        repo.save(&updated).unwrap();

        assert_eq!(repo.find_all().unwrap(), vec![updated]);
    }

    #[test]
    fn test_find_missing() {
        let repo = repository();
        assert!(repo.find_by_id("nope").unwrap_err().is_not_found());
        assert!(repo.find_by_secondary_key("nope").unwrap_err().is_not_found());
        assert!(repo.find_all().unwrap().is_empty());
    }

    #[test]
    fn test_find_all_in_key_order() {
        let repo = repository();
        for id in ["c", "a", "b"] {
            repo.save(&Repo::new(id, &format!("git@{id}"))).unwrap();
        }
        let ids: Vec<String> = repo.find_all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_secondary_key_rejected() {
        let repo = repository();
        repo.save(&Repo::new("1", "git@a")).unwrap();

        let err = repo.save(&Repo::new("2", "git@a")).unwrap_err();
        assert!(matches!(err, ViewStoreError::DuplicateKey { ref owner, .. } if owner == "1"));
        assert!(repo.find_by_id("2").unwrap_err().is_not_found());
        assert_eq!(repo.find_by_secondary_key("git@a").unwrap().id, "1");
    }

    #[test]
    fn test_changed_secondary_key_moves_index() {
        let repo = repository();
        repo.save(&Repo::new("1", "git@old")).unwrap();
        repo.save(&Repo::new("1", "git@new")).unwrap();

        assert!(repo.find_by_secondary_key("git@old").unwrap_err().is_not_found());
        assert_eq!(repo.find_by_secondary_key("git@new").unwrap().id, "1");
        // The old key is free again.
        repo.save(&Repo::new("2", "git@old")).unwrap();
    }

    #[test]
    fn test_remove() {
        let repo = repository();
        repo.save(&Repo::new("1", "git@a")).unwrap();

        assert!(repo.remove("1").unwrap());
        assert!(repo.find_by_id("1").unwrap_err().is_not_found());
        assert!(repo.find_by_secondary_key("git@a").unwrap_err().is_not_found());
        assert!(!repo.remove("1").unwrap());
    }

    #[test]
    fn test_namespaces_are_isolated() {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        struct Other {
            id: String,
        }
        impl Projection for Other {
            const NAMESPACE: &'static str = "other";
            fn primary_key(&self) -> &str {
                &self.id
            }
        }

        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKVStore::new());
        let repos = ViewRepository::<Repo>::new(store.clone());
        let others = ViewRepository::<Other>::new(store);

        repos.save(&Repo::new("1", "git@a")).unwrap();
        others.save(&Other { id: "1".into() }).unwrap();

        assert_eq!(repos.find_all().unwrap().len(), 1);
        assert_eq!(others.find_all().unwrap().len(), 1);
    }

    #[test]
    fn test_durable_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("views.db");
        let record = Repo::new("1", "git@a");

        {
            let repo: ViewRepository<Repo> =
                ViewRepository::new(Arc::new(FileBackedKVStore::open(&path).unwrap()));
            repo.save(&record).unwrap();
        }

        let repo: ViewRepository<Repo> =
            ViewRepository::new(Arc::new(FileBackedKVStore::open(&path).unwrap()));
        assert_eq!(repo.find_by_secondary_key("git@a").unwrap(), record);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
            Ok(None)
        }
        fn put(&self, _key: &[u8], _value: &[u8]) -> Result<(), KVStoreError> {
            Err(KVStoreError::io("disk full"))
        }
        fn delete(&self, _key: &[u8]) -> Result<(), KVStoreError> {
            Err(KVStoreError::io("disk full"))
        }
        fn atomic_batch_write(&self, _ops: Vec<BatchOperation>) -> Result<(), KVStoreError> {
            Err(KVStoreError::io("disk full"))
        }
        fn exists(&self, _key: &[u8]) -> Result<bool, KVStoreError> {
            Ok(false)
        }
        fn prefix_scan(&self, _prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_storage_failure_surfaces() {
        let repo: ViewRepository<Repo> = ViewRepository::new(Arc::new(FailingStore));
        assert!(matches!(
            repo.save(&Repo::new("1", "git@a")),
            Err(ViewStoreError::Storage(_))
        ));
    }

    #[test]
    fn test_concurrent_claims_on_one_secondary_key() {
        let repo = repository();
        let winners: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let repo = &repo;
                    s.spawn(move || repo.save(&Repo::new(&i.to_string(), "git@shared")).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| usize::from(h.join().unwrap()))
                .sum()
        });

        assert_eq!(winners, 1);
        assert_eq!(repo.find_all().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_writers_on_distinct_keys() {
        let repo = repository();
        std::thread::scope(|s| {
            for i in 0..8 {
                let repo = &repo;
                s.spawn(move || {
                    for j in 0..25 {
                        let id = format!("{i}-{j}");
                        repo.save(&Repo::new(&id, &format!("git@{id}"))).unwrap();
                    }
                });
            }
        });
        assert_eq!(repo.find_all().unwrap().len(), 200);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Save(u8, u8),
        Remove(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..6, 0u8..6).prop_map(|(id, url)| Op::Save(id, url)),
            (0u8..6).prop_map(Op::Remove),
        ]
    }

    proptest! {
        /// The secondary index always agrees with a simple model.
        #[test]
        fn prop_index_matches_model(ops in proptest::collection::vec(op(), 1..40)) {
            let repo = repository();
            let mut model: HashMap<String, String> = HashMap::new();

            for op in ops {
                match op {
                    Op::Save(id, url) => {
                        let (id, url) = (id.to_string(), format!("git@{url}"));
                        let taken = model.iter().any(|(k, v)| *v == url && *k != id);
                        let result = repo.save(&Repo::new(&id, &url));
                        prop_assert_eq!(result.is_ok(), !taken);
                        if !taken {
                            model.insert(id, url);
                        }
                    }
                    Op::Remove(id) => {
                        let id = id.to_string();
                        prop_assert_eq!(repo.remove(&id).unwrap(), model.remove(&id).is_some());
                    }
                }
            }

            prop_assert_eq!(repo.find_all().unwrap().len(), model.len());
            for (id, url) in &model {
                let found = repo.find_by_secondary_key(url).unwrap();
                prop_assert_eq!(&found.id, id);
            }
        }
    }
}
