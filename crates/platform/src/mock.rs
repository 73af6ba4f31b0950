//! In-memory store for unit testing
//!
//! Keeps objects as JSON keyed by (apiVersion/kind, namespace, name), applies
//! the same create-or-update semantics as the kube-backed store and counts
//! every operation so tests can assert on store traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::store::{ObjectStore, StoreError, StoreObject, Upsert, UpsertOutcome, object_key};

type ObjectKey = (String, String, String);

/// In-memory store
///
/// Writes bump `metadata.resourceVersion`; creation assigns a `uid`.
#[derive(Clone, Default, Debug)]
pub struct MemoryStore {
    objects: Arc<Mutex<HashMap<ObjectKey, serde_json::Value>>>,
    operations: Arc<AtomicUsize>,
    next_version: Arc<AtomicUsize>,
    upsert_failure: Arc<Mutex<Option<String>>>,
    delete_failure: Arc<Mutex<Option<String>>>,
}

fn type_key<K: StoreObject>() -> String {
    format!("{}/{}", K::api_version(&()), K::kind(&()))
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object to the store (for test setup, not counted)
    pub fn insert<K: StoreObject>(&self, obj: &K) {
        let (namespace, name) = object_key(obj).expect("test object needs namespace and name");
        let value = serde_json::to_value(obj).expect("test object serializes");
        self.objects
            .lock()
            .unwrap()
            .insert((type_key::<K>(), namespace, name), value);
    }

    /// Read an object back (for assertions, not counted)
    pub fn object<K: StoreObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let key = (type_key::<K>(), namespace.to_string(), name.to_string());
        self.objects
            .lock()
            .unwrap()
            .get(&key)
            .map(|value| serde_json::from_value(value.clone()).expect("stored object deserializes"))
    }

    /// Number of get/upsert/delete calls made against the store
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Make every following upsert fail with the given message
    pub fn fail_upserts(&self, message: impl Into<String>) {
        *self.upsert_failure.lock().unwrap() = Some(message.into());
    }

    /// Make every following delete fail with the given message
    pub fn fail_deletes(&self, message: impl Into<String>) {
        *self.delete_failure.lock().unwrap() = Some(message.into());
    }

    fn record(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }

    fn next_version(&self) -> String {
        (self.next_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K, StoreError> {
        self.record();
        let key = (type_key::<K>(), namespace.to_string(), name.to_string());
        let value = self.objects.lock().unwrap().get(&key).cloned();
        match value {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Err(StoreError::NotFound {
                kind: K::kind(&()).to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
        }
    }

    async fn delete<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, StoreError> {
        self.record();
        if let Some(message) = self.delete_failure.lock().unwrap().clone() {
            return Err(StoreError::Unavailable(message));
        }
        let key = (type_key::<K>(), namespace.to_string(), name.to_string());
        Ok(self.objects.lock().unwrap().remove(&key).is_some())
    }
}

#[async_trait::async_trait]
impl Upsert for MemoryStore {
    async fn create_or_update<K, F>(
        &self,
        desired: K,
        mutate: F,
    ) -> Result<(K, UpsertOutcome), StoreError>
    where
        K: StoreObject,
        F: Fn(&mut K) + Send + Sync,
    {
        self.record();
        if let Some(message) = self.upsert_failure.lock().unwrap().clone() {
            return Err(StoreError::Unavailable(message));
        }

        let (namespace, name) = object_key(&desired)?;
        let key = (type_key::<K>(), namespace, name);
        let current = self.objects.lock().unwrap().get(&key).cloned();

        let (mut obj, outcome) = match current {
            None => {
                let mut obj = desired;
                mutate(&mut obj);
                obj.meta_mut().uid = Some(uuid::Uuid::new_v4().to_string());
                (obj, UpsertOutcome::Created)
            }
            Some(value) => {
                let current: K = serde_json::from_value(value.clone())?;
                let mut obj = current.clone();
                mutate(&mut obj);
                if serde_json::to_value(&obj)? == value {
                    return Ok((current, UpsertOutcome::Unchanged));
                }
                (obj, UpsertOutcome::Updated)
            }
        };

        obj.meta_mut().resource_version = Some(self.next_version());
        self.objects
            .lock()
            .unwrap()
            .insert(key, serde_json::to_value(&obj)?);
        Ok((obj, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn secret(name: &str) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("clusters".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_unchanged() {
        let store = MemoryStore::new();
        let set_type = |s: &mut Secret| s.type_ = Some("Opaque".to_string());

        let (created, outcome) = store.create_or_update(secret("a"), set_type).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);
        assert!(created.metadata.uid.is_some());

        let (again, outcome) = store.create_or_update(secret("a"), set_type).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Unchanged);
        assert_eq!(again.metadata.uid, created.metadata.uid);
        assert_eq!(again.metadata.resource_version, created.metadata.resource_version);
        assert_eq!(store.operations(), 2);
    }

    #[tokio::test]
    async fn test_update_mutates_current_object() {
        let store = MemoryStore::new();
        let mut existing = secret("a");
        existing.string_data = Some(BTreeMap::from([("k".to_string(), "v".to_string())]));
        store.insert(&existing);

        let (updated, outcome) = store
            .create_or_update(secret("a"), |s: &mut Secret| s.type_ = Some("Opaque".to_string()))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        // Fields of the stored object survive; `desired` only seeds creation
        assert_eq!(updated.string_data, existing.string_data);
        assert_eq!(updated.type_.as_deref(), Some("Opaque"));
    }

    #[tokio::test]
    async fn test_get_missing_and_delete() {
        let store = MemoryStore::new();
        let err = store.get::<Secret>("clusters", "missing").await.unwrap_err();
        assert!(err.is_not_found());

        store.insert(&secret("a"));
        assert!(store.delete::<Secret>("clusters", "a").await.unwrap());
        assert!(!store.delete::<Secret>("clusters", "a").await.unwrap());
        assert!(store.object::<Secret>("clusters", "a").is_none());
    }

    #[tokio::test]
    async fn test_fail_upserts() {
        let store = MemoryStore::new();
        store.fail_upserts("etcd down");
        let err = store
            .create_or_update(secret("a"), |_: &mut Secret| {})
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(msg) if msg == "etcd down"));
        assert!(store.object::<Secret>("clusters", "a").is_none());
    }
}
