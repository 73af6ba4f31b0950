//! Kubernetes-backed store
//!
//! Implements [`ObjectStore`] and [`Upsert`] on top of a `kube::Client`.
//! Updates use `replace` so the API server rejects writes based on a stale
//! `resourceVersion`; those 409 conflicts are retried here with a Fibonacci
//! backoff and a fresh read.

use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use serde::Serialize;
use tracing::{debug, warn};

use crate::backoff::FibonacciBackoff;
use crate::store::{ObjectStore, StoreError, StoreObject, Upsert, UpsertOutcome, object_key};

/// Attempts made before a conflicting write is reported
const MAX_CONFLICT_ATTEMPTS: u32 = 5;

/// Store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    /// Creates a store using the given client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Writes `status` through the status subresource when the mutation changed it.
    async fn sync_status<K: StoreObject>(
        api: &Api<K>,
        name: &str,
        desired: &K,
        written: K,
    ) -> Result<K, StoreError> {
        match status_patch(desired, &written)? {
            Some(patch) => {
                debug!("Updating status of {} {}", K::kind(&()), name);
                Ok(api
                    .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?)
            }
            None => Ok(written),
        }
    }
}

/// Merge patch for the status subresource, or `None` when the written object
/// already carries the desired status.
///
/// Create and replace ignore `status` on resources with a status subresource,
/// so it is sent separately.
fn status_patch<K: Serialize>(
    desired: &K,
    written: &K,
) -> Result<Option<serde_json::Value>, serde_json::Error> {
    let desired_status = serde_json::to_value(desired)?.get("status").cloned();
    let written_status = serde_json::to_value(written)?.get("status").cloned();
    Ok(match desired_status {
        Some(status) if !status.is_null() && Some(&status) != written_status.as_ref() => {
            Some(serde_json::json!({ "status": status }))
        }
        _ => None,
    })
}

fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

#[async_trait::async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K, StoreError> {
        match self.api::<K>(namespace).get(name).await {
            Ok(obj) => Ok(obj),
            Err(e) if is_not_found(&e) => Err(StoreError::NotFound {
                kind: K::kind(&()).to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, StoreError> {
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl Upsert for KubeStore {
    async fn create_or_update<K, F>(
        &self,
        desired: K,
        mutate: F,
    ) -> Result<(K, UpsertOutcome), StoreError>
    where
        K: StoreObject,
        F: Fn(&mut K) + Send + Sync,
    {
        let (namespace, name) = object_key(&desired)?;
        let api = self.api::<K>(&namespace);
        let what = format!("{} {}/{}", K::kind(&()), namespace, name);
        let (api, name, desired, mutate) = (&api, name.as_str(), &desired, &mutate);

        let result = retry_on_conflict(&what, move || async move {
            let (desired_state, written, outcome) = match api.get_opt(name).await? {
                None => {
                    let mut obj = desired.clone();
                    mutate(&mut obj);
                    let created = api.create(&PostParams::default(), &obj).await?;
                    (obj, created, UpsertOutcome::Created)
                }
                Some(current) => {
                    let mut obj = current.clone();
                    mutate(&mut obj);
                    if serde_json::to_value(&obj)? == serde_json::to_value(&current)? {
                        return Ok::<_, StoreError>((current, UpsertOutcome::Unchanged));
                    }
                    let updated = api.replace(name, &PostParams::default(), &obj).await?;
                    (obj, updated, UpsertOutcome::Updated)
                }
            };
            let written = Self::sync_status(api, name, &desired_state, written).await?;
            Ok::<_, StoreError>((written, outcome))
        })
        .await?;

        match result {
            Some((written, outcome)) => {
                debug!("{} {:?}", what, outcome);
                Ok((written, outcome))
            }
            None => Err(StoreError::Conflict {
                kind: K::kind(&()).to_string(),
                namespace,
                name: name.to_string(),
                attempts: MAX_CONFLICT_ATTEMPTS,
            }),
        }
    }
}

/// Runs `attempt` until it finishes without a write conflict, at most
/// [`MAX_CONFLICT_ATTEMPTS`] times with a Fibonacci backoff in between.
/// `None` means every attempt conflicted.
async fn retry_on_conflict<T, F, Fut>(
    what: &str,
    mut attempt: F,
) -> Result<Option<T>, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut backoff = FibonacciBackoff::default();
    for n in 1..=MAX_CONFLICT_ATTEMPTS {
        match attempt().await {
            Err(StoreError::Kube(e)) if is_conflict(&e) => {
                if n == MAX_CONFLICT_ATTEMPTS {
                    break;
                }
                let delay = backoff.next_backoff();
                warn!("Conflict writing {} (attempt {}), retrying in {:?}", what, n, delay);
                tokio::time::sleep(delay).await;
            }
            result => return result.map(Some),
        }
    }
    Ok(None)
}
