use super::*;
use crate::mock::MemoryStore;
use crate::test_utils::*;

fn endpoint() -> ApiEndpoint {
    ApiEndpoint {
        host: "api.example.test".to_string(),
        port: 6443,
    }
}

fn platform() -> VSphere {
    VSphere::new(&PlatformConfig::default())
}

#[tokio::test]
async fn test_infra_cr_created_ready_and_externally_managed() {
    let store = MemoryStore::new();
    let cluster = vsphere_cluster();

    let result = platform()
        .reconcile_capi_infra_cr(&store, &cluster, CONTROL_PLANE_NAMESPACE, &endpoint())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.name(), INFRA_ID);
    assert!(result.is_ready());

    let stored: VSphereCluster = store.object(CONTROL_PLANE_NAMESPACE, INFRA_ID).unwrap();
    let annotations = stored.metadata.annotations.clone().unwrap();
    assert_eq!(annotations[HOSTED_CLUSTER_ANNOTATION], "clusters/example");
    assert_eq!(annotations[CAPI_MANAGED_BY_ANNOTATION], CAPI_MANAGED_BY_EXTERNAL);
    assert!(stored.status.unwrap().ready);
    assert!(stored.spec.infra_cluster_secret_ref.is_none());
}

#[tokio::test]
async fn test_infra_cr_references_copied_credentials() {
    let store = MemoryStore::new();
    let cluster = vsphere_cluster_with_credentials();

    platform()
        .reconcile_capi_infra_cr(&store, &cluster, CONTROL_PLANE_NAMESPACE, &endpoint())
        .await
        .unwrap();

    let stored: VSphereCluster = store.object(CONTROL_PLANE_NAMESPACE, INFRA_ID).unwrap();
    assert_eq!(
        stored.spec.infra_cluster_secret_ref,
        Some(ObjectReference::secret(CREDENTIALS_SECRET_NAME, CONTROL_PLANE_NAMESPACE))
    );
}

#[tokio::test]
async fn test_infra_cr_second_reconcile_is_noop() {
    let store = MemoryStore::new();
    let cluster = vsphere_cluster_with_credentials();
    let vsphere = platform();

    vsphere
        .reconcile_capi_infra_cr(&store, &cluster, CONTROL_PLANE_NAMESPACE, &endpoint())
        .await
        .unwrap();
    let first: VSphereCluster = store.object(CONTROL_PLANE_NAMESPACE, INFRA_ID).unwrap();

    let second = vsphere
        .reconcile_capi_infra_cr(&store, &cluster, CONTROL_PLANE_NAMESPACE, &endpoint())
        .await
        .unwrap()
        .unwrap();
    let after: VSphereCluster = store.object(CONTROL_PLANE_NAMESPACE, INFRA_ID).unwrap();

    assert!(second.is_ready());
    assert_eq!(first.metadata.uid, after.metadata.uid);
    assert_eq!(first.metadata.resource_version, after.metadata.resource_version);
    assert_eq!(first.spec, after.spec);
}

#[tokio::test]
async fn test_infra_cr_keeps_foreign_fields() {
    let store = MemoryStore::new();
    let cluster = vsphere_cluster();

    let mut existing = VSphereCluster::new(
        INFRA_ID,
        VSphereClusterSpec {
            infra_cluster_secret_ref: None,
            control_plane_endpoint: Some(ApiEndpoint {
                host: "10.0.0.10".to_string(),
                port: 6443,
            }),
        },
    );
    existing.metadata.namespace = Some(CONTROL_PLANE_NAMESPACE.to_string());
    existing.metadata.annotations = Some(BTreeMap::from([(
        "cluster.x-k8s.io/paused".to_string(),
        "true".to_string(),
    )]));
    store.insert(&existing);

    platform()
        .reconcile_capi_infra_cr(&store, &cluster, CONTROL_PLANE_NAMESPACE, &endpoint())
        .await
        .unwrap();

    let stored: VSphereCluster = store.object(CONTROL_PLANE_NAMESPACE, INFRA_ID).unwrap();
    let annotations = stored.metadata.annotations.unwrap();
    assert_eq!(annotations["cluster.x-k8s.io/paused"], "true");
    assert_eq!(annotations[CAPI_MANAGED_BY_ANNOTATION], CAPI_MANAGED_BY_EXTERNAL);
    assert_eq!(stored.spec.control_plane_endpoint.unwrap().host, "10.0.0.10");
}

#[tokio::test]
async fn test_infra_cr_rejects_empty_infra_id() {
    let store = MemoryStore::new();
    let mut cluster = vsphere_cluster();
    cluster.spec.infra_id = String::new();

    let err = platform()
        .reconcile_capi_infra_cr(&store, &cluster, CONTROL_PLANE_NAMESPACE, &endpoint())
        .await
        .unwrap_err();

    assert!(matches!(err, PlatformError::InvalidCluster { .. }));
    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn test_infra_cr_upsert_failure_is_surfaced() {
    let store = MemoryStore::new();
    store.fail_upserts("connection refused");

    let err = platform()
        .reconcile_capi_infra_cr(&store, &vsphere_cluster(), CONTROL_PLANE_NAMESPACE, &endpoint())
        .await
        .unwrap_err();

    match err {
        PlatformError::Upsert { kind, source, .. } => {
            assert_eq!(kind, "VSphereCluster");
            assert!(source.to_string().contains("connection refused"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.operations(), 1);
}

#[tokio::test]
async fn test_credentials_without_configuration_touch_nothing() {
    let store = MemoryStore::new();

    platform()
        .reconcile_credentials(&store, &vsphere_cluster(), CONTROL_PLANE_NAMESPACE)
        .await
        .unwrap();

    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn test_credentials_merge_keeps_unrelated_keys() {
    let store = MemoryStore::new();
    store.insert(&secret(
        CLUSTER_NAMESPACE,
        SOURCE_SECRET,
        &[("A", "source-a"), ("B", "source-b")],
    ));
    store.insert(&secret(
        CONTROL_PLANE_NAMESPACE,
        CREDENTIALS_SECRET_NAME,
        &[("A", "target-a"), ("C", "target-c")],
    ));

    platform()
        .reconcile_credentials(&store, &vsphere_cluster_with_credentials(), CONTROL_PLANE_NAMESPACE)
        .await
        .unwrap();

    let target: Secret = store
        .object(CONTROL_PLANE_NAMESPACE, CREDENTIALS_SECRET_NAME)
        .unwrap();
    assert_eq!(secret_value(&target, "A").as_deref(), Some("source-a"));
    assert_eq!(secret_value(&target, "B").as_deref(), Some("source-b"));
    assert_eq!(secret_value(&target, "C").as_deref(), Some("target-c"));

    // source is read, never written
    let source: Secret = store.object(CLUSTER_NAMESPACE, SOURCE_SECRET).unwrap();
    assert_eq!(secret_value(&source, "C"), None);
}

#[tokio::test]
async fn test_credentials_create_target_secret() {
    let store = MemoryStore::new();
    store.insert(&secret(CLUSTER_NAMESPACE, SOURCE_SECRET, &[("kubeconfig", "cfg")]));

    platform()
        .reconcile_credentials(&store, &vsphere_cluster_with_credentials(), CONTROL_PLANE_NAMESPACE)
        .await
        .unwrap();

    let target: Secret = store
        .object(CONTROL_PLANE_NAMESPACE, CREDENTIALS_SECRET_NAME)
        .unwrap();
    assert_eq!(target.type_.as_deref(), Some("Opaque"));
    assert_eq!(secret_value(&target, "kubeconfig").as_deref(), Some("cfg"));
}

#[tokio::test]
async fn test_credentials_missing_source_writes_nothing() {
    let store = MemoryStore::new();

    let err = platform()
        .reconcile_credentials(&store, &vsphere_cluster_with_credentials(), CONTROL_PLANE_NAMESPACE)
        .await
        .unwrap_err();

    match &err {
        PlatformError::SourceSecret { namespace, name, source } => {
            assert_eq!(namespace, CLUSTER_NAMESPACE);
            assert_eq!(name, SOURCE_SECRET);
            assert!(source.is_not_found());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().starts_with("failed to get secret clusters/example-infra-credentials"));
    assert_eq!(store.operations(), 1);
    assert!(
        store
            .object::<Secret>(CONTROL_PLANE_NAMESPACE, CREDENTIALS_SECRET_NAME)
            .is_none()
    );
}

#[tokio::test]
async fn test_credentials_upsert_failure_is_surfaced() {
    let store = MemoryStore::new();
    store.insert(&secret(CLUSTER_NAMESPACE, SOURCE_SECRET, &[("kubeconfig", "cfg")]));
    store.fail_upserts("etcd timeout");

    let err = platform()
        .reconcile_credentials(&store, &vsphere_cluster_with_credentials(), CONTROL_PLANE_NAMESPACE)
        .await
        .unwrap_err();

    assert!(matches!(err, PlatformError::Upsert { ref kind, .. } if kind == "Secret"));
}

#[tokio::test]
async fn test_delete_credentials_removes_copied_secret() {
    let store = MemoryStore::new();
    store.insert(&secret(
        CONTROL_PLANE_NAMESPACE,
        CREDENTIALS_SECRET_NAME,
        &[("kubeconfig", "cfg")],
    ));

    platform()
        .delete_credentials(&store, &vsphere_cluster_with_credentials(), CONTROL_PLANE_NAMESPACE)
        .await
        .unwrap();

    assert!(
        store
            .object::<Secret>(CONTROL_PLANE_NAMESPACE, CREDENTIALS_SECRET_NAME)
            .is_none()
    );
}

#[tokio::test]
async fn test_delete_credentials_tolerates_absence() {
    let store = MemoryStore::new();
    let vsphere = platform();

    vsphere
        .delete_credentials(&store, &vsphere_cluster_with_credentials(), CONTROL_PLANE_NAMESPACE)
        .await
        .unwrap();
    vsphere
        .delete_credentials(&store, &vsphere_cluster(), CONTROL_PLANE_NAMESPACE)
        .await
        .unwrap();

    // only the configured cluster reaches the store
    assert_eq!(store.operations(), 1);
}

#[tokio::test]
async fn test_secret_encryption_is_noop() {
    let store = MemoryStore::new();

    platform()
        .reconcile_secret_encryption(&store, &vsphere_cluster(), CONTROL_PLANE_NAMESPACE)
        .await
        .unwrap();

    assert_eq!(store.operations(), 0);
}

fn deployment_image(vsphere: &VSphere, cluster: &HostedCluster) -> String {
    let spec = vsphere
        .capi_provider_deployment_spec(cluster, &control_plane(cluster))
        .unwrap()
        .unwrap();
    spec.template.spec.unwrap().containers[0].image.clone().unwrap()
}

fn annotate_image(cluster: &mut HostedCluster, image: &str) {
    cluster.metadata.annotations = Some(BTreeMap::from([(
        VSPHERE_CAPI_PROVIDER_IMAGE_ANNOTATION.to_string(),
        image.to_string(),
    )]));
}

#[test]
fn test_provider_image_defaults() {
    assert_eq!(
        deployment_image(&platform(), &vsphere_cluster()),
        DEFAULT_VSPHERE_CAPI_PROVIDER_IMAGE
    );
}

#[test]
fn test_provider_image_annotation_beats_default() {
    let mut cluster = vsphere_cluster();
    annotate_image(&mut cluster, "quay.io/example/capv:dev");

    assert_eq!(deployment_image(&platform(), &cluster), "quay.io/example/capv:dev");
}

#[test]
fn test_provider_image_env_beats_annotation() {
    let mut cluster = vsphere_cluster();
    annotate_image(&mut cluster, "quay.io/example/capv:dev");
    let vsphere = VSphere::new(&PlatformConfig {
        vsphere_capi_provider_image: Some("registry.local/capv:pinned".to_string()),
    });

    assert_eq!(deployment_image(&vsphere, &cluster), "registry.local/capv:pinned");
}

#[test]
fn test_provider_image_empty_values_are_unset() {
    let mut cluster = vsphere_cluster();
    annotate_image(&mut cluster, "");
    let vsphere = VSphere::new(&PlatformConfig {
        vsphere_capi_provider_image: Some(String::new()),
    });

    assert_eq!(deployment_image(&vsphere, &cluster), DEFAULT_VSPHERE_CAPI_PROVIDER_IMAGE);
}

#[test]
fn test_deployment_spec_shape() {
    let cluster = vsphere_cluster();
    let spec = platform()
        .capi_provider_deployment_spec(&cluster, &control_plane(&cluster))
        .unwrap()
        .unwrap();

    assert_eq!(spec.replicas, Some(1));
    let pod = spec.template.spec.unwrap();
    assert_eq!(pod.termination_grace_period_seconds, Some(10));
    assert_eq!(
        pod.volumes.unwrap()[0].secret.as_ref().unwrap().default_mode,
        Some(0o640)
    );

    let container = &pod.containers[0];
    assert_eq!(container.name, "manager");
    assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 9440);
    assert_eq!(
        container.env.as_ref().unwrap()[0]
            .value_from
            .as_ref()
            .unwrap()
            .field_ref
            .as_ref()
            .unwrap()
            .field_path,
        "metadata.namespace"
    );
    let requests = container.resources.as_ref().unwrap().requests.as_ref().unwrap();
    assert_eq!(requests["memory"], Quantity("100Mi".to_string()));
    assert_eq!(requests["cpu"], Quantity("10m".to_string()));
}

#[test]
fn test_policy_rules() {
    let rules = platform().capi_provider_policy_rules();

    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].api_groups, Some(vec![String::new()]));
    assert_eq!(rules[0].resources, Some(vec!["services".to_string()]));
    assert_eq!(rules[1].api_groups, Some(vec!["vsphere.io".to_string()]));
    assert_eq!(
        rules[1].resources,
        Some(vec![
            "virtualmachineinstances".to_string(),
            "virtualmachines".to_string()
        ])
    );
    assert!(rules.iter().all(|rule| rule.verbs == vec!["*".to_string()]));
}
