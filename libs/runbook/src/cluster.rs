//! Kubernetes API access.
//!
//! - `KubeCluster` - talks to the API server through `kube::Client`
//! - `MockCluster` - in-memory store for tests

use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams, PostParams};
use kube::config::KubeConfigOptions;
use kube::{Client, Resource, ResourceExt};
use minikeda_manifests::ScaledObject;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::{Result, RunbookError};

/// An object the API server accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedResource {
    pub kind: &'static str,
    pub name: String,
    pub namespace: String,
    pub uid: Option<String>,
}

impl CreatedResource {
    fn from_meta(kind: &'static str, meta: &ObjectMeta) -> Self {
        Self {
            kind,
            name: meta.name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone().unwrap_or_default(),
            uid: meta.uid.clone(),
        }
    }
}

/// The cluster operations the runbook needs.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn create_deployment(&self, deployment: &Deployment) -> Result<CreatedResource>;

    async fn create_service(&self, service: &Service) -> Result<CreatedResource>;

    async fn create_scaled_object(&self, scaled_object: &ScaledObject) -> Result<CreatedResource>;

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>>;
}

#[async_trait]
impl<T: ClusterApi + ?Sized> ClusterApi for Arc<T> {
    async fn create_deployment(&self, deployment: &Deployment) -> Result<CreatedResource> {
        (**self).create_deployment(deployment).await
    }

    async fn create_service(&self, service: &Service) -> Result<CreatedResource> {
        (**self).create_service(service).await
    }

    async fn create_scaled_object(&self, scaled_object: &ScaledObject) -> Result<CreatedResource> {
        (**self).create_scaled_object(scaled_object).await
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>> {
        (**self).list_deployments(namespace).await
    }
}

/// API server access through a kubeconfig context.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Connect using the named kubeconfig context (e.g. `minikube`).
    pub async fn connect(context: &str) -> Result<Self> {
        let options = KubeConfigOptions {
            context: Some(context.to_string()),
            ..Default::default()
        };
        let config = kube::Config::from_kubeconfig(&options).await?;
        info!(context, cluster_url = %config.cluster_url, "Loaded kubeconfig");

        let client = Client::try_from(config)?;
        Ok(Self { client })
    }

    async fn create<K>(&self, kind: &'static str, object: &K) -> Result<CreatedResource>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned
            + Send
            + Sync,
        K::DynamicType: Default,
    {
        let name = object.name_any();
        let namespace = object.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);

        let created = api
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| create_error(kind, &name, &namespace, e))?;

        let resource = CreatedResource::from_meta(kind, created.meta());
        info!(kind, name = %resource.name, namespace = %resource.namespace, "Created resource");
        Ok(resource)
    }
}

/// HTTP 409 on create means the name is taken.
fn create_error(kind: &'static str, name: &str, namespace: &str, err: kube::Error) -> RunbookError {
    match err {
        kube::Error::Api(response) if response.code == 409 => RunbookError::AlreadyExists {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        other => RunbookError::Kube(other),
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn create_deployment(&self, deployment: &Deployment) -> Result<CreatedResource> {
        self.create("Deployment", deployment).await
    }

    async fn create_service(&self, service: &Service) -> Result<CreatedResource> {
        self.create("Service", service).await
    }

    async fn create_scaled_object(&self, scaled_object: &ScaledObject) -> Result<CreatedResource> {
        self.create("ScaledObject", scaled_object).await
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

#[derive(Debug, Default)]
struct MockState {
    deployments: Vec<Deployment>,
    services: Vec<Service>,
    scaled_objects: Vec<ScaledObject>,
    next_uid: u64,
}

impl MockState {
    fn assign_uid(&mut self, meta: &mut ObjectMeta) {
        self.next_uid += 1;
        meta.uid = Some(format!("00000000-0000-0000-0000-{:012}", self.next_uid));
        meta.generation = Some(1);
    }
}

/// In-memory cluster.
///
/// Objects get sequential UIDs and generation 1; deployments start with no
/// status until [`MockCluster::set_deployment_status`] is called, which also
/// marks the current generation as observed.
#[derive(Debug, Default)]
pub struct MockCluster {
    state: Mutex<MockState>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set replica counts on a stored deployment. Returns false if unknown.
    pub fn set_deployment_status(&self, name: &str, ready_replicas: i32, replicas: i32) -> bool {
        let mut state = self.state();
        match state
            .deployments
            .iter_mut()
            .find(|d| d.metadata.name.as_deref() == Some(name))
        {
            Some(deployment) => {
                deployment.status = Some(DeploymentStatus {
                    ready_replicas: Some(ready_replicas),
                    replicas: Some(replicas),
                    observed_generation: deployment.metadata.generation,
                    ..Default::default()
                });
                true
            }
            None => false,
        }
    }

    pub fn deployments(&self) -> Vec<Deployment> {
        self.state().deployments.clone()
    }

    pub fn services(&self) -> Vec<Service> {
        self.state().services.clone()
    }

    pub fn scaled_objects(&self) -> Vec<ScaledObject> {
        self.state().scaled_objects.clone()
    }
}

fn same_object(a: &ObjectMeta, b: &ObjectMeta) -> bool {
    a.name == b.name && a.namespace == b.namespace
}

fn conflict(kind: &'static str, meta: &ObjectMeta) -> RunbookError {
    RunbookError::AlreadyExists {
        kind,
        name: meta.name.clone().unwrap_or_default(),
        namespace: meta.namespace.clone().unwrap_or_default(),
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn create_deployment(&self, deployment: &Deployment) -> Result<CreatedResource> {
        let mut state = self.state();
        if state
            .deployments
            .iter()
            .any(|d| same_object(&d.metadata, &deployment.metadata))
        {
            return Err(conflict("Deployment", &deployment.metadata));
        }
        let mut stored = deployment.clone();
        state.assign_uid(&mut stored.metadata);
        let created = CreatedResource::from_meta("Deployment", &stored.metadata);
        state.deployments.push(stored);
        Ok(created)
    }

    async fn create_service(&self, service: &Service) -> Result<CreatedResource> {
        let mut state = self.state();
        if state
            .services
            .iter()
            .any(|s| same_object(&s.metadata, &service.metadata))
        {
            return Err(conflict("Service", &service.metadata));
        }
        let mut stored = service.clone();
        state.assign_uid(&mut stored.metadata);
        let created = CreatedResource::from_meta("Service", &stored.metadata);
        state.services.push(stored);
        Ok(created)
    }

    async fn create_scaled_object(&self, scaled_object: &ScaledObject) -> Result<CreatedResource> {
        let mut state = self.state();
        if state
            .scaled_objects
            .iter()
            .any(|s| same_object(&s.metadata, &scaled_object.metadata))
        {
            return Err(conflict("ScaledObject", &scaled_object.metadata));
        }
        let mut stored = scaled_object.clone();
        state.assign_uid(&mut stored.metadata);
        let created = CreatedResource::from_meta("ScaledObject", &stored.metadata);
        state.scaled_objects.push(stored);
        Ok(created)
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>> {
        Ok(self
            .state()
            .deployments
            .iter()
            .filter(|d| d.metadata.namespace.as_deref() == Some(namespace))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minikeda_manifests::{build_deployment, WorkloadSpec};

    #[tokio::test]
    async fn mock_assigns_uids_and_rejects_duplicates() {
        let cluster = MockCluster::new();
        let deployment = build_deployment(&WorkloadSpec::new("web", "nginx")).unwrap();

        let created = cluster.create_deployment(&deployment).await.unwrap();
        assert_eq!(created.kind, "Deployment");
        assert_eq!(created.name, "web");
        assert_eq!(created.namespace, "default");
        assert!(created.uid.is_some());

        let err = cluster.create_deployment(&deployment).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn mock_lists_by_namespace() {
        let cluster = MockCluster::new();
        let a = build_deployment(&WorkloadSpec::new("a", "nginx")).unwrap();
        let b = build_deployment(&WorkloadSpec::new("b", "nginx").with_namespace("apps")).unwrap();
        cluster.create_deployment(&a).await.unwrap();
        cluster.create_deployment(&b).await.unwrap();

        let listed = cluster.list_deployments("apps").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].metadata.name.as_deref(), Some("b"));
    }

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{reason} from the API server"),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn conflict_from_api_server_becomes_already_exists() {
        let err = create_error("Service", "web-service", "apps", api_error(409, "AlreadyExists"));
        match err {
            RunbookError::AlreadyExists {
                kind,
                name,
                namespace,
            } => {
                assert_eq!(kind, "Service");
                assert_eq!(name, "web-service");
                assert_eq!(namespace, "apps");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn other_api_errors_stay_kube_errors() {
        let err = create_error("Service", "web-service", "apps", api_error(422, "Invalid"));
        assert!(matches!(err, RunbookError::Kube(kube::Error::Api(ref r)) if r.code == 422));
    }

    #[test]
    fn set_status_on_unknown_deployment_returns_false() {
        assert!(!MockCluster::new().set_deployment_status("ghost", 1, 1));
    }
}
