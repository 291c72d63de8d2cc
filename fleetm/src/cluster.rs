use crate::errors::Error;
use crate::errors::Result;
use aimmo_api as api;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment as KubeDeployment;
use k8s_openapi::api::core::v1::Service as KubeService;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use kube::Config as KubeConfig;
use kube::Error as KubeError;
use kube::api::DeleteParams as KubeDeleteParams;
use kube::api::ListParams as KubeListParams;
use kube::config::KubeConfigOptions;
use std::sync::Arc;

/*
 * Which workloads in the namespace we consider ours.  `Owned` goes by the
 * managed-by label; `All` is the legacy behaviour of wiping the namespace.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionScope {
    Owned { selector: String },
    All,
}

impl DeletionScope {

    pub fn list_params(&self) -> KubeListParams {
	match self {
	    DeletionScope::Owned{ selector } => KubeListParams::default().labels(selector),
	    DeletionScope::All => KubeListParams::default(),
	}
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
    Failed(String),
}

impl DeleteOutcome {

    pub fn is_failed(&self) -> bool {
	matches!(self, DeleteOutcome::Failed(_))
    }
}

/* 404 from the API server means somebody got there before us, that's fine */
fn delete_outcome<T>(result: Result<T, KubeError>) -> DeleteOutcome {
    match result {
	Ok(_) => DeleteOutcome::Deleted,
	Err(KubeError::Api(response)) if response.code == 404 => DeleteOutcome::AlreadyAbsent,
	Err(err) => DeleteOutcome::Failed(err.to_string()),
    }
}

/*
 * The part of the control plane the manager talks to directly, always
 * scoped to a single namespace.
 */
#[async_trait]
pub trait ClusterApi: Send + Sync {
    fn namespace(&self) -> &str;

    async fn list_deployments(&self, scope: &DeletionScope) -> Result<Vec<String>>;

    async fn delete_deployment(&self, name: &str) -> DeleteOutcome;

    async fn list_services(&self, scope: &DeletionScope) -> Result<Vec<String>>;

    async fn delete_service(&self, name: &str) -> DeleteOutcome;

    async fn list_fleets(&self) -> Result<Vec<String>>;
}

/* Loads credentials for a kube context and hands back a namespaced client */
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, context: &str, namespace: &str) -> Result<Arc<dyn ClusterApi>>;
}

#[derive(Clone)]
pub struct KubeCluster {
    namespace: String,

    /* k8s internal references */
    deployment_api: KubeApi<KubeDeployment>,
    service_api: KubeApi<KubeService>,
    fleet_api: KubeApi<api::Fleet>,
}

impl KubeCluster {

    pub fn new(kube_client: KubeClient, namespace: &str) -> Self {
	Self{
	    namespace: namespace.to_string(),
	    deployment_api: KubeApi::namespaced(kube_client.clone(), namespace),
	    service_api: KubeApi::namespaced(kube_client.clone(), namespace),
	    fleet_api: KubeApi::namespaced(kube_client.clone(), namespace),
	}
    }

    /*
     * Pods are not given a chance to shut down gracefully, we are usually
     * exiting ourselves when this runs.
     */
    fn immediate() -> KubeDeleteParams {
	KubeDeleteParams{
	    dry_run: false,
	    grace_period_seconds: Some(0),
	    propagation_policy: None,
	    preconditions: None,
	}
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {

    fn namespace(&self) -> &str {
	&self.namespace
    }

    async fn list_deployments(&self, scope: &DeletionScope) -> Result<Vec<String>> {
	let mut names = vec![];
	for deployment in self.deployment_api.list(&scope.list_params()).await? {
	    if let Some(name) = deployment.metadata.name {
		names.push(name);
	    }
	}
	Ok(names)
    }

    async fn delete_deployment(&self, name: &str) -> DeleteOutcome {
	delete_outcome(self.deployment_api.delete(name, &Self::immediate()).await)
    }

    async fn list_services(&self, scope: &DeletionScope) -> Result<Vec<String>> {
	let mut names = vec![];
	for service in self.service_api.list(&scope.list_params()).await? {
	    if let Some(name) = service.metadata.name {
		names.push(name);
	    }
	}
	Ok(names)
    }

    async fn delete_service(&self, name: &str) -> DeleteOutcome {
	delete_outcome(self.service_api.delete(name, &KubeDeleteParams::default()).await)
    }

    async fn list_fleets(&self) -> Result<Vec<String>> {
	let mut names = vec![];
	for fleet in self.fleet_api.list(&KubeListParams::default()).await? {
	    names.push(fleet.fleet_name());
	}
	Ok(names)
    }
}

#[derive(Clone, Debug, Default)]
pub struct KubeConnector;

#[async_trait]
impl Connector for KubeConnector {

    async fn connect(&self, context: &str, namespace: &str) -> Result<Arc<dyn ClusterApi>> {
	let options = KubeConfigOptions{
	    context: Some(context.to_string()),
	    ..KubeConfigOptions::default()
	};

	let config = match KubeConfig::from_kubeconfig(&options).await {
	    Ok(config) => config,
	    Err(err) => {
		let errmsg = format!("unable to load kube context '{}': {}", context, err);
		return Err(Error::Configuration(errmsg));
	    }
	};

	log::debug!("Using cluster {} for context {}", config.cluster_url, context);
	let kube_client = KubeClient::try_from(config)?;
	Ok(Arc::new(KubeCluster::new(kube_client, namespace)))
    }
}
