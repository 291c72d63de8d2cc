use crate::cluster::ClusterApi;
use crate::cluster::DeleteOutcome;
use crate::cluster::DeletionScope;
use crate::errors::Result;
use crate::kubectl::Kubectl;

use std::sync::Arc;

/* the API server's own service, recreated immediately if deleted */
const APISERVER_SERVICE: &str = "kubernetes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaped {
    pub kind: &'static str,
    pub name: String,
    pub outcome: DeleteOutcome,
}

#[derive(Debug, Default)]
pub struct TeardownSummary {
    pub reaped: Vec<Reaped>,
}

impl TeardownSummary {

    pub fn is_clean(&self) -> bool {
	self.failures().is_empty()
    }

    pub fn failures(&self) -> Vec<&Reaped> {
	self.reaped.iter().filter(|reaped| reaped.outcome.is_failed()).collect()
    }

    pub fn deleted(&self) -> usize {
	self.reaped.iter().filter(|reaped| reaped.outcome == DeleteOutcome::Deleted).count()
    }
}

/*
 * What is still around after a teardown.  Deletions are asynchronous on
 * the cluster side, so terminating objects may briefly show up here.
 */
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Leftovers {
    pub deployments: Vec<String>,
    pub services: Vec<String>,
    pub fleets: Vec<String>,
}

impl Leftovers {

    pub fn is_empty(&self) -> bool {
	self.deployments.is_empty() && self.services.is_empty() && self.fleets.is_empty()
    }
}

/*
 * Reaper removes the deployments, services and the fleet left running in
 * the namespace.  It is best effort: every deletion is attempted and its
 * outcome recorded, a failure never stops the ones after it.  The fleet
 * goes last so a failure there doesn't leave bare workloads behind.
 */
pub struct Reaper {
    fleet_name: String,
    scope: DeletionScope,

    cluster: Arc<dyn ClusterApi>,
    kubectl: Kubectl,
}

fn record(kind: &'static str, name: &str, outcome: DeleteOutcome) -> Reaped {
    match outcome {
	DeleteOutcome::Failed(ref reason) => log::warn!("Unable to delete {} '{}': {}", kind, name, reason),
	DeleteOutcome::AlreadyAbsent => log::debug!("{} '{}' was already gone", kind, name),
	DeleteOutcome::Deleted => log::info!("Deleted {} '{}'", kind, name),
    }

    Reaped{
	kind: kind,
	name: name.to_string(),
	outcome: outcome,
    }
}

impl Reaper {

    pub fn new(cluster: Arc<dyn ClusterApi>, kubectl: Kubectl, fleet_name: &str, scope: DeletionScope) -> Self {
	Self{
	    fleet_name: fleet_name.to_string(),
	    scope: scope,
	    cluster: cluster,
	    kubectl: kubectl,
	}
    }

    pub fn fleet_name(&self) -> &str {
	&self.fleet_name
    }

    fn is_protected_service(&self, name: &str) -> bool {
	self.scope == DeletionScope::All && self.cluster.namespace() == "default" && name == APISERVER_SERVICE
    }

    pub async fn delete_bare_deployments(&self) -> Vec<Reaped> {
	let names = match self.cluster.list_deployments(&self.scope).await {
	    Ok(names) => names,
	    Err(err) => {
		return vec![record("deployment", "*", DeleteOutcome::Failed(err.to_string()))];
	    }
	};

	let mut reaped = vec![];
	for name in names {
	    let outcome = self.cluster.delete_deployment(&name).await;
	    reaped.push(record("deployment", &name, outcome));
	}
	reaped
    }

    pub async fn delete_bare_services(&self) -> Vec<Reaped> {
	let names = match self.cluster.list_services(&self.scope).await {
	    Ok(names) => names,
	    Err(err) => {
		return vec![record("service", "*", DeleteOutcome::Failed(err.to_string()))];
	    }
	};

	let mut reaped = vec![];
	for name in names.into_iter().filter(|name| !self.is_protected_service(name)) {
	    let outcome = self.cluster.delete_service(&name).await;
	    reaped.push(record("service", &name, outcome));
	}
	reaped
    }

    pub async fn delete_fleet(&self) -> Reaped {
	log::info!("Deleting {} fleet", self.fleet_name);

	let outcome = match self.kubectl.delete_fleet(&self.fleet_name).await {
	    Ok(outcome) => outcome,
	    Err(err) => DeleteOutcome::Failed(err.to_string()),
	};
	record("fleet", &self.fleet_name, outcome)
    }

    pub async fn teardown_all(&self) -> TeardownSummary {
	let mut summary = TeardownSummary::default();

	summary.reaped.extend(self.delete_bare_deployments().await);
	summary.reaped.extend(self.delete_bare_services().await);
	summary.reaped.push(self.delete_fleet().await);

	if summary.is_clean() {
	    log::info!("Teardown finished, {} object(s) deleted", summary.deleted());
	} else {
	    log::error!("Teardown finished with {} failure(s), some resources may still be running in namespace {}",
			summary.failures().len(), self.cluster.namespace());
	}
	summary
    }

    pub async fn leftovers(&self) -> Result<Leftovers> {
	let services = self.cluster.list_services(&self.scope).await?
	    .into_iter()
	    .filter(|name| !self.is_protected_service(name))
	    .collect();
	let fleets = self.cluster.list_fleets().await?
	    .into_iter()
	    .filter(|name| *name == self.fleet_name)
	    .collect();

	Ok(Leftovers{
	    deployments: self.cluster.list_deployments(&self.scope).await?,
	    services: services,
	    fleets: fleets,
	})
    }
}
