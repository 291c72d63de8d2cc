use crate::cluster::DeletionScope;
use crate::errors::Result;
use crate::kubectl::Kubectl;
use aimmo_api as api;

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetOutcome {
    Created { fleet: String },
    Recreated { fleet: String, deployments_removed: usize },
}

impl FleetOutcome {

    pub fn fleet(&self) -> &str {
	match self {
	    FleetOutcome::Created{ fleet } => fleet.as_str(),
	    FleetOutcome::Recreated{ fleet, .. } => fleet.as_str(),
	}
    }
}

/*
 * FleetController (re)creates the game fleet from its manifest.
 *
 * A create that conflicts with an existing fleet gets exactly one
 * delete-then-create cycle.  Deletions are asynchronous on the cluster
 * side, so if the second create fails too the fault is real (bad
 * manifest, quota, permissions) and is returned as is.
 */
pub struct FleetController {
    scope: DeletionScope,
    kubectl: Kubectl,
}

impl FleetController {

    pub fn new(kubectl: Kubectl, scope: DeletionScope) -> Self {
	Self{
	    scope: scope,
	    kubectl: kubectl,
	}
    }

    pub async fn ensure_fleet_running(&self, manifest_path: &Path) -> Result<FleetOutcome> {
	let manifest = api::FleetManifest::load(manifest_path)?;
	let name = manifest.name();

	if let DeletionScope::Owned{ selector } = &self.scope {
	    if !manifest.fleet.is_owned() {
		log::warn!("Fleet '{}' is not labelled {}, its workloads will be missed by teardown", name, selector);
	    }
	}

	log::info!("Restarting pods for fleet '{}' ({} replicas)", name, manifest.fleet.replicas());
	match self.kubectl.create(&manifest.path).await {
	    Ok(_) => {
		log::info!("Fleet '{}' created", name);
		return Ok(FleetOutcome::Created{ fleet: name });
	    },
	    Err(err) if err.is_already_exists() => {
		log::warn!("Fleet '{}' already exists, deleting and creating it again", name);
	    },
	    Err(err) => return Err(err),
	}

	self.kubectl.delete_fleet(&name).await?;

	let removed = self.kubectl.delete_deployments(&self.scope).await?;
	log::info!("Removed {} deployment(s) from namespace {}", removed, self.kubectl.namespace());

	self.kubectl.create(&manifest.path).await?;
	log::info!("Fleet '{}' recreated", name);

	Ok(FleetOutcome::Recreated{ fleet: name, deployments_removed: removed })
    }
}
