use crate::cluster::DeletionScope;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fleetm", version, about = "Provisions, restarts and reaps the aimmo game fleet")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {

    /// Install roles, build images, (re)create the fleet, then wait on the
    /// companion process given after `--`.  The fleet is reaped on exit.
    Up {
	#[arg(long, env = "AIMMO_BUILD_TARGET", default_value = "runner")]
	build_target: String,

	#[arg(last = true)]
	companion: Vec<String>,
    },

    /// Delete every deployment, service and the fleet we own, then report leftovers
    Reap,

    /// Read-only check of the host platform and the kube context: lists fleets,
    /// changes nothing
    Check,
}

#[derive(Args, Debug, Clone)]
pub struct Settings {

    /// kubeconfig context the local cluster profile was started with
    #[arg(long, env = "AIMMO_KUBE_CONTEXT", default_value = "agones")]
    pub context: String,

    #[arg(long, env = "AIMMO_NAMESPACE", default_value = "default")]
    pub namespace: String,

    #[arg(long, env = "AIMMO_FLEET_MANIFEST", default_value = "agones/fleet.yml")]
    pub fleet_manifest: PathBuf,

    #[arg(long, env = "AIMMO_RBAC_DIR", default_value = "rbac")]
    pub rbac_dir: PathBuf,

    #[arg(long, env = "AIMMO_KUBECTL", default_value = "kubectl")]
    pub kubectl: String,

    #[arg(long, env = "MINIKUBE_PATH", default_value = "minikube")]
    pub minikube: String,

    #[arg(long, env = "AIMMO_BUILD_SCRIPT", default_value = "aimmo_runner/build_images.sh")]
    pub build_script: PathBuf,

    /// Delete every deployment and service in the namespace, not just the
    /// ones labelled as ours.  Only for clusters set up before the labels.
    #[arg(long, env = "AIMMO_LEGACY_BLANKET_DELETE")]
    pub legacy_blanket_delete: bool,
}

impl Settings {

    pub fn scope(&self) -> DeletionScope {
	if self.legacy_blanket_delete {
	    DeletionScope::All
	} else {
	    DeletionScope::Owned{ selector: aimmo_api::owner_selector() }
	}
    }
}
