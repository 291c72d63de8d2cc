use crate::cluster::DeleteOutcome;
use crate::cluster::DeletionScope;
use crate::command::Capture;
use crate::command::CommandRunner;
use crate::errors::Result;

use std::path::Path;
use std::sync::Arc;

/*
 * The handful of kubectl invocations the manager needs.  Fleet creation
 * goes through the CLI so manifests are consumed exactly as written.
 *
 * Every invocation names the kube context explicitly, and everything but
 * the RBAC apply names the namespace, so the CLI always hits the same
 * cluster and namespace as the API client.
 */
#[derive(Clone)]
pub struct Kubectl {
    program: String,
    context: String,
    namespace: String,
    runner: Arc<dyn CommandRunner>,
}

/* kubectl prints one `<kind> "<name>" deleted` line per removed object */
fn count_deleted(output: &str) -> usize {
    output.lines().filter(|line| line.contains("\" deleted")).count()
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

impl Kubectl {

    pub fn new(runner: Arc<dyn CommandRunner>, program: &str, context: &str, namespace: &str) -> Self {
	Self{
	    program: program.to_string(),
	    context: context.to_string(),
	    namespace: namespace.to_string(),
	    runner: runner,
	}
    }

    pub fn namespace(&self) -> &str {
	&self.namespace
    }

    async fn run(&self, args: Vec<String>, capture: Capture) -> Result<String> {
	let mut argv = strings(&["--context", &self.context]);
	argv.extend(args);
	self.runner.run(&self.program, &argv, capture).await
    }

    /* `kubectl create -f <manifest>`, output is kept so conflicts can be told apart */
    pub async fn create(&self, manifest: &Path) -> Result<String> {
	let manifest = manifest.to_string_lossy();
	self.run(strings(&["create", "-f", &*manifest, "-n", &self.namespace]), Capture::Output).await
    }

    pub async fn delete_fleet(&self, name: &str) -> Result<DeleteOutcome> {
	let args = strings(&["delete", "fleet", name, "--ignore-not-found", "-n", &self.namespace]);
	let output = self.run(args, Capture::Output).await?;

	if count_deleted(&output) > 0 {
	    Ok(DeleteOutcome::Deleted)
	} else {
	    Ok(DeleteOutcome::AlreadyAbsent)
	}
    }

    /*
     * Returns how many deployments kubectl reported as deleted.
     */
    pub async fn delete_deployments(&self, scope: &DeletionScope) -> Result<usize> {
	let namespace = self.namespace.as_str();
	let args = match scope {
	    DeletionScope::Owned{ selector } => strings(&["delete", "deployment", "-n", namespace, "-l", selector.as_str()]),
	    DeletionScope::All => strings(&["delete", "--all", "deployment", "-n", namespace]),
	};

	let output = self.run(args, Capture::Output).await?;
	Ok(count_deleted(&output))
    }

    /* rbac manifests carry their own namespaces, so no `-n` here */
    pub async fn apply_recursive(&self, dir: &Path) -> Result<()> {
	let dir = dir.to_string_lossy();
	self.run(strings(&["apply", "-Rf", &*dir]), Capture::Inherit).await?;
	Ok(())
    }
}
