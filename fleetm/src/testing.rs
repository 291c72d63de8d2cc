/*
 * In-memory stand-ins for kubectl, the control plane and the image build,
 * all sharing one ClusterState so scenarios can mix CLI and API calls.
 */

use crate::cluster::ClusterApi;
use crate::cluster::Connector;
use crate::cluster::DeleteOutcome;
use crate::cluster::DeletionScope;
use crate::command::render;
use crate::command::Capture;
use crate::command::CommandRunner;
use crate::errors::Error;
use crate::errors::Result;
use crate::image::ImageBuilder;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    fleet_name: String,
    fleets: BTreeSet<String>,
    deployments: BTreeMap<String, bool>,
    services: BTreeMap<String, bool>,
    broken_deployments: BTreeSet<String>,
    stuck_fleet: bool,
    create_failures: VecDeque<String>,
    failing_commands: Vec<String>,
    broken_listing: bool,
    roles_applied: usize,
}

#[derive(Clone, Default)]
pub struct ClusterState {
    inner: Arc<Mutex<Inner>>,
}

fn failure(command: &str, output: &str) -> Error {
    Error::CommandFailure{
	exit_code: Some(1),
	command: command.to_string(),
	output: output.to_string(),
    }
}

impl ClusterState {

    /* the fleet name `kubectl create -f` will create */
    pub fn new(fleet_name: &str) -> Self {
	let state = Self::default();
	state.inner.lock().unwrap().fleet_name = fleet_name.to_string();
	state
    }

    pub fn add_fleet(&self, name: &str) {
	self.inner.lock().unwrap().fleets.insert(name.to_string());
    }

    pub fn add_deployment(&self, name: &str, owned: bool) {
	self.inner.lock().unwrap().deployments.insert(name.to_string(), owned);
    }

    pub fn add_service(&self, name: &str, owned: bool) {
	self.inner.lock().unwrap().services.insert(name.to_string(), owned);
    }

    /* deleting this deployment through the API always fails */
    pub fn break_deployment(&self, name: &str) {
	self.inner.lock().unwrap().broken_deployments.insert(name.to_string());
    }

    /* fleet deletion is acknowledged but the fleet never goes away */
    pub fn stick_fleet(&self) {
	self.inner.lock().unwrap().stuck_fleet = true;
    }

    pub fn fail_next_create(&self, output: &str) {
	self.inner.lock().unwrap().create_failures.push_back(output.to_string());
    }

    /* any command line starting with `prefix` exits non-zero */
    pub fn fail_command(&self, prefix: &str) {
	self.inner.lock().unwrap().failing_commands.push(prefix.to_string());
    }

    pub fn break_listing(&self) {
	self.inner.lock().unwrap().broken_listing = true;
    }

    pub fn fleets(&self) -> Vec<String> {
	self.inner.lock().unwrap().fleets.iter().cloned().collect()
    }

    pub fn deployments(&self) -> Vec<String> {
	self.inner.lock().unwrap().deployments.keys().cloned().collect()
    }

    pub fn services(&self) -> Vec<String> {
	self.inner.lock().unwrap().services.keys().cloned().collect()
    }

    pub fn roles_applied(&self) -> usize {
	self.inner.lock().unwrap().roles_applied
    }

    fn create_fleet(&self, line: &str) -> Result<String> {
	let mut inner = self.inner.lock().unwrap();

	if let Some(output) = inner.create_failures.pop_front() {
	    return Err(failure(line, &output));
	}

	let name = inner.fleet_name.clone();
	if inner.fleets.contains(&name) {
	    let output = format!("Error from server (AlreadyExists): error when creating \"agones/fleet.yml\": fleets.agones.dev \"{}\" already exists\n", name);
	    return Err(failure(line, &output));
	}

	inner.fleets.insert(name.clone());
	Ok(format!("fleet.agones.dev/{} created\n", name))
    }

    fn delete_fleet(&self, name: &str) -> String {
	let mut inner = self.inner.lock().unwrap();

	if !inner.fleets.contains(name) {
	    return String::new();
	}
	if !inner.stuck_fleet {
	    inner.fleets.remove(name);
	}
	format!("fleet.agones.dev \"{}\" deleted\n", name)
    }

    fn delete_deployments(&self, owned_only: bool) -> String {
	let mut inner = self.inner.lock().unwrap();
	let mut output = String::new();

	let doomed: Vec<String> = inner.deployments.iter()
	    .filter(|(_, owned)| **owned || !owned_only)
	    .map(|(name, _)| name.clone())
	    .collect();
	for name in doomed {
	    inner.deployments.remove(&name);
	    output.push_str(&format!("deployment.apps \"{}\" deleted\n", name));
	}

	if output.is_empty() {
	    output.push_str("No resources found\n");
	}
	output
    }

    fn is_failing(&self, line: &str) -> bool {
	self.inner.lock().unwrap().failing_commands.iter().any(|prefix| line.starts_with(prefix.as_str()))
    }
}

/*
 * Understands the kubectl invocations the manager issues and applies them
 * to the shared state, whatever `--context` they name.  Everything else
 * (e.g. build scripts) succeeds.
 */
pub struct FakeRunner {
    state: ClusterState,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {

    pub fn new(state: ClusterState) -> Self {
	Self{
	    state: state,
	    calls: Mutex::new(vec![]),
	}
    }

    pub fn calls(&self) -> Vec<String> {
	self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, line: &str) -> usize {
	self.calls().iter().filter(|call| call.as_str() == line).count()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {

    async fn run(&self, program: &str, args: &[String], _capture: Capture) -> Result<String> {
	let line = render(program, args);
	self.calls.lock().unwrap().push(line.clone());

	if self.state.is_failing(&line) {
	    return Err(failure(&line, "error: forced failure\n"));
	}

	let argv: Vec<&str> = args.iter().map(String::as_str).collect();
	let argv = match argv.as_slice() {
	    ["--context", _, rest @ ..] => rest,
	    all => all,
	};
	match argv {
	    ["create", "-f", _, "-n", _] => self.state.create_fleet(&line),
	    ["delete", "fleet", name, "--ignore-not-found", "-n", _] => Ok(self.state.delete_fleet(name)),
	    ["delete", "--all", "deployment", "-n", _] => Ok(self.state.delete_deployments(false)),
	    ["delete", "deployment", "-n", _, "-l", _] => Ok(self.state.delete_deployments(true)),
	    ["apply", "-Rf", _] => {
		self.state.inner.lock().unwrap().roles_applied += 1;
		Ok(String::new())
	    },
	    _ => Ok(String::new()),
	}
    }
}

pub struct FakeCluster {
    state: ClusterState,
}

impl FakeCluster {

    pub fn new(state: ClusterState) -> Self {
	Self{ state }
    }

    fn names(&self, resources: &BTreeMap<String, bool>, scope: &DeletionScope) -> Vec<String> {
	resources.iter()
	    .filter(|(_, owned)| **owned || *scope == DeletionScope::All)
	    .map(|(name, _)| name.clone())
	    .collect()
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {

    fn namespace(&self) -> &str {
	"default"
    }

    async fn list_deployments(&self, scope: &DeletionScope) -> Result<Vec<String>> {
	let inner = self.state.inner.lock().unwrap();
	if inner.broken_listing {
	    return Err(Error::Configuration(String::from("deployments are forbidden")));
	}
	Ok(self.names(&inner.deployments, scope))
    }

    async fn delete_deployment(&self, name: &str) -> DeleteOutcome {
	let mut inner = self.state.inner.lock().unwrap();
	if inner.broken_deployments.contains(name) {
	    return DeleteOutcome::Failed(format!("deployments.apps \"{}\" is forbidden", name));
	}
	match inner.deployments.remove(name) {
	    Some(_) => DeleteOutcome::Deleted,
	    None => DeleteOutcome::AlreadyAbsent,
	}
    }

    async fn list_services(&self, scope: &DeletionScope) -> Result<Vec<String>> {
	let inner = self.state.inner.lock().unwrap();
	if inner.broken_listing {
	    return Err(Error::Configuration(String::from("services are forbidden")));
	}
	Ok(self.names(&inner.services, scope))
    }

    async fn delete_service(&self, name: &str) -> DeleteOutcome {
	match self.state.inner.lock().unwrap().services.remove(name) {
	    Some(_) => DeleteOutcome::Deleted,
	    None => DeleteOutcome::AlreadyAbsent,
	}
    }

    async fn list_fleets(&self) -> Result<Vec<String>> {
	Ok(self.state.fleets())
    }
}

pub struct FakeConnector {
    state: ClusterState,
    missing_context: bool,
    connects: AtomicUsize,
}

impl FakeConnector {

    pub fn new(state: ClusterState) -> Self {
	Self{
	    state: state,
	    missing_context: false,
	    connects: AtomicUsize::new(0),
	}
    }

    pub fn without_context(state: ClusterState) -> Self {
	Self{
	    missing_context: true,
	    ..Self::new(state)
	}
    }

    pub fn connects(&self) -> usize {
	self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {

    async fn connect(&self, context: &str, _namespace: &str) -> Result<Arc<dyn ClusterApi>> {
	self.connects.fetch_add(1, Ordering::SeqCst);
	if self.missing_context {
	    return Err(Error::Configuration(format!("unable to load kube context '{}'", context)));
	}
	Ok(Arc::new(FakeCluster::new(self.state.clone())))
    }
}

#[derive(Default)]
pub struct FakeBuilder {
    fail: bool,
    builds: Mutex<Vec<String>>,
}

impl FakeBuilder {

    pub fn failing() -> Self {
	Self{
	    fail: true,
	    ..Self::default()
	}
    }

    pub fn builds(&self) -> Vec<String> {
	self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageBuilder for FakeBuilder {

    async fn build(&self, target: &str) -> Result<()> {
	self.builds.lock().unwrap().push(target.to_string());
	if self.fail {
	    return Err(failure("build_images.sh --target runner", ""));
	}
	Ok(())
    }
}

/* writes a minimal fleet manifest named `name` into `dir` */
pub fn write_manifest(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
    let path = dir.join("fleet.yml");
    let yaml = format!(
	"apiVersion: agones.dev/v1\nkind: Fleet\nmetadata:\n  name: {}\n  labels:\n    app.kubernetes.io/managed-by: aimmo\nspec:\n  replicas: 2\n  template:\n    spec:\n      ports:\n      - containerPort: 5000\n",
	name,
    );
    std::fs::write(&path, yaml).unwrap();
    path
}
