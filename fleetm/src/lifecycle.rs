use crate::cluster::Connector;
use crate::command::CommandRunner;
use crate::errors::Result;
use crate::fleet::FleetController;
use crate::fleet::FleetOutcome;
use crate::image::ImageBuilder;
use crate::kubectl::Kubectl;
use crate::platform::Platform;
use crate::reaper::Reaper;
use crate::reaper::TeardownSummary;
use crate::roles::RoleInstaller;
use crate::settings::Settings;

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Unconfigured,
    RolesInstalled,
    FleetEnsured,
    Running,
    TornDown,
}

impl ToString for LifecycleState {
    fn to_string(&self) -> String {
	match self {
	    LifecycleState::Unconfigured => String::from("unconfigured"),
	    LifecycleState::RolesInstalled => String::from("roles-installed"),
	    LifecycleState::FleetEnsured => String::from("fleet-ensured"),
	    LifecycleState::Running => String::from("running"),
	    LifecycleState::TornDown => String::from("torn-down"),
	}
    }
}

/*
 * ExitGuard owns the reaper once the fleet exists.  Firing it tears the
 * namespace down at most once; dropping it armed means we lost track of
 * running resources, which is loudly logged.
 */
pub struct ExitGuard {
    reaper: Reaper,
    fired: AtomicBool,
}

impl ExitGuard {

    pub fn arm(reaper: Reaper) -> Self {
	log::debug!("Teardown of fleet '{}' registered for exit", reaper.fleet_name());

	Self{
	    reaper: reaper,
	    fired: AtomicBool::new(false),
	}
    }

    pub fn has_fired(&self) -> bool {
	self.fired.load(Ordering::SeqCst)
    }

    pub async fn fire(&self) -> Option<TeardownSummary> {
	if self.fired.swap(true, Ordering::SeqCst) {
	    return None;
	}

	log::info!("Exiting");
	Some(self.reaper.teardown_all().await)
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
	if !*self.fired.get_mut() {
	    log::error!("Exit guard dropped without tearing down fleet '{}', its resources are still running",
			self.reaper.fleet_name());
	}
    }
}

/* handle to a started fleet, teardown stays armed as long as it lives */
pub struct Running {
    platform: Platform,
    outcome: FleetOutcome,
    guard: ExitGuard,
}

impl Running {

    pub fn platform(&self) -> &Platform {
	&self.platform
    }

    pub fn outcome(&self) -> &FleetOutcome {
	&self.outcome
    }

    pub fn guard(&self) -> &ExitGuard {
	&self.guard
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
	if let Err(err) = tokio::signal::ctrl_c().await {
	    log::warn!("Unable to listen for CTRL^C: {}", err);
	    futures::future::pending::<()>().await;
	}
    };

    #[cfg(unix)]
    let terminate = async {
	match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
	    Ok(mut sigterm) => {
		sigterm.recv().await;
	    },
	    Err(err) => {
		log::warn!("Unable to listen for SIGTERM: {}", err);
		futures::future::pending::<()>().await;
	    },
	}
    };

    #[cfg(not(unix))]
    let terminate = futures::future::pending::<()>();

    tokio::select! {
	_ = ctrl_c => {},
	_ = terminate => {},
    }
}

/*
 * Lifecycle drives startup in a fixed order: platform check, credentials,
 * roles, image build, fleet, then teardown registration.  Nothing after a
 * failed step runs.
 */
pub struct Lifecycle {
    settings: Settings,
    host_os: String,
    host_arch: String,
    state: LifecycleState,

    runner: Arc<dyn CommandRunner>,
    connector: Arc<dyn Connector>,
    builder: Arc<dyn ImageBuilder>,
}

impl Lifecycle {

    pub fn new(settings: Settings, runner: Arc<dyn CommandRunner>, connector: Arc<dyn Connector>, builder: Arc<dyn ImageBuilder>) -> Self {
	Self{
	    settings: settings,
	    host_os: std::env::consts::OS.to_string(),
	    host_arch: std::env::consts::ARCH.to_string(),
	    state: LifecycleState::Unconfigured,
	    runner: runner,
	    connector: connector,
	    builder: builder,
	}
    }

    /* report another host, the platform otherwise comes from the compile-time target */
    pub fn on_host(mut self, os: &str, arch: &str) -> Self {
	self.host_os = os.to_string();
	self.host_arch = arch.to_string();
	self
    }

    pub fn state(&self) -> LifecycleState {
	self.state
    }

    fn transition(&mut self, state: LifecycleState) {
	log::debug!("Lifecycle {} -> {}", self.state.to_string(), state.to_string());
	self.state = state;
    }

    pub async fn start(&mut self, build_target: &str) -> Result<Running> {
	let platform = Platform::resolve(&self.host_os, &self.host_arch)?;
	log::info!("Starting fleet manager on {}/{}", platform.os.to_string(), platform.arch.to_string());

	let cluster = self.connector.connect(&self.settings.context, &self.settings.namespace).await?;
	let kubectl = Kubectl::new(self.runner.clone(), &self.settings.kubectl, &self.settings.context, &self.settings.namespace);

	RoleInstaller::new(kubectl.clone(), &self.settings.rbac_dir).install_roles().await?;
	self.transition(LifecycleState::RolesInstalled);

	self.builder.build(build_target).await?;

	let controller = FleetController::new(kubectl.clone(), self.settings.scope());
	let outcome = controller.ensure_fleet_running(&self.settings.fleet_manifest).await?;
	self.transition(LifecycleState::FleetEnsured);

	let reaper = Reaper::new(cluster, kubectl, outcome.fleet(), self.settings.scope());
	let guard = ExitGuard::arm(reaper);
	self.transition(LifecycleState::Running);

	log::info!("Cluster ready");
	Ok(Running{ platform, outcome, guard })
    }

    /*
     * Start the fleet and keep it up while `workload` runs.  Whether the
     * workload returns, fails, panics or we get SIGINT/SIGTERM, the fleet
     * is torn down before this returns (or the panic resumes).
     */
    pub async fn run<W>(&mut self, build_target: &str, workload: W) -> Result<()>
    where
	W: Future<Output = Result<()>>,
    {
	self.run_until(build_target, workload, shutdown_signal()).await
    }

    /* like run(), with `shutdown` standing in for the process signals */
    pub async fn run_until<W, S>(&mut self, build_target: &str, workload: W, shutdown: S) -> Result<()>
    where
	W: Future<Output = Result<()>>,
	S: Future<Output = ()>,
    {
	let running = self.start(build_target).await?;

	let workload = AssertUnwindSafe(workload).catch_unwind();
	let finished = tokio::select! {
	    finished = workload => Some(finished),
	    _ = shutdown => {
		log::info!("Received shutdown signal");
		None
	    },
	};

	running.guard().fire().await;
	self.transition(LifecycleState::TornDown);

	match finished {
	    None => Ok(()),
	    Some(Ok(result)) => result,
	    Some(Err(panic)) => std::panic::resume_unwind(panic),
	}
    }
}
