mod cluster;
mod command;
mod errors;
mod fleet;
mod image;
mod kubectl;
mod lifecycle;
mod platform;
mod reaper;
mod roles;
mod settings;

#[cfg(test)]
mod testing;

use clap::Parser;
use cluster::Connector;
use cluster::KubeConnector;
use command::ProcessRunner;
use errors::exit_code_text;
use errors::Error;
use errors::Result;
use image::ScriptImageBuilder;
use kubectl::Kubectl;
use lifecycle::Lifecycle;
use platform::Platform;
use reaper::Reaper;
use settings::Cli;
use settings::Command;
use settings::Settings;
use std::process::ExitCode;
use std::sync::Arc;

fn process_runner(settings: &Settings) -> ProcessRunner {
    ProcessRunner::new().env("MINIKUBE_PATH", &settings.minikube)
}

async fn up(settings: Settings, build_target: String, companion: Vec<String>) -> Result<()> {
    let runner = Arc::new(process_runner(&settings));
    let builder = Arc::new(ScriptImageBuilder::new(runner.clone(), &settings.build_script));

    let workload = async {
	if companion.is_empty() {
	    log::info!("No companion process given, running until interrupted");
	    futures::future::pending::<()>().await;
	}
	runner.supervise(&companion).await
    };

    let mut lifecycle = Lifecycle::new(settings, runner.clone(), Arc::new(KubeConnector), builder);
    lifecycle.run(&build_target, workload).await
}

async fn reap(settings: Settings) -> Result<()> {
    let manifest = aimmo_api::FleetManifest::load(&settings.fleet_manifest)?;
    let cluster = KubeConnector.connect(&settings.context, &settings.namespace).await?;
    let kubectl = Kubectl::new(Arc::new(process_runner(&settings)), &settings.kubectl, &settings.context, &settings.namespace);

    let reaper = Reaper::new(cluster, kubectl, &manifest.name(), settings.scope());
    reaper.teardown_all().await;

    let leftovers = reaper.leftovers().await?;
    if leftovers.is_empty() {
	log::info!("Namespace {} is clean", settings.namespace);
    } else {
	log::info!("Still terminating in namespace {}: {:?}", settings.namespace, leftovers);
    }
    Ok(())
}

async fn check(settings: Settings) -> Result<()> {
    let platform = Platform::detect()?;
    log::info!("Host platform {}/{} is supported", platform.os.to_string(), platform.arch.to_string());

    let cluster = KubeConnector.connect(&settings.context, &settings.namespace).await?;
    let fleets = cluster.list_fleets().await?;
    log::info!("Context '{}' is reachable, fleets in {}: {:?}", settings.context, cluster.namespace(), fleets);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
	Command::Up{ build_target, companion } => up(cli.settings, build_target, companion).await,
	Command::Reap => reap(cli.settings).await,
	Command::Check => check(cli.settings).await,
    };

    match result {
	Ok(()) => ExitCode::SUCCESS,
	Err(Error::CommandFailure{ command, exit_code, output }) => {
	    eprintln!("Something has gone wrong.");
	    eprintln!("Command '{}' returned exit code '{}'", command, exit_code_text(&exit_code));
	    if !output.is_empty() {
		eprintln!("{}", output.trim_end());
	    }
	    ExitCode::FAILURE
	},
	Err(err) => {
	    log::error!("{}", err);
	    ExitCode::FAILURE
	},
    }
}
