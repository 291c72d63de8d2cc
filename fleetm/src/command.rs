use crate::errors::Error;
use crate::errors::Result;

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Capture {
    /* stream the child's stdout/stderr to our terminal */
    Inherit,

    /* keep stdout/stderr, stdout is returned and both end up in a failure */
    Output,
}

/*
 * Runs external tooling (kubectl, the image build script).  No retries
 * at this level, callers decide what a failure means.
 */
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], capture: Capture) -> Result<String>;
}

pub fn render(program: &str, args: &[String]) -> String {
    let mut line = String::from(program);
    for arg in args {
	line.push(' ');
	line.push_str(arg);
    }
    line
}

fn failed(command: String, exit_code: Option<i32>, output: String) -> Error {
    match exit_code {
	Some(code) => log::error!("Command failed with exit status {}: {}", code, command),
	None => log::error!("Command was terminated by a signal: {}", command),
    }

    Error::CommandFailure{ exit_code, command, output }
}

#[derive(Clone, Debug, Default)]
pub struct ProcessRunner {
    envs: Vec<(String, String)>,
}

impl ProcessRunner {

    pub fn new() -> Self {
	Self::default()
    }

    /* exported to every child we spawn */
    pub fn env(mut self, key: &str, value: &str) -> Self {
	self.envs.push((key.to_string(), value.to_string()));
	self
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
	let mut cmd = Command::new(program);
	cmd.args(args);
	for (key, value) in &self.envs {
	    cmd.env(key, value);
	}
	cmd
    }

    /*
     * Spawn a long running companion (e.g. the web server) and wait for it
     * to finish.  The child is killed if we stop waiting on it.
     */
    pub async fn supervise(&self, args: &[String]) -> Result<()> {
	let (program, rest) = match args.split_first() {
	    Some(split) => split,
	    None => {
		return Err(Error::Configuration(String::from("no companion command given")));
	    }
	};
	let command = render(program, rest);

	log::info!("Starting companion process: {}", command);
	let mut child = self.command(program, rest).kill_on_drop(true).spawn()?;
	let status = child.wait().await?;
	if !status.success() {
	    return Err(failed(command, status.code(), String::new()));
	}

	log::info!("Companion process exited: {}", command);
	Ok(())
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {

    async fn run(&self, program: &str, args: &[String], capture: Capture) -> Result<String> {
	let command = render(program, args);
	let mut cmd = self.command(program, args);

	log::debug!("Running: {}", command);
	match capture {
	    Capture::Inherit => {
		let status = cmd.status().await?;
		if !status.success() {
		    return Err(failed(command, status.code(), String::new()));
		}
		Ok(String::new())
	    },
	    Capture::Output => {
		cmd.stdout(Stdio::piped());
		cmd.stderr(Stdio::piped());

		let output = cmd.output().await?;
		let stdout = String::from_utf8_lossy(&output.stdout).to_string();
		if !output.status.success() {
		    let stderr = String::from_utf8_lossy(&output.stderr);
		    return Err(failed(command, output.status.code(), format!("{}{}", stderr, stdout)));
		}
		Ok(stdout)
	    },
	}
    }
}
