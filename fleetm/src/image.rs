use crate::command::Capture;
use crate::command::CommandRunner;
use crate::errors::Result;

use async_trait::async_trait;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/* Builds the game images into the cluster's registry before the fleet starts */
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn build(&self, target: &str) -> Result<()>;
}

/*
 * Delegates to the repository's build script, invoked as
 * `<script> --target <target>`.  What it builds is its own business.
 */
pub struct ScriptImageBuilder {
    script: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl ScriptImageBuilder {

    pub fn new(runner: Arc<dyn CommandRunner>, script: &Path) -> Self {
	Self{
	    script: script.to_path_buf(),
	    runner: runner,
	}
    }
}

#[async_trait]
impl ImageBuilder for ScriptImageBuilder {

    async fn build(&self, target: &str) -> Result<()> {
	log::info!("Building images for target '{}'", target);

	let script = self.script.to_string_lossy();
	let args = vec![String::from("--target"), target.to_string()];
	self.runner.run(&script, &args, Capture::Inherit).await?;
	Ok(())
    }
}
