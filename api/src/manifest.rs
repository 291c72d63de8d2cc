use crate::Fleet;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {

    #[error("unable to read manifest {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("manifest {path} is not valid yaml: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },

    #[error("manifest {path} declares a `{kind}`, expected a `Fleet`")]
    WrongKind { path: PathBuf, kind: String },

    #[error("manifest {path} has no metadata.name")]
    MissingName { path: PathBuf },
}

/*
 * A fleet manifest on disk, as handed to `kubectl create -f`.  We only
 * parse it to learn which fleet we are about to own; the file itself is
 * never rewritten.
 */
#[derive(Clone, Debug)]
pub struct FleetManifest {
    pub path: PathBuf,
    pub fleet: Fleet,
}

impl FleetManifest {

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
	let content = std::fs::read_to_string(path)
	    .map_err(|source| ManifestError::Read{ path: path.to_path_buf(), source })?;

	Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, ManifestError> {
	let value: serde_yaml::Value = serde_yaml::from_str(content)
	    .map_err(|source| ManifestError::Parse{ path: path.to_path_buf(), source })?;

	let kind = value.get("kind").and_then(|kind| kind.as_str()).unwrap_or("");
	if kind != "Fleet" {
	    return Err(ManifestError::WrongKind{ path: path.to_path_buf(), kind: kind.to_string() });
	}

	let fleet: Fleet = serde_yaml::from_value(value)
	    .map_err(|source| ManifestError::Parse{ path: path.to_path_buf(), source })?;

	if fleet.metadata.name.is_none() {
	    return Err(ManifestError::MissingName{ path: path.to_path_buf() });
	}

	Ok(Self{
	    path: path.to_path_buf(),
	    fleet: fleet,
	})
    }

    pub fn name(&self) -> String {
	self.fleet.fleet_name()
    }
}
