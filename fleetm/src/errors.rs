use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {

    /* the host or the kube config cannot run the fleet, operator must step in */
    #[error("configuration error: {0}")]
    Configuration(String),

    /* an external command returned non-zero */
    #[error("command `{command}` failed with exit code {}", exit_code_text(.exit_code))]
    CommandFailure {
	exit_code: Option<i32>,
	command: String,
	output: String,
    },

    /* encapsulate a kube-rust error */
    #[error("kube error: {0}")]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Manifest(#[from] aimmo_api::ManifestError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn exit_code_text(exit_code: &Option<i32>) -> String {
    match exit_code {
	Some(code) => code.to_string(),
	None => String::from("<signal>"),
    }
}

impl Error {

    /*
     * kubectl reports creation conflicts as `Error from server (AlreadyExists)`,
     * that's the only failure the fleet controller knows how to recover from.
     */
    pub fn is_already_exists(&self) -> bool {
	match self {
	    Error::CommandFailure{ output, .. } => output.contains("AlreadyExists") || output.contains("already exists"),
	    _ => false,
	}
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
