use crate::errors::Error;
use crate::errors::Result;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OsType {
    MAC,
    LINUX,
    WINDOWS,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArchType {
    AMD64,
    ARM64,
}

impl ToString for OsType {
    fn to_string(&self) -> String {
	match self {
	    OsType::MAC => String::from("darwin"),
	    OsType::LINUX => String::from("linux"),
	    OsType::WINDOWS => String::from("windows"),
	}
    }
}

impl ToString for ArchType {
    fn to_string(&self) -> String {
	match self {
	    ArchType::AMD64 => String::from("amd64"),
	    ArchType::ARM64 => String::from("arm64"),
	}
    }
}

/*
 * The host we are running on, resolved once at startup.  The cluster
 * tooling ships per os/arch binaries, so anything we can't name here is
 * a configuration error rather than something to retry.
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: OsType,
    pub arch: ArchType,
}

impl Platform {

    pub fn detect() -> Result<Self> {
	Self::resolve(std::env::consts::OS, std::env::consts::ARCH)
    }

    /*
     * Accepts both rust's target names (`macos`, `x86_64`, `aarch64`) and the
     * ones uname/platform report (`Darwin`, `amd64`, `arm64`).
     */
    pub fn resolve(os: &str, arch: &str) -> Result<Self> {
	let os = match os.to_lowercase().as_str() {
	    "macos" | "darwin" => OsType::MAC,
	    "linux" => OsType::LINUX,
	    "windows" => OsType::WINDOWS,
	    other => {
		return Err(Error::Configuration(format!("'{}' system is not supported", other)));
	    }
	};

	let arch = match arch.to_lowercase().as_str() {
	    "x86_64" | "amd64" => ArchType::AMD64,
	    "aarch64" | "arm64" => ArchType::ARM64,
	    other => {
		return Err(Error::Configuration(format!("'{}' architecture is not supported, requires 64-bit", other)));
	    }
	};

	Ok(Self{ os, arch })
    }
}
