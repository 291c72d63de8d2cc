use crate::errors::Error;
use crate::errors::Result;
use crate::kubectl::Kubectl;

use std::path::Path;
use std::path::PathBuf;

/*
 * Applies the service accounts, roles and bindings that restrict what the
 * game pods may do.  Re-applying the same manifests is a no-op update on
 * the cluster side, so this runs on every start.
 */
pub struct RoleInstaller {
    rbac_dir: PathBuf,
    kubectl: Kubectl,
}

impl RoleInstaller {

    pub fn new(kubectl: Kubectl, rbac_dir: &Path) -> Self {
	Self{
	    rbac_dir: rbac_dir.to_path_buf(),
	    kubectl: kubectl,
	}
    }

    pub async fn install_roles(&self) -> Result<()> {
	if !self.rbac_dir.is_dir() {
	    let errmsg = format!("rbac manifest directory {} does not exist", self.rbac_dir.display());
	    return Err(Error::Configuration(errmsg));
	}

	log::info!("Applying roles from {}", self.rbac_dir.display());
	self.kubectl.apply_recursive(&self.rbac_dir).await
    }
}
