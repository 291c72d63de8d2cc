/*
 * aimmo/api - defines the cluster objects, including the Agones CRDs
 * the aimmo fleet manager creates and reaps.
 */

pub mod fleet;
pub use fleet::Fleet;
pub use fleet::FleetSpec;
pub use fleet::FleetStatus;

pub mod manifest;
pub use manifest::FleetManifest;
pub use manifest::ManifestError;

/*
 * Every workload the manager owns carries this label, so teardown and
 * recovery can be scoped to them instead of the whole namespace.
 */
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "aimmo";

pub fn owner_selector() -> String {
    format!("{}={}", MANAGED_BY_LABEL, MANAGED_BY_VALUE)
}
