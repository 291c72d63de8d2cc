use kube::ResourceExt;
use kube_derive::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(group = "agones.dev", version = "v1", kind = "Fleet", namespaced)]
#[kube(status = "FleetStatus")]
#[serde(rename_all = "camelCase")]
pub struct FleetSpec {

    /* How many game servers the fleet keeps around */
    pub replicas: Option<i32>,

    /* Packed or Distributed, left for Agones to interpret */
    pub scheduling: Option<String>,

    /*
     * The GameServer template (ports, container image, health).  It is
     * consumed as-is by the Agones controller, so we don't model it.
     */
    #[serde(default)]
    pub template: serde_json::Value,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FleetStatus {
    pub replicas: Option<i32>,

    pub ready_replicas: Option<i32>,

    pub allocated_replicas: Option<i32>,

    pub reserved_replicas: Option<i32>,
}

impl Fleet {

    /*
     * Whether this fleet carries the aimmo ownership label.
     */
    pub fn is_owned(&self) -> bool {
	match self.metadata.labels {
	    Some(ref labels) => labels.get(crate::MANAGED_BY_LABEL).map(String::as_str) == Some(crate::MANAGED_BY_VALUE),
	    None => false,
	}
    }

    pub fn replicas(&self) -> i32 {
	self.spec.replicas.unwrap_or(0)
    }

    pub fn fleet_name(&self) -> String {
	self.name_any()
    }
}
