//! Wire types for the vSphere JSON API.
//!
//! Data objects sent to the server carry a `_typeName` discriminator; the
//! serializable structs below are named after the vSphere type they encode so
//! that `#[serde(tag = "_typeName")]` emits the right value.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Opaque handle to a remote managed object (`Folder:group-v3`, `Task:task-12`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ManagedObjectReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn is(&self, kind: ObjectKind) -> bool {
        kind.matches(&self.kind)
    }
}

impl Serialize for ManagedObjectReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ManagedObjectReference", 3)?;
        state.serialize_field("_typeName", "ManagedObjectReference")?;
        state.serialize_field("type", &self.kind)?;
        state.serialize_field("value", &self.value)?;
        state.end()
    }
}

impl fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Kinds of inventory objects the folder walkers look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Folder,
    Datacenter,
    VirtualMachine,
    /// Standalone hosts and clusters alike.
    ComputeResource,
}

impl ObjectKind {
    pub fn matches(&self, type_name: &str) -> bool {
        match self {
            ObjectKind::Folder => type_name == "Folder",
            ObjectKind::Datacenter => type_name == "Datacenter",
            ObjectKind::VirtualMachine => type_name == "VirtualMachine",
            ObjectKind::ComputeResource => {
                type_name == "ComputeResource" || type_name == "ClusterComputeResource"
            }
        }
    }
}

/// The subset of `ServiceContent` the client needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    pub root_folder: ManagedObjectReference,
    pub session_manager: ManagedObjectReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineRuntimeInfo {
    pub power_state: PowerState,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestInfo {
    #[serde(default)]
    pub host_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VirtualMachineConfigInfo {
    #[serde(default)]
    pub template: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskState {
    Queued,
    Running,
    Success,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedMethodFault {
    #[serde(default)]
    pub localized_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskInfo {
    pub state: TaskState,
    #[serde(default)]
    pub error: Option<LocalizedMethodFault>,
}

impl TaskInfo {
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .and_then(|fault| fault.localized_message.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

// Clone and customization specs

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct VirtualMachineCloneSpec {
    pub location: VirtualMachineRelocateSpec,
    pub template: bool,
    pub power_on: bool,
    pub customization: CustomizationSpec,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct VirtualMachineRelocateSpec {
    pub pool: ManagedObjectReference,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct CustomizationSpec {
    pub identity: CustomizationLinuxPrep,
    #[serde(rename = "globalIPSettings")]
    pub global_ip_settings: CustomizationGlobalIPSettings,
    pub nic_setting_map: Vec<CustomizationAdapterMapping>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct CustomizationLinuxPrep {
    pub host_name: CustomizationFixedName,
    pub domain: String,
    pub time_zone: String,
    #[serde(rename = "hwClockUTC")]
    pub hw_clock_utc: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "_typeName")]
pub struct CustomizationFixedName {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct CustomizationGlobalIPSettings {
    pub dns_suffix_list: Vec<String>,
    pub dns_server_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "_typeName")]
pub struct CustomizationAdapterMapping {
    pub adapter: CustomizationIPSettings,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct CustomizationIPSettings {
    pub ip: CustomizationFixedIp,
    pub subnet_mask: String,
    pub gateway: Vec<String>,
    pub dns_server_list: Vec<String>,
    pub dns_domain: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "_typeName", rename_all = "camelCase")]
pub struct CustomizationFixedIp {
    pub ip_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_moref_serializes_with_type_name() {
        let moref = ManagedObjectReference::new("ResourcePool", "resgroup-8");
        let value = serde_json::to_value(&moref).unwrap();
        assert_eq!(
            value,
            json!({"_typeName": "ManagedObjectReference", "type": "ResourcePool", "value": "resgroup-8"})
        );
    }

    #[test]
    fn test_moref_deserializes_ignoring_type_name() {
        let moref: ManagedObjectReference = serde_json::from_value(
            json!({"_typeName": "ManagedObjectReference", "type": "Folder", "value": "group-v3"}),
        )
        .unwrap();
        assert_eq!(moref, ManagedObjectReference::new("Folder", "group-v3"));
        assert_eq!(moref.to_string(), "Folder:group-v3");
    }

    #[test]
    fn test_compute_resource_kind_matches_clusters() {
        assert!(ObjectKind::ComputeResource.matches("ComputeResource"));
        assert!(ObjectKind::ComputeResource.matches("ClusterComputeResource"));
        assert!(!ObjectKind::ComputeResource.matches("HostSystem"));
        assert!(!ObjectKind::VirtualMachine.matches("Folder"));
    }

    #[test]
    fn test_task_info_parsing() {
        let info: TaskInfo = serde_json::from_value(json!({
            "_typeName": "TaskInfo",
            "key": "task-42",
            "state": "error",
            "error": {"_typeName": "LocalizedMethodFault", "localizedMessage": "The name 'web06' already exists."}
        }))
        .unwrap();
        assert_eq!(info.state, TaskState::Error);
        assert_eq!(info.error_message(), "The name 'web06' already exists.");
    }

    #[test]
    fn test_runtime_and_config_parsing() {
        let runtime: VirtualMachineRuntimeInfo =
            serde_json::from_value(json!({"powerState": "poweredOff", "connectionState": "connected"}))
                .unwrap();
        assert_eq!(runtime.power_state, PowerState::PoweredOff);

        let config: VirtualMachineConfigInfo =
            serde_json::from_value(json!({"name": "tpl", "template": true})).unwrap();
        assert!(config.template);
    }

    #[test]
    fn test_linux_prep_field_names() {
        let prep = CustomizationLinuxPrep {
            host_name: CustomizationFixedName {
                name: "web06".to_string(),
            },
            domain: "example.com".to_string(),
            time_zone: "Europe/Paris".to_string(),
            hw_clock_utc: false,
        };
        let value = serde_json::to_value(&prep).unwrap();
        assert_eq!(value["_typeName"], "CustomizationLinuxPrep");
        assert_eq!(value["hostName"]["_typeName"], "CustomizationFixedName");
        assert_eq!(value["hwClockUTC"], false);
        assert_eq!(value["timeZone"], "Europe/Paris");
    }
}
