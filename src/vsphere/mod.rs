pub mod client;
pub mod inventory;
pub mod task;
pub mod types;

#[cfg(test)]
pub mod fake;

use crate::error::Result;
use types::{ManagedObjectReference, PowerState, TaskInfo, VirtualMachineCloneSpec};

pub use client::{ConnectionSettings, VimClient};

/// Operations the commands need from a vSphere endpoint.
///
/// Methods ending in task verbs (`clone_vm`, `power_on`, ...) return the
/// handle of the remote task; use [`task::wait_for_completion`] to block on it.
pub trait Vim {
    fn root_folder(&self) -> ManagedObjectReference;

    /// `Folder.childEntity`
    fn child_entities(&self, folder: &ManagedObjectReference)
        -> Result<Vec<ManagedObjectReference>>;

    fn name(&self, obj: &ManagedObjectReference) -> Result<String>;

    fn parent(&self, obj: &ManagedObjectReference) -> Result<Option<ManagedObjectReference>>;

    fn vm_folder(&self, datacenter: &ManagedObjectReference) -> Result<ManagedObjectReference>;

    fn host_folder(&self, datacenter: &ManagedObjectReference) -> Result<ManagedObjectReference>;

    fn resource_pool(
        &self,
        compute_resource: &ManagedObjectReference,
    ) -> Result<ManagedObjectReference>;

    /// `VirtualMachine.config.template`; a VM without config is not a template.
    fn is_template(&self, vm: &ManagedObjectReference) -> Result<bool>;

    fn power_state(&self, vm: &ManagedObjectReference) -> Result<PowerState>;

    /// `VirtualMachine.guest.hostName`, unset until VMware Tools reports it.
    fn guest_hostname(&self, vm: &ManagedObjectReference) -> Result<Option<String>>;

    fn clone_vm(
        &self,
        vm: &ManagedObjectReference,
        folder: &ManagedObjectReference,
        name: &str,
        spec: &VirtualMachineCloneSpec,
    ) -> Result<ManagedObjectReference>;

    fn power_on(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference>;

    fn power_off(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference>;

    fn destroy(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference>;

    fn task_info(&self, task: &ManagedObjectReference) -> Result<TaskInfo>;
}
