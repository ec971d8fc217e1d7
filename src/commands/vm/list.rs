use crate::commands::helpers;
use crate::config::Config;
use crate::error::{PccVmError, Result};
use crate::vsphere::inventory::{find_all_in_folders, find_folder};
use crate::vsphere::types::{ManagedObjectReference, ObjectKind};
use crate::vsphere::Vim;

pub fn execute(config: &Config, folder: Option<&str>) -> Result<()> {
    let vim = helpers::connect(config)?;
    let datacenter = helpers::datacenter(&vim, config)?;

    for name in list_vms(&vim, &datacenter, folder)? {
        println!("VM Name: {}", name);
    }

    Ok(())
}

/// Names of every VM below the datacenter's VM folder, or below the first
/// folder named `folder` when one is given.
pub fn list_vms<V: Vim + ?Sized>(
    vim: &V,
    datacenter: &ManagedObjectReference,
    folder: Option<&str>,
) -> Result<Vec<String>> {
    let vm_folder = vim.vm_folder(datacenter)?;

    let base = match folder {
        Some(name) => find_folder(vim, &vm_folder, name)?
            .ok_or_else(|| PccVmError::FolderNotFound(name.to_string()))?,
        None => vm_folder,
    };

    find_all_in_folders(vim, &base, ObjectKind::VirtualMachine)?
        .iter()
        .map(|vm| vim.name(vm))
        .collect()
}
