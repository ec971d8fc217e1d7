use crate::commands::helpers;
use crate::config::Config;
use crate::error::Result;
use crate::vsphere::inventory::find_all_in_folders;
use crate::vsphere::types::{ManagedObjectReference, ObjectKind};
use crate::vsphere::Vim;

pub fn execute(config: &Config) -> Result<()> {
    let vim = helpers::connect(config)?;
    let datacenter = helpers::datacenter(&vim, config)?;

    for name in list_templates(&vim, &datacenter)? {
        println!("Template Name: {}", name);
    }

    Ok(())
}

/// Names of every VM flagged as a template below the datacenter's VM folder.
pub fn list_templates<V: Vim + ?Sized>(
    vim: &V,
    datacenter: &ManagedObjectReference,
) -> Result<Vec<String>> {
    let vm_folder = vim.vm_folder(datacenter)?;

    let mut names = Vec::new();
    for vm in find_all_in_folders(vim, &vm_folder, ObjectKind::VirtualMachine)? {
        if vim.is_template(&vm)? {
            names.push(vim.name(&vm)?);
        }
    }
    Ok(names)
}
