use crate::commands::helpers;
use crate::config::Config;
use crate::error::Result;
use crate::vsphere::inventory::require_vm;
use crate::vsphere::task::{self, DEFAULT_POLL_INTERVAL};
use crate::vsphere::types::{ManagedObjectReference, PowerState};
use crate::vsphere::Vim;
use std::time::Duration;
use tracing::info;

pub fn execute(config: &Config, name: &str) -> Result<()> {
    let vim = helpers::connect(config)?;
    let datacenter = helpers::datacenter(&vim, config)?;

    delete_vm(&vim, &datacenter, name, DEFAULT_POLL_INTERVAL)?;
    println!("Deleted virtual machine {}", name);

    Ok(())
}

/// Power off `name` unless it already is, then destroy it.
///
/// Returns whether a power-off was needed.
pub fn delete_vm<V: Vim + ?Sized>(
    vim: &V,
    datacenter: &ManagedObjectReference,
    name: &str,
    poll_interval: Duration,
) -> Result<bool> {
    let vm = require_vm(vim, datacenter, name)?;

    let needs_power_off = vim.power_state(&vm)? != PowerState::PoweredOff;
    if needs_power_off {
        info!(vm = name, "powering off before destroy");
        let power_off = vim.power_off(&vm)?;
        task::wait_for_completion(
            vim,
            &power_off,
            &format!("Powering off {}", name),
            poll_interval,
        )?;
    }

    let destroy = vim.destroy(&vm)?;
    task::wait_for_completion(vim, &destroy, &format!("Destroying {}", name), poll_interval)?;

    Ok(needs_power_off)
}
