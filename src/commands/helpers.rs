use crate::config::Config;
use crate::error::Result;
use crate::vsphere::inventory;
use crate::vsphere::types::ManagedObjectReference;
use crate::vsphere::{Vim, VimClient};
use tracing::debug;

/// Open a vSphere session using the merged configuration.
pub fn connect(config: &Config) -> Result<VimClient> {
    let settings = config.connection_settings()?;
    debug!(host = %settings.host, insecure = settings.insecure, "connecting to vCenter");
    VimClient::connect(&settings)
}

/// Resolve the configured datacenter, or the first one when none is configured.
pub fn datacenter<V: Vim + ?Sized>(vim: &V, config: &Config) -> Result<ManagedObjectReference> {
    let dc = inventory::require_datacenter(vim, config.vsphere.datacenter.as_deref())?;
    debug!(datacenter = %dc, "resolved datacenter");
    Ok(dc)
}
