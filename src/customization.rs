//! Guest customization for cloned VMs.
//!
//! Flags arrive as plain strings; the only parsing done is CIDR parsing of the
//! IP address (which may carry a prefix length used to derive the netmask) and
//! splitting of comma-separated lists.

use crate::error::{PccVmError, Result};
use crate::vsphere::types::{
    CustomizationAdapterMapping, CustomizationFixedIp, CustomizationFixedName,
    CustomizationGlobalIPSettings, CustomizationIPSettings, CustomizationLinuxPrep,
    CustomizationSpec, ManagedObjectReference, VirtualMachineCloneSpec,
    VirtualMachineRelocateSpec,
};
use ipnetwork::IpNetwork;
use std::net::IpAddr;

pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";

/// Raw customization flags, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CustomizationArgs {
    pub ip: String,
    pub netmask: Option<String>,
    pub gateway: String,
    pub dns: String,
    pub domain: String,
    pub hostname: Option<String>,
    pub timezone: Option<String>,
}

/// Validated network identity for a new guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomizationParams {
    pub hostname: String,
    pub ip: IpAddr,
    pub netmask: String,
    pub gateways: Vec<String>,
    pub dns_servers: Vec<String>,
    pub domain: String,
    pub dns_suffixes: Vec<String>,
    pub timezone: String,
}

impl CustomizationParams {
    /// Parse flags for a VM named `vm_name`; the hostname defaults to the VM name.
    pub fn parse(vm_name: &str, args: &CustomizationArgs) -> Result<Self> {
        let network: IpNetwork = args.ip.trim().parse().map_err(|e| {
            PccVmError::InvalidArgument(format!("invalid IP address '{}': {}", args.ip, e))
        })?;

        let netmask = match args.netmask.as_deref().map(str::trim) {
            Some(mask) if !mask.is_empty() => mask.to_string(),
            _ if args.ip.contains('/') => network.mask().to_string(),
            _ => {
                return Err(PccVmError::InvalidArgument(
                    "--netmask is required unless --ip carries a prefix length (e.g. 10.0.0.5/24)"
                        .to_string(),
                ))
            }
        };

        let gateways = split_list(&args.gateway);
        if gateways.is_empty() {
            return Err(PccVmError::InvalidArgument("--gw must not be empty".to_string()));
        }
        let dns_servers = split_list(&args.dns);
        if dns_servers.is_empty() {
            return Err(PccVmError::InvalidArgument("--dns must not be empty".to_string()));
        }
        let domain = args.domain.trim().to_string();
        if domain.is_empty() {
            return Err(PccVmError::InvalidArgument("--domain must not be empty".to_string()));
        }

        let hostname = args
            .hostname
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(vm_name)
            .to_string();

        Ok(Self {
            hostname,
            ip: network.ip(),
            netmask,
            gateways,
            dns_servers,
            dns_suffixes: split_list(&domain),
            domain,
            timezone: args
                .timezone
                .clone()
                .filter(|tz| !tz.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
        })
    }

    /// Linux prep identity, global DNS settings and a single NIC mapping.
    pub fn to_spec(&self) -> CustomizationSpec {
        CustomizationSpec {
            identity: CustomizationLinuxPrep {
                host_name: CustomizationFixedName {
                    name: self.hostname.clone(),
                },
                domain: self.domain.clone(),
                time_zone: self.timezone.clone(),
                hw_clock_utc: false,
            },
            global_ip_settings: CustomizationGlobalIPSettings {
                dns_suffix_list: self.dns_suffixes.clone(),
                dns_server_list: self.dns_servers.clone(),
            },
            nic_setting_map: vec![CustomizationAdapterMapping {
                adapter: CustomizationIPSettings {
                    ip: CustomizationFixedIp {
                        ip_address: self.ip.to_string(),
                    },
                    subnet_mask: self.netmask.clone(),
                    gateway: self.gateways.clone(),
                    dns_server_list: self.dns_servers.clone(),
                    dns_domain: self.domain.clone(),
                },
            }],
        }
    }
}

/// Clone spec placing the copy in `pool`, powered off and not a template.
pub fn clone_spec(
    pool: ManagedObjectReference,
    customization: &CustomizationParams,
) -> VirtualMachineCloneSpec {
    VirtualMachineCloneSpec {
        location: VirtualMachineRelocateSpec { pool },
        template: false,
        power_on: false,
        customization: customization.to_spec(),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
