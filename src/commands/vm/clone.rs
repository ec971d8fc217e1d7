//! `vm clone`: clone a template, customize the guest, power it on and hand it
//! to the bootstrap tool once it answers on SSH.
//!
//! The workflow runs as a fixed sequence of [`CloneStage`]s. Each stage either
//! completes or returns a typed error; nothing exits the process.

use crate::bootstrap::{parse_run_list, BootstrapRequest, Bootstrapper};
use crate::cli::CloneArgs;
use crate::commands::helpers;
use crate::config::Config;
use crate::customization::{self, CustomizationArgs, CustomizationParams};
use crate::error::{PccVmError, Result};
use crate::probe::{self, ProbePolicy};
use crate::vsphere::inventory::{find_all_in_folders, require_vm};
use crate::vsphere::task::{self, DEFAULT_POLL_INTERVAL};
use crate::vsphere::types::{ManagedObjectReference, ObjectKind};
use crate::vsphere::Vim;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneStage {
    /// Find the template, its folder and the target resource pool
    Resolve,
    /// Issue the clone task with the customization spec
    Clone,
    PowerOn,
    /// Poll the guest until VMware Tools reports the expected hostname
    WaitForHostname,
    WaitForSsh,
    Bootstrap,
}

impl CloneStage {
    pub fn name(&self) -> &'static str {
        match self {
            CloneStage::Resolve => "resolve",
            CloneStage::Clone => "clone",
            CloneStage::PowerOn => "power-on",
            CloneStage::WaitForHostname => "wait-for-hostname",
            CloneStage::WaitForSsh => "wait-for-ssh",
            CloneStage::Bootstrap => "bootstrap",
        }
    }
}

/// How the hostname poll paces itself.
#[derive(Debug, Clone, Copy)]
pub struct HostnameWait {
    pub interval: Duration,
    /// `None` polls until the hostname shows up.
    pub timeout: Option<Duration>,
}

/// Everything the workflow needs, resolved from flags and configuration.
#[derive(Debug, Clone)]
pub struct ClonePlan {
    pub vm_name: String,
    pub template: String,
    pub customization: CustomizationParams,
    pub power_on: bool,
    pub hostname_wait: HostnameWait,
    pub task_poll_interval: Duration,
    /// `None` stops after the hostname wait.
    pub bootstrap: Option<BootstrapRequest>,
}

impl ClonePlan {
    pub fn from_args(config: &Config, args: &CloneArgs) -> Result<Self> {
        let customization = CustomizationParams::parse(
            &args.name,
            &CustomizationArgs {
                ip: args.ip.clone(),
                netmask: args.netmask.clone(),
                gateway: args.gateway.clone(),
                dns: args.dns.clone(),
                domain: args.domain.clone(),
                hostname: args.hostname.clone(),
                timezone: args
                    .timezone
                    .clone()
                    .or_else(|| config.clone.timezone.clone()),
            },
        )?;

        let bs = &config.bootstrap;
        let bootstrap = (!args.no_bootstrap).then(|| BootstrapRequest {
            host: customization.ip.to_string(),
            run_list: args
                .run_list
                .as_deref()
                .map(parse_run_list)
                .unwrap_or_else(|| bs.run_list.clone()),
            ssh_user: args.ssh_user.clone().unwrap_or_else(|| bs.ssh_user.clone()),
            ssh_password: args.ssh_password.clone(),
            distro: args.distro.clone().unwrap_or_else(|| bs.distro.clone()),
            bootstrap_version: args.bootstrap_version.clone().or_else(|| bs.version.clone()),
            node_name: args.node_name.clone(),
            environment: args.environment.clone().or_else(|| bs.environment.clone()),
        });

        Ok(Self {
            vm_name: args.name.clone(),
            template: args.template.clone(),
            customization,
            power_on: args.start.unwrap_or(config.clone.power_on),
            hostname_wait: HostnameWait {
                interval: config.poll_interval(),
                timeout: config.hostname_timeout(),
            },
            task_poll_interval: DEFAULT_POLL_INTERVAL,
            bootstrap,
        })
    }

    /// Whether the run will reach the SSH and bootstrap stages.
    pub fn will_bootstrap(&self) -> bool {
        self.power_on && self.bootstrap.is_some()
    }
}

/// Post power-on provisioning of the guest.
pub trait Provisioner {
    /// Block until the host answers on SSH; returns the server banner.
    ///
    /// `on_retry` runs before every new attempt.
    fn wait_for_ssh(&mut self, host: &str, on_retry: &mut dyn FnMut()) -> Result<String>;

    fn bootstrap(&mut self, request: &BootstrapRequest) -> Result<()>;
}

/// Probes port 22 and then runs the external bootstrap tool.
pub struct SshBootstrap {
    pub policy: ProbePolicy,
    pub bootstrapper: Bootstrapper,
}

impl Provisioner for SshBootstrap {
    fn wait_for_ssh(&mut self, host: &str, on_retry: &mut dyn FnMut()) -> Result<String> {
        probe::wait_for_ssh(host, &self.policy, |_| on_retry())
    }

    fn bootstrap(&mut self, request: &BootstrapRequest) -> Result<()> {
        self.bootstrapper.run(request)
    }
}

#[derive(Debug)]
pub struct CloneOutcome {
    pub vm: ManagedObjectReference,
    /// Stages that ran to completion, in order.
    pub completed: Vec<CloneStage>,
    pub ssh_banner: Option<String>,
}

struct Resolved {
    template: ManagedObjectReference,
    folder: ManagedObjectReference,
    pool: ManagedObjectReference,
}

pub fn execute(config: &Config, args: &CloneArgs) -> Result<()> {
    let plan = ClonePlan::from_args(config, args)?;

    let bootstrapper = Bootstrapper::new(config.bootstrap.command.clone());
    // Checked up front so a missing tool doesn't leave a half-provisioned VM
    if plan.will_bootstrap() && !bootstrapper.is_installed() {
        return Err(PccVmError::BootstrapNotInstalled(
            bootstrapper.command().to_string(),
        ));
    }

    let vim = helpers::connect(config)?;
    let datacenter = helpers::datacenter(&vim, config)?;

    let mut provisioner = SshBootstrap {
        policy: config.ssh_probe_policy(),
        bootstrapper,
    };
    run(&vim, &datacenter, &plan, &mut provisioner, &mut std::io::stdout())?;

    Ok(())
}

/// Drive the clone workflow against `vim`, writing progress lines to `out`.
pub fn run<V, P, W>(
    vim: &V,
    datacenter: &ManagedObjectReference,
    plan: &ClonePlan,
    provisioner: &mut P,
    out: &mut W,
) -> Result<CloneOutcome>
where
    V: Vim + ?Sized,
    P: Provisioner + ?Sized,
    W: Write + ?Sized,
{
    let mut completed = Vec::new();
    let vm_name = plan.vm_name.as_str();

    debug!(stage = CloneStage::Resolve.name(), vm = vm_name, template = %plan.template);
    let resolved = resolve(vim, datacenter, &plan.template)?;
    completed.push(CloneStage::Resolve);

    debug!(stage = CloneStage::Clone.name(), vm = vm_name);
    let spec = customization::clone_spec(resolved.pool, &plan.customization);
    let clone_task = vim.clone_vm(&resolved.template, &resolved.folder, vm_name, &spec)?;
    writeln!(out, "Cloning template {} to new VM {}", plan.template, vm_name)?;
    task::wait_for_completion(
        vim,
        &clone_task,
        &format!("Cloning {}", vm_name),
        plan.task_poll_interval,
    )?;
    writeln!(out, "Finished creating virtual machine {}", vm_name)?;
    completed.push(CloneStage::Clone);

    let vm = require_vm(vim, datacenter, vm_name)?;

    if !plan.power_on {
        info!(vm = vm_name, "power-on not requested, leaving VM off");
        return Ok(CloneOutcome {
            vm,
            completed,
            ssh_banner: None,
        });
    }

    debug!(stage = CloneStage::PowerOn.name(), vm = vm_name);
    let power_task = vim.power_on(&vm)?;
    task::wait_for_completion(
        vim,
        &power_task,
        &format!("Powering on {}", vm_name),
        plan.task_poll_interval,
    )?;
    writeln!(out, "Powered on virtual machine {}", vm_name)?;
    completed.push(CloneStage::PowerOn);

    debug!(stage = CloneStage::WaitForHostname.name(), vm = vm_name);
    let expected = plan.customization.hostname.as_str();
    let reported = dotted(out, "Waiting for server", |dot| {
        wait_for_hostname(vim, &vm, vm_name, expected, &plan.hostname_wait, dot)
    })?;
    info!(vm = vm_name, hostname = %reported, "guest customization done");
    completed.push(CloneStage::WaitForHostname);

    let Some(request) = &plan.bootstrap else {
        writeln!(out, "VM {} - Ready", vm_name)?;
        return Ok(CloneOutcome {
            vm,
            completed,
            ssh_banner: None,
        });
    };

    writeln!(out, "VM {} - Ready - Starting bootstrap", vm_name)?;
    debug!(stage = CloneStage::WaitForSsh.name(), host = %request.host);
    let label = format!("Waiting for SSH on {}", request.host);
    let banner = dotted(out, &label, |dot| provisioner.wait_for_ssh(&request.host, dot))?;
    completed.push(CloneStage::WaitForSsh);

    debug!(stage = CloneStage::Bootstrap.name(), host = %request.host);
    provisioner.bootstrap(request)?;
    completed.push(CloneStage::Bootstrap);
    writeln!(out, "Server {} is up and bootstrapped", vm_name)?;

    Ok(CloneOutcome {
        vm,
        completed,
        ssh_banner: Some(banner),
    })
}

/// Print `label`, let `wait` append a dot per retry, then end the line
/// whether or not the wait succeeded.
fn dotted<W, T>(
    out: &mut W,
    label: &str,
    wait: impl FnOnce(&mut dyn FnMut()) -> Result<T>,
) -> Result<T>
where
    W: Write + ?Sized,
{
    write!(out, "{}", label)?;
    out.flush()?;
    let result = wait(&mut || {
        let _ = write!(out, ".");
        let _ = out.flush();
    });
    writeln!(out)?;
    result
}

fn resolve<V: Vim + ?Sized>(
    vim: &V,
    datacenter: &ManagedObjectReference,
    template_name: &str,
) -> Result<Resolved> {
    let template = require_vm(vim, datacenter, template_name)?;

    let host_folder = vim.host_folder(datacenter)?;
    let compute = find_all_in_folders(vim, &host_folder, ObjectKind::ComputeResource)?
        .into_iter()
        .next()
        .ok_or_else(|| match vim.name(datacenter) {
            Ok(name) => PccVmError::NoComputeResource(name),
            Err(e) => e,
        })?;
    let pool = vim.resource_pool(&compute)?;

    let folder = match vim.parent(&template)? {
        Some(parent) => parent,
        None => vim.vm_folder(datacenter)?,
    };

    debug!(%template, %folder, %pool, "resolved clone placement");
    Ok(Resolved {
        template,
        folder,
        pool,
    })
}

/// Poll `guest.hostName` until it equals `expected` (ignoring case), or the
/// reported name is `expected` followed by a domain.
///
/// `on_poll` runs after every miss, before sleeping.
pub fn wait_for_hostname<V: Vim + ?Sized>(
    vim: &V,
    vm: &ManagedObjectReference,
    vm_name: &str,
    expected: &str,
    wait: &HostnameWait,
    mut on_poll: impl FnMut(),
) -> Result<String> {
    let started = Instant::now();
    loop {
        let reported = vim.guest_hostname(vm)?;
        if let Some(name) = reported.as_deref() {
            if hostname_matches(name, expected) {
                return Ok(name.to_string());
            }
        }
        debug!(vm = vm_name, ?reported, expected, "hostname not reported yet");

        if let Some(timeout) = wait.timeout {
            if started.elapsed() >= timeout {
                return Err(PccVmError::HostnameTimeout {
                    vm: vm_name.to_string(),
                    waited_secs: timeout.as_secs(),
                });
            }
        }

        on_poll();
        std::thread::sleep(wait.interval);
    }
}

fn hostname_matches(reported: &str, expected: &str) -> bool {
    if reported.eq_ignore_ascii_case(expected) {
        return true;
    }
    match reported.split_once('.') {
        Some((short, _)) => short.eq_ignore_ascii_case(expected),
        None => false,
    }
}
