use crate::bootstrap;
use crate::cli::Cli;
use crate::error::{PccVmError, Result};
use crate::probe::ProbePolicy;
use crate::vsphere::ConnectionSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = ".pcc-vm.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub vsphere: VsphereConfig,

    #[serde(default)]
    pub clone: CloneConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    /// Verbose logging (not stored in config file)
    #[serde(skip)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VsphereConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,

    /// Accept invalid TLS certificates
    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_api_release")]
    pub api_release: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VsphereConfig {
    fn default() -> Self {
        Self {
            host: None,
            user: None,
            password: None,
            datacenter: None,
            insecure: false,
            api_release: default_api_release(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_release() -> String {
    "8.0.1.0".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(default = "default_true")]
    pub power_on: bool,

    /// 0 waits forever
    #[serde(default = "default_hostname_timeout_secs")]
    pub hostname_timeout_secs: u64,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Bound on the SSH wait before bootstrap; 0 waits forever
    #[serde(default)]
    pub ssh_timeout_secs: u64,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            timezone: None,
            power_on: true,
            hostname_timeout_secs: default_hostname_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            ssh_timeout_secs: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_hostname_timeout_secs() -> u64 {
    1800
}

fn default_poll_interval_secs() -> u64 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_bootstrap_command")]
    pub command: String,

    #[serde(default = "default_distro")]
    pub distro: String,

    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub run_list: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            command: default_bootstrap_command(),
            distro: default_distro(),
            ssh_user: default_ssh_user(),
            version: None,
            run_list: Vec::new(),
            environment: None,
        }
    }
}

fn default_bootstrap_command() -> String {
    bootstrap::DEFAULT_COMMAND.to_string()
}

fn default_distro() -> String {
    bootstrap::DEFAULT_DISTRO.to_string()
}

fn default_ssh_user() -> String {
    bootstrap::DEFAULT_SSH_USER.to_string()
}

/// One configuration file. Every key is optional so that a file only
/// overrides what it sets, including values equal to the defaults.
#[derive(Debug, Default, Deserialize)]
struct ConfigLayer {
    #[serde(default)]
    vsphere: VsphereLayer,

    #[serde(default)]
    clone: CloneLayer,

    #[serde(default)]
    bootstrap: BootstrapLayer,
}

#[derive(Debug, Default, Deserialize)]
struct VsphereLayer {
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
    datacenter: Option<String>,
    insecure: Option<bool>,
    api_release: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CloneLayer {
    timezone: Option<String>,
    power_on: Option<bool>,
    hostname_timeout_secs: Option<u64>,
    poll_interval_secs: Option<u64>,
    ssh_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BootstrapLayer {
    command: Option<String>,
    distro: Option<String>,
    ssh_user: Option<String>,
    version: Option<String>,
    #[serde(default)]
    run_list: Vec<String>,
    environment: Option<String>,
}

impl Config {
    /// Load configuration with precedence:
    /// 1. CLI flags (applied later via with_cli_overrides)
    /// 2. Environment variables (PCC_VM_*)
    /// 3. Project config (./.pcc-vm.toml)
    /// 4. Global config (~/.pcc-vm.toml)
    /// 5. Built-in defaults
    ///
    /// An explicit `--config` file replaces both files.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(PccVmError::InvalidConfig(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::default().merge(Self::from_file(path)?)
            }
            None => {
                let global = home_dir().map(|home| home.join(CONFIG_FILE_NAME));
                let project = std::env::current_dir()?.join(CONFIG_FILE_NAME);
                Self::load_layers(global.as_deref(), &project)?
            }
        };

        Ok(config.merge_env())
    }

    /// Merge the global and project files, skipping those that don't exist.
    fn load_layers(global: Option<&Path>, project: &Path) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global) = global {
            if global.exists() {
                config = config.merge(Self::from_file(global)?);
            }
        }

        if project.exists() && Some(project) != global {
            config = config.merge(Self::from_file(project)?);
        }

        Ok(config)
    }

    /// Load one configuration file
    fn from_file(path: &Path) -> Result<ConfigLayer> {
        let contents = std::fs::read_to_string(path)?;
        let layer: ConfigLayer = toml::from_str(&contents)?;
        Ok(layer)
    }

    /// Apply a file on top of this config; every key it sets wins
    fn merge(mut self, layer: ConfigLayer) -> Self {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        // Connection
        let vs = layer.vsphere;
        self.vsphere.host = vs.host.or(self.vsphere.host);
        self.vsphere.user = vs.user.or(self.vsphere.user);
        self.vsphere.password = vs.password.or(self.vsphere.password);
        self.vsphere.datacenter = vs.datacenter.or(self.vsphere.datacenter);
        set(&mut self.vsphere.insecure, vs.insecure);
        set(&mut self.vsphere.api_release, vs.api_release);
        set(&mut self.vsphere.timeout_secs, vs.timeout_secs);

        // Clone
        let cl = layer.clone;
        self.clone.timezone = cl.timezone.or(self.clone.timezone);
        set(&mut self.clone.power_on, cl.power_on);
        set(&mut self.clone.hostname_timeout_secs, cl.hostname_timeout_secs);
        set(&mut self.clone.poll_interval_secs, cl.poll_interval_secs);
        set(&mut self.clone.ssh_timeout_secs, cl.ssh_timeout_secs);

        // Bootstrap
        let bs = layer.bootstrap;
        set(&mut self.bootstrap.command, bs.command);
        set(&mut self.bootstrap.distro, bs.distro);
        set(&mut self.bootstrap.ssh_user, bs.ssh_user);
        self.bootstrap.version = bs.version.or(self.bootstrap.version);
        self.bootstrap.environment = bs.environment.or(self.bootstrap.environment);
        // Run list (append)
        self.bootstrap.run_list.extend(bs.run_list);

        self
    }

    /// Apply environment variable overrides
    fn merge_env(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(host) = var("PCC_VM_HOST") {
            self.vsphere.host = Some(host);
        }
        if let Some(user) = var("PCC_VM_USER") {
            self.vsphere.user = Some(user);
        }
        if let Some(password) = var("PCC_VM_PASSWORD") {
            self.vsphere.password = Some(password);
        }
        if let Some(datacenter) = var("PCC_VM_DATACENTER") {
            self.vsphere.datacenter = Some(datacenter);
        }
        if let Some(insecure) = var("PCC_VM_INSECURE") {
            self.vsphere.insecure = matches!(insecure.as_str(), "1" | "true" | "yes");
        }

        self
    }

    /// Apply CLI overrides (highest precedence)
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        self.verbose = cli.verbose;

        if let Some(host) = &cli.host {
            self.vsphere.host = Some(host.clone());
        }
        if let Some(user) = &cli.user {
            self.vsphere.user = Some(user.clone());
        }
        if let Some(password) = &cli.password {
            self.vsphere.password = Some(password.clone());
        }
        if let Some(datacenter) = &cli.datacenter {
            self.vsphere.datacenter = Some(datacenter.clone());
        }
        if cli.insecure {
            self.vsphere.insecure = true;
        }

        self
    }

    /// Connection settings, failing on the first missing required key.
    pub fn connection_settings(&self) -> Result<ConnectionSettings> {
        let required = |value: &Option<String>, key: &str, flag: &str, env: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    PccVmError::InvalidConfig(format!(
                        "vsphere.{} is not set (use {}, {} or [vsphere] {} in {})",
                        key, flag, env, key, CONFIG_FILE_NAME
                    ))
                })
        };

        Ok(ConnectionSettings {
            host: required(&self.vsphere.host, "host", "--host", "PCC_VM_HOST")?,
            user: required(&self.vsphere.user, "user", "--user", "PCC_VM_USER")?,
            password: required(
                &self.vsphere.password,
                "password",
                "--password",
                "PCC_VM_PASSWORD",
            )?,
            insecure: self.vsphere.insecure,
            api_release: self.vsphere.api_release.clone(),
            timeout: Duration::from_secs(self.vsphere.timeout_secs),
        })
    }

    /// `None` when the hostname wait is unbounded.
    pub fn hostname_timeout(&self) -> Option<Duration> {
        match self.clone.hostname_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.clone.poll_interval_secs)
    }

    /// SSH probe policy with the configured overall bound.
    pub fn ssh_probe_policy(&self) -> ProbePolicy {
        ProbePolicy {
            max_wait: match self.clone.ssh_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            ..ProbePolicy::default()
        }
    }
}

/// Get the home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
