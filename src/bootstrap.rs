use crate::error::{PccVmError, Result};
use std::process::{Command, Stdio};
use tracing::{debug, info};

pub const DEFAULT_COMMAND: &str = "knife";
pub const DEFAULT_DISTRO: &str = "ubuntu10.04-apt";
pub const DEFAULT_SSH_USER: &str = "root";

/// Parameters handed to `knife bootstrap` once a clone answers on SSH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    pub host: String,
    pub run_list: Vec<String>,
    pub ssh_user: String,
    pub ssh_password: Option<String>,
    pub distro: String,
    pub bootstrap_version: Option<String>,
    pub node_name: Option<String>,
    pub environment: Option<String>,
}

impl BootstrapRequest {
    /// Non-root users bootstrap through sudo.
    pub fn use_sudo(&self) -> bool {
        self.ssh_user != "root"
    }

    /// Arguments after the executable name.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "bootstrap".to_string(),
            self.host.clone(),
            "-x".to_string(),
            self.ssh_user.clone(),
        ];

        if let Some(password) = &self.ssh_password {
            args.push("-P".to_string());
            args.push(password.clone());
        }
        if !self.run_list.is_empty() {
            args.push("-r".to_string());
            args.push(self.run_list.join(","));
        }
        if let Some(node) = &self.node_name {
            args.push("-N".to_string());
            args.push(node.clone());
        }
        if let Some(env) = &self.environment {
            args.push("-E".to_string());
            args.push(env.clone());
        }
        if let Some(version) = &self.bootstrap_version {
            args.push("--bootstrap-version".to_string());
            args.push(version.clone());
        }
        args.push("-d".to_string());
        args.push(self.distro.clone());
        if self.use_sudo() {
            args.push("--sudo".to_string());
        }

        args
    }

    /// Command line suitable for logs, with the password masked.
    pub fn display(&self, command: &str) -> String {
        let mut masked = false;
        let mut parts = vec![command.to_string()];
        for arg in self.to_args() {
            if masked {
                parts.push("********".to_string());
                masked = false;
                continue;
            }
            masked = arg == "-P";
            parts.push(arg);
        }
        parts.join(" ")
    }
}

/// Split a run list given as `"role[web], recipe[apt]"` or `"a b"`.
pub fn parse_run_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs the external bootstrap tool.
pub struct Bootstrapper {
    command: String,
}

impl Bootstrapper {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn is_installed(&self) -> bool {
        which::which(&self.command).is_ok()
    }

    /// Run the bootstrap with inherited stdio so its output streams to the user.
    pub fn run(&self, request: &BootstrapRequest) -> Result<()> {
        if !self.is_installed() {
            return Err(PccVmError::BootstrapNotInstalled(self.command.clone()));
        }

        info!(host = %request.host, "starting bootstrap");
        debug!(command = %request.display(&self.command), "spawning bootstrap");

        let status = Command::new(&self.command)
            .args(request.to_args())
            .stdin(Stdio::null())
            .status()
            .map_err(|e| {
                PccVmError::BootstrapFailed(format!("failed to run {}: {}", self.command, e))
            })?;

        if !status.success() {
            return Err(PccVmError::BootstrapFailed(format!(
                "{} exited with {}",
                self.command,
                status
                    .code()
                    .map(|c| format!("status {}", c))
                    .unwrap_or_else(|| "a signal".to_string())
            )));
        }

        Ok(())
    }
}
