use thiserror::Error;

#[derive(Error, Debug)]
pub enum PccVmError {
    #[error("Datacenter not found: {0}")]
    DatacenterNotFound(String),

    #[error("No such folder: {0}")]
    FolderNotFound(String),

    #[error("VM {0} not found")]
    VmNotFound(String),

    #[error("No compute resource found in datacenter {0}")]
    NoComputeResource(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from vSphere: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("vSphere API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Task failed: {0}")]
    Task(String),

    #[error("Timed out after {waited_secs}s waiting for guest {vm} to report its hostname")]
    HostnameTimeout { vm: String, waited_secs: u64 },

    #[error("Cannot reach {host} over SSH: {reason}")]
    SshUnreachable { host: String, reason: String },

    #[error("Bootstrap command not found: {0}. Install it or set bootstrap.command")]
    BootstrapNotInstalled(String),

    #[error("Bootstrap failed: {0}")]
    BootstrapFailed(String),
}

pub type Result<T> = std::result::Result<T, PccVmError>;
