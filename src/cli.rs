use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pcc-vm")]
#[command(
    about = "List, clone and delete virtual machines on OVH Private Cloud (vSphere)",
    long_about = None
)]
#[command(version = env!("PCC_VM_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// vCenter host name or URL
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// vCenter user name
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// vCenter password
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Datacenter name or inventory path (first datacenter when unset)
    #[arg(short = 'D', long, global = true)]
    pub datacenter: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Read configuration from this file instead of ~/.pcc-vm.toml and ./.pcc-vm.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Template commands
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Virtual machine commands
    Vm {
        #[command(subcommand)]
        command: VmCommands,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show pcc-vm version
    Version,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// List all templates in the datacenter
    List,
}

#[derive(Subcommand, Debug)]
pub enum VmCommands {
    /// List virtual machines in the datacenter
    List {
        /// Only list VMs in this folder
        #[arg(short = 'f', long)]
        folder: Option<String>,
    },

    /// Power off and destroy a virtual machine
    Delete {
        /// Name of the virtual machine
        #[arg(value_parser = non_empty)]
        name: String,
    },

    /// Clone a template into a new VM and bootstrap it
    Clone(CloneArgs),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration files
    Validate,

    /// Show effective configuration after merging all sources
    Show,
}

#[derive(Args, Debug, Clone)]
pub struct CloneArgs {
    /// Name of the new virtual machine
    #[arg(value_parser = non_empty)]
    pub name: String,

    /// Template (or VM) to clone from
    #[arg(value_parser = non_empty)]
    pub template: String,

    /// IP address for customization, optionally with a prefix length (10.0.0.5/24)
    #[arg(long)]
    pub ip: String,

    /// Netmask for customization (derived from --ip prefix when omitted)
    #[arg(long)]
    pub netmask: Option<String>,

    /// Gateway(s) for customization, comma separated
    #[arg(long = "gw", value_name = "GATEWAY")]
    pub gateway: String,

    /// DNS server(s) for customization, comma separated
    #[arg(long)]
    pub dns: String,

    /// Domain name for customization
    #[arg(long)]
    pub domain: String,

    /// Unqualified hostname for customization (defaults to the VM name)
    #[arg(long)]
    pub hostname: Option<String>,

    /// Timezone in 'Area/Location' format
    #[arg(long = "tz", value_name = "TIMEZONE")]
    pub timezone: Option<String>,

    /// Bootstrap distro template
    #[arg(short = 'd', long)]
    pub distro: Option<String>,

    /// Version of the configuration agent to install
    #[arg(long = "bootstrap-version", value_name = "VERSION")]
    pub bootstrap_version: Option<String>,

    /// Comma separated list of roles/recipes to apply
    #[arg(short = 'r', long = "run-list", value_name = "RUN_LIST")]
    pub run_list: Option<String>,

    /// SSH user name
    #[arg(short = 'x', long = "ssh-user", value_name = "USERNAME")]
    pub ssh_user: Option<String>,

    /// SSH password
    #[arg(short = 'P', long = "ssh-password", value_name = "PASSWORD")]
    pub ssh_password: Option<String>,

    /// Node name to register (defaults to the bootstrap tool's choice)
    #[arg(short = 'N', long = "node-name")]
    pub node_name: Option<String>,

    /// Environment to place the node in
    #[arg(short = 'E', long)]
    pub environment: Option<String>,

    /// Start the VM after a successful clone
    #[arg(long = "start", value_name = "BOOL", action = ArgAction::Set)]
    pub start: Option<bool>,

    /// Power on but skip the SSH probe and bootstrap
    #[arg(long)]
    pub no_bootstrap: bool,
}

fn non_empty(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        Err("name must not be empty".to_string())
    } else {
        Ok(value.to_string())
    }
}
