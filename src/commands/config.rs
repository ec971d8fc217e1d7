use crate::config::{Config, CONFIG_FILE_NAME};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Load every configuration layer and report whether it parses.
pub fn validate(explicit: Option<&Path>) -> Result<()> {
    println!("Validating configuration files...\n");

    match explicit {
        Some(path) => println!("  Config: {}", path.display()),
        None => {
            let global = std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(CONFIG_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from("~").join(CONFIG_FILE_NAME));
            let project = std::env::current_dir()?.join(CONFIG_FILE_NAME);
            describe("Global config", &global);
            describe("Project config", &project);
        }
    }

    println!("\nLoading and validating configuration...");
    match Config::load(explicit) {
        Ok(_) => {
            println!("✓ Configuration is valid!");
            Ok(())
        }
        Err(e) => {
            println!("✗ Configuration is invalid!");
            println!("  Error: {}", e);
            Err(e)
        }
    }
}

fn describe(label: &str, path: &Path) {
    if path.exists() {
        println!("  {}: {}", label, path.display());
    } else {
        println!("  {}: {} - not found (optional)", label, path.display());
    }
}

pub fn show(config: &Config) -> Result<()> {
    println!("Effective Configuration:");
    println!("(CLI > Environment > Project config > Global config > Defaults)\n");

    for line in render(config) {
        println!("{}", line);
    }

    Ok(())
}

/// Human readable dump of the merged configuration, password masked.
fn render(config: &Config) -> Vec<String> {
    let unset = || "(not set)".to_string();
    let vs = &config.vsphere;
    let mut lines = vec![
        "vSphere:".to_string(),
        format!("  host: {}", vs.host.clone().unwrap_or_else(unset)),
        format!("  user: {}", vs.user.clone().unwrap_or_else(unset)),
        format!(
            "  password: {}",
            if vs.password.is_some() { "********".to_string() } else { unset() }
        ),
        format!(
            "  datacenter: {}",
            vs.datacenter
                .clone()
                .unwrap_or_else(|| "(first datacenter)".to_string())
        ),
        format!("  insecure: {}", vs.insecure),
        format!("  api_release: {}", vs.api_release),
        format!("  timeout: {}s", vs.timeout_secs),
    ];

    let clone = &config.clone;
    lines.push(String::new());
    lines.push("Clone:".to_string());
    lines.push(format!(
        "  timezone: {}",
        clone
            .timezone
            .clone()
            .unwrap_or_else(|| crate::customization::DEFAULT_TIMEZONE.to_string())
    ));
    lines.push(format!("  power_on: {}", clone.power_on));
    lines.push(match config.hostname_timeout() {
        Some(timeout) => format!("  hostname_timeout: {}s", timeout.as_secs()),
        None => "  hostname_timeout: none".to_string(),
    });
    lines.push(format!("  poll_interval: {}s", clone.poll_interval_secs));
    lines.push(match config.ssh_probe_policy().max_wait {
        Some(bound) => format!("  ssh_timeout: {}s", bound.as_secs()),
        None => "  ssh_timeout: none".to_string(),
    });

    let bs = &config.bootstrap;
    lines.push(String::new());
    lines.push("Bootstrap:".to_string());
    lines.push(format!("  command: {}", bs.command));
    lines.push(format!("  distro: {}", bs.distro));
    lines.push(format!("  ssh_user: {}", bs.ssh_user));
    if let Some(version) = &bs.version {
        lines.push(format!("  version: {}", version));
    }
    if let Some(environment) = &bs.environment {
        lines.push(format!("  environment: {}", environment));
    }
    if !bs.run_list.is_empty() {
        lines.push("  run_list:".to_string());
        for item in &bs.run_list {
            lines.push(format!("    - {}", item));
        }
    }

    lines
}
