// Compile-time constants from Cargo.toml and build.rs
pub const VERSION: &str = env!("PCC_VM_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Version without the `-dev+hash` suffix added to debug builds.
pub fn base_version() -> &'static str {
    VERSION.split('-').next().unwrap_or(VERSION)
}

pub fn is_dev_build() -> bool {
    VERSION.contains("-dev")
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(PKG_NAME, "pcc-vm");
    }

    #[test]
    fn test_version_format() {
        // Examples: "0.3.0" or "0.3.0-dev+a1b2c3d4" or "0.3.0-dev+a1b2c3d4.dirty"
        assert!(
            VERSION.chars().next().unwrap().is_numeric(),
            "Version should start with a number"
        );
        if is_dev_build() {
            assert!(VERSION.starts_with(base_version()));
        } else {
            assert_eq!(base_version(), VERSION);
        }
    }

    #[test]
    fn test_base_version_is_valid_semver() {
        assert!(
            Version::parse(base_version()).is_ok(),
            "Base version should be valid semver: {}",
            base_version()
        );
        assert_eq!(base_version(), env!("CARGO_PKG_VERSION"));
    }
}
