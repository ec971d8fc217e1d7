#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod cli;
pub mod commands;
pub mod config;
pub mod customization;
pub mod error;
pub mod logging;
pub mod probe;
pub mod version;
pub mod vsphere;
