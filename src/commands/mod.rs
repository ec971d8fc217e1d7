pub mod config;
pub mod helpers;
pub mod template;
pub mod version;
pub mod vm;
