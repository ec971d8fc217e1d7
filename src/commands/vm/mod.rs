pub mod clone;
pub mod delete;
pub mod list;
