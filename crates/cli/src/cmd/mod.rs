//! CLI command implementations

pub mod config;
pub mod pins;
pub mod tree;
