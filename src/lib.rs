//! Library crate for schema-scan-rs exposing reusable modules.
pub mod config;
pub mod directory;
pub mod endpoints;
pub mod error;
pub mod inspector;
pub mod scanner;
pub mod server;
pub mod types;
