//! Side-effecting collaborators: run storage, resources, config, and the model provider.

pub mod brief;
pub mod config;
pub mod init;
pub mod process;
pub mod provider;
pub mod resources;
pub mod run_store;
