//! Curator daemon library - exposes modules for testing.

pub mod catalog;
pub mod engine;
pub mod rpc_server;
pub mod store;
