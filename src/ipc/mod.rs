//! IPC server for browsing clients

pub mod protocol;
pub mod server;

pub use server::{IpcServer, Shared};
