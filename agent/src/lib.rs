//! Deploy Agent Library
//!
//! Clones a git repository, builds a container image from it and replaces
//! the running container of the same name. Triggered over HTTP or once from
//! the command line.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod utils;
