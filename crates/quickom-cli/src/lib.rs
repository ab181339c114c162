//! Command-line front end for the Quickom sync workspace.
//!
//! This crate provides the `quickom` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
