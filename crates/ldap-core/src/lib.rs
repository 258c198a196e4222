//! # ldap-core
//!
//! Shared types for directory user management.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy for directory requests and LDAP result code mapping
//! - [`config`] - Connection configuration for directory clients

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

pub use config::{DirectoryConfig, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_OPERATION_TIMEOUT_SECS};
pub use error::{Error, Result};
