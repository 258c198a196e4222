//! Directory user management on top of an LDAP connection.
//!
//! [`UserManipulator`] creates, deletes and modifies [`LdapUser`] entries, changes passwords and
//! rebuilds typed users from search results. The directory itself is reached through the
//! [`DirectoryConnection`] port and every outcome is reported through the [`OperationLogger`]
//! port.

#![deny(missing_docs)]

mod connection;
mod logger;
mod manipulator;
mod request;
mod state;
mod user;

#[cfg(test)]
mod test_support;

pub use connection::{DirectoryConnection, Ldap3Connection};
pub use logger::{LogMessage, OperationLogger, TracingLogger};
pub use manipulator::{SearchOutcome, UserManipulator, PASSWORD_ATTRIBUTE};
pub use request::{
    escape_filter_value, user_search_filter, AddRequest, DeleteRequest, DirectoryAttribute,
    DirectoryRequest, DirectoryResponse, LdapEntry, ModifyRequest, SearchRequest, SearchScope,
};
pub use state::{AttributeOperation, OperationResult};
pub use user::{LdapUser, DEFAULT_COMMON_NAME, DEFAULT_SURNAME};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = ldap_core::Result<T>;
