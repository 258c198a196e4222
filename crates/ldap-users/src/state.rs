//! Operation outcome and attribute modification kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of outcomes returned by every [`crate::UserManipulator`] operation.
///
/// Failure kinds carry no detail; the reason is only reported through the
/// [`crate::OperationLogger`].
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationResult {
    /// The operation completed.
    Success,
    /// Creating a user failed.
    CreateUserError,
    /// Deleting a user failed.
    DeleteUserError,
    /// Modifying a user attribute failed.
    ModifyUserAttributeError,
    /// Changing a user password failed.
    ChangeUserPasswordError,
    /// Searching failed or matched nothing.
    SearchUserError,
}

impl OperationResult {
    /// Returns true for [`OperationResult::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Stable code used in log output.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::CreateUserError => "CREATE_USER_ERROR",
            Self::DeleteUserError => "DELETE_USER_ERROR",
            Self::ModifyUserAttributeError => "MODIFY_USER_ATTRIBUTE_ERROR",
            Self::ChangeUserPasswordError => "CHANGE_USER_PASSWORD_ERROR",
            Self::SearchUserError => "SEARCH_USER_ERROR",
        }
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Directory modification applied to a single attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeOperation {
    /// Add values to the attribute.
    Add,
    /// Remove values from the attribute.
    Delete,
    /// Replace all values of the attribute.
    Replace,
}
