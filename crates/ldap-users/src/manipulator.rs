//! User management operations against a bound directory connection.

use ldap_core::Error;
use tracing::{debug, error};

use crate::connection::DirectoryConnection;
use crate::logger::OperationLogger;
use crate::request::{
    user_search_filter, AddRequest, DeleteRequest, DirectoryAttribute, DirectoryRequest,
    DirectoryResponse, LdapEntry, ModifyRequest, SearchRequest, SearchScope,
};
use crate::state::{AttributeOperation, OperationResult};
use crate::user::{LdapUser, DEFAULT_COMMON_NAME, DEFAULT_SURNAME};
use crate::Result;

/// Attribute holding the user password.
pub const PASSWORD_ATTRIBUTE: &str = "userPassword";

/// Attributes every user search requests.
const REQUIRED_SEARCH_ATTRIBUTES: &[&str] = &["cn", "sn"];

/// Result of [`UserManipulator::search_users`].
///
/// A search that matched nothing reports [`OperationResult::SearchUserError`], exactly like a
/// search that failed. `completed_searches` tells the two apart: it equals the number of match
/// values only when every search ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Outcome kind.
    pub result: OperationResult,
    /// Users rebuilt from the matched entries, grouped by match value in input order.
    pub users: Vec<LdapUser>,
    /// Number of per-value searches that completed before the call returned.
    pub completed_searches: usize,
}

/// Creates, deletes, modifies and searches directory users.
///
/// Every operation performs its round-trips sequentially on the bound connection, logs exactly
/// one record through the [`OperationLogger`] and returns an [`OperationResult`]. Connection
/// errors never escape an operation.
pub struct UserManipulator {
    connection: Option<Box<dyn DirectoryConnection>>,
    logger: Box<dyn OperationLogger>,
}

impl UserManipulator {
    /// Creates a manipulator with no bound connection.
    #[must_use]
    pub fn new(logger: Box<dyn OperationLogger>) -> Self {
        Self {
            connection: None,
            logger,
        }
    }

    /// Creates a manipulator already bound to `connection`.
    #[must_use]
    pub fn with_connection(
        logger: Box<dyn OperationLogger>,
        connection: Box<dyn DirectoryConnection>,
    ) -> Self {
        Self {
            connection: Some(connection),
            logger,
        }
    }

    /// Binds (or rebinds) the connection used by every later operation.
    pub fn set_connection(&mut self, connection: Box<dyn DirectoryConnection>) {
        self.connection = Some(connection);
    }

    /// Returns true once a connection has been bound.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Creates `user` as an entry of `object_class`.
    ///
    /// The add request carries `objectClass`, `cn`, `sn` and one pair per stored attribute
    /// value. The created entry is not read back.
    pub async fn create_user(&mut self, user: &LdapUser, object_class: &str) -> OperationResult {
        debug!(dn = user.dn(), object_class, "creating directory user");
        let request = DirectoryRequest::Add(build_add_request(user, object_class));
        match self.send_expecting_done(request).await {
            Ok(()) => self.report("create user succeeded", OperationResult::Success),
            Err(err) => self.fail(&err, OperationResult::CreateUserError),
        }
    }

    /// Deletes the entry named by `user`.
    ///
    /// `user` is left untouched and no longer refers to a directory entry on success.
    pub async fn delete_user(&mut self, user: &LdapUser) -> OperationResult {
        debug!(dn = user.dn(), "deleting directory user");
        let request = DirectoryRequest::Delete(DeleteRequest {
            dn: user.dn().to_string(),
        });
        match self.send_expecting_done(request).await {
            Ok(()) => self.report("delete user succeeded", OperationResult::Success),
            Err(err) => self.fail(&err, OperationResult::DeleteUserError),
        }
    }

    /// Applies one attribute modification remotely, then mirrors it on `user`.
    ///
    /// `user` changes only when the directory accepted the modification.
    pub async fn modify_user_attribute(
        &mut self,
        operation: AttributeOperation,
        user: &mut LdapUser,
        attribute_name: &str,
        attribute_value: &str,
    ) -> OperationResult {
        debug!(dn = user.dn(), ?operation, attribute = attribute_name, "modifying directory user");
        let request = DirectoryRequest::Modify(ModifyRequest {
            dn: user.dn().to_string(),
            operation,
            attribute: attribute_name.to_string(),
            values: vec![attribute_value.to_string()],
        });
        if let Err(err) = self.send_expecting_done(request).await {
            return self.fail(&err, OperationResult::ModifyUserAttributeError);
        }

        match operation {
            AttributeOperation::Add => user.insert_attribute(attribute_name, attribute_value),
            AttributeOperation::Delete => user.delete_attribute(attribute_name, attribute_value),
            AttributeOperation::Replace => {
                user.overwrite_attribute(attribute_name, attribute_value);
            }
        }
        self.report("modify user attribute succeeded", OperationResult::Success)
    }

    /// Replaces the `userPassword` attribute with `new_password`.
    ///
    /// The value is sent as given; hashing and transport confidentiality are the
    /// responsibility of the directory and the connection. On success the local
    /// `userPassword` attribute is overwritten.
    pub async fn change_user_password(
        &mut self,
        user: &mut LdapUser,
        new_password: &str,
    ) -> OperationResult {
        debug!(dn = user.dn(), "changing directory user password");
        let request = DirectoryRequest::Modify(ModifyRequest {
            dn: user.dn().to_string(),
            operation: AttributeOperation::Replace,
            attribute: PASSWORD_ATTRIBUTE.to_string(),
            values: vec![new_password.to_string()],
        });
        if let Err(err) = self.send_expecting_done(request).await {
            return self.fail(&err, OperationResult::ChangeUserPasswordError);
        }

        user.overwrite_attribute(PASSWORD_ATTRIBUTE, new_password);
        self.report("change password succeeded", OperationResult::Success)
    }

    /// Runs one subtree search per entry of `match_values` and rebuilds the matched users.
    ///
    /// Each search uses `(&(objectClass=<object_class>)(<match_attribute>=<value>))` and
    /// requests `extra_attributes` plus `cn` and `sn`. Any failure aborts the whole call and
    /// discards the users gathered so far. An empty overall result, including the case of no
    /// match values, is reported as [`OperationResult::SearchUserError`].
    pub async fn search_users(
        &mut self,
        base_dn: &str,
        object_class: &str,
        match_attribute: &str,
        extra_attributes: &[&str],
        match_values: &[&str],
    ) -> SearchOutcome {
        let attributes = requested_attributes(extra_attributes);
        let mut completed_searches = 0;
        let searched = self
            .run_searches(
                base_dn,
                object_class,
                match_attribute,
                &attributes,
                match_values,
                &mut completed_searches,
            )
            .await;

        let (result, users) = match searched {
            Err(err) => (
                self.fail(&err, OperationResult::SearchUserError),
                Vec::new(),
            ),
            Ok(users) if users.is_empty() => (
                self.report("search returned no results", OperationResult::SearchUserError),
                users,
            ),
            Ok(users) => (
                self.report(
                    &format!("search succeeded with {} result(s)", users.len()),
                    OperationResult::Success,
                ),
                users,
            ),
        };

        SearchOutcome {
            result,
            users,
            completed_searches,
        }
    }

    async fn run_searches(
        &mut self,
        base_dn: &str,
        object_class: &str,
        match_attribute: &str,
        attributes: &[String],
        match_values: &[&str],
        completed_searches: &mut usize,
    ) -> Result<Vec<LdapUser>> {
        let mut users = Vec::new();
        for value in match_values {
            let filter = user_search_filter(object_class, match_attribute, value);
            debug!(base_dn, %filter, "searching directory users");
            let request = DirectoryRequest::Search(SearchRequest {
                base_dn: base_dn.to_string(),
                scope: SearchScope::Subtree,
                filter,
                attributes: attributes.to_vec(),
            });

            let entries = match self.send(request).await? {
                DirectoryResponse::Entries(entries) => entries,
                DirectoryResponse::Done => {
                    return Err(Error::UnexpectedResponse(
                        "search answered without entries".to_string(),
                    ))
                }
            };
            for entry in entries {
                users.push(user_from_entry(entry)?);
            }
            *completed_searches += 1;
        }
        Ok(users)
    }

    async fn send(&mut self, request: DirectoryRequest) -> Result<DirectoryResponse> {
        let connection = self.connection.as_mut().ok_or(Error::NotBound)?;
        connection.send_request(request).await
    }

    async fn send_expecting_done(&mut self, request: DirectoryRequest) -> Result<()> {
        match self.send(request).await? {
            DirectoryResponse::Done => Ok(()),
            DirectoryResponse::Entries(_) => Err(Error::UnexpectedResponse(
                "update answered with search entries".to_string(),
            )),
        }
    }

    fn fail(&self, err: &Error, result: OperationResult) -> OperationResult {
        if err.should_log() {
            error!(code = err.error_code(), %result, "directory unavailable: {err}");
        }
        self.report(&err.to_string(), result)
    }

    fn report(&self, text: &str, result: OperationResult) -> OperationResult {
        self.logger.write(self.logger.build_log_message(text, result));
        result
    }
}

fn build_add_request(user: &LdapUser, object_class: &str) -> AddRequest {
    let mut attributes = vec![
        DirectoryAttribute::new("objectClass", object_class),
        DirectoryAttribute::new("cn", user.cn()),
        DirectoryAttribute::new("sn", user.sn()),
    ];
    for (name, values) in user.attributes() {
        attributes.extend(
            values
                .iter()
                .map(|value| DirectoryAttribute::new(name, value.as_str())),
        );
    }

    AddRequest {
        dn: user.dn().to_string(),
        attributes,
    }
}

/// Caller attributes followed by whichever of `cn`/`sn` they did not already name.
fn requested_attributes(extra_attributes: &[&str]) -> Vec<String> {
    let mut attributes: Vec<String> = extra_attributes.iter().map(ToString::to_string).collect();
    for required in REQUIRED_SEARCH_ATTRIBUTES {
        if !attributes
            .iter()
            .any(|attribute| attribute.eq_ignore_ascii_case(required))
        {
            attributes.push((*required).to_string());
        }
    }
    attributes
}

/// Rebuilds a user from a search entry.
///
/// `cn`/`sn` are matched case-insensitively and only their first value is kept; missing ones
/// fall back to the placeholder defaults. Every other attribute goes to the attribute store,
/// except attributes returned without values: the store never holds an empty value list, so
/// they are dropped.
fn user_from_entry(entry: LdapEntry) -> Result<LdapUser> {
    let mut cn = None;
    let mut sn = None;
    let mut others = Vec::new();
    for (name, values) in entry.attributes {
        if name.eq_ignore_ascii_case("cn") {
            cn = cn.or_else(|| values.into_iter().next());
        } else if name.eq_ignore_ascii_case("sn") {
            sn = sn.or_else(|| values.into_iter().next());
        } else {
            others.push((name, values));
        }
    }

    let mut user = LdapUser::new(
        entry.dn,
        cn.unwrap_or_else(|| DEFAULT_COMMON_NAME.to_string()),
        sn.unwrap_or_else(|| DEFAULT_SURNAME.to_string()),
    )
    .map_err(|_| Error::InvalidEntry("search entry has an empty distinguished name".to_string()))?;
    for (name, values) in others {
        for value in values {
            user.insert_attribute(name.as_str(), value);
        }
    }
    Ok(user)
}
