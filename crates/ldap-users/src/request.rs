//! Logical request and response shapes exchanged with a [`crate::DirectoryConnection`].

use ldap3::Scope;

use crate::state::AttributeOperation;

/// Represents the search scope for LDAP queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    Subtree,
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// A single attribute/value pair of an add request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryAttribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: String,
}

impl DirectoryAttribute {
    /// Creates a new attribute/value pair.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Request to create an entry.
///
/// Multi-valued attributes appear as several pairs sharing the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    /// Distinguished name of the new entry.
    pub dn: String,
    /// Attribute/value pairs in the order they were collected.
    pub attributes: Vec<DirectoryAttribute>,
}

/// Request to remove an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Distinguished name of the entry.
    pub dn: String,
}

/// Request to modify one attribute of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRequest {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Kind of modification.
    pub operation: AttributeOperation,
    /// Attribute to modify.
    pub attribute: String,
    /// Values the modification applies to.
    pub values: Vec<String>,
}

/// Request to search the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Search base.
    pub base_dn: String,
    /// Search scope.
    pub scope: SearchScope,
    /// RFC 4515 filter string.
    pub filter: String,
    /// Attributes to return.
    pub attributes: Vec<String>,
}

/// Any request a [`crate::DirectoryConnection`] accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryRequest {
    /// Create an entry.
    Add(AddRequest),
    /// Remove an entry.
    Delete(DeleteRequest),
    /// Modify an entry.
    Modify(ModifyRequest),
    /// Search entries.
    Search(SearchRequest),
}

impl DirectoryRequest {
    /// Short name of the request kind, for tracing.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Delete(_) => "delete",
            Self::Modify(_) => "modify",
            Self::Search(_) => "search",
        }
    }
}

/// Directory entry returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attributes in the order the connection produced them; values are text.
    pub attributes: Vec<(String, Vec<String>)>,
}

impl LdapEntry {
    /// Creates an entry with no attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute and returns the entry.
    #[must_use]
    pub fn with_attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attributes
            .push((name.into(), values.into_iter().map(Into::into).collect()));
        self
    }
}

/// Successful answer from a [`crate::DirectoryConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryResponse {
    /// Add, delete or modify completed.
    Done,
    /// Entries matched by a search, in server order.
    Entries(Vec<LdapEntry>),
}

/// Builds the equality filter `(&(objectClass=<class>)(<attribute>=<value>))`.
///
/// `value` is escaped; `object_class` and `attribute` are schema names and are used verbatim.
#[must_use]
pub fn user_search_filter(object_class: &str, attribute: &str, value: &str) -> String {
    format!(
        "(&(objectClass={object_class})({attribute}={}))",
        escape_filter_value(value)
    )
}

/// Escapes a value for use inside an RFC 4515 filter.
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
