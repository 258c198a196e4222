//! Directory user representation.

use ldap_core::Error;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Common name assigned when a fetched entry carries no `cn`.
pub const DEFAULT_COMMON_NAME: &str = "Default CommonName";
/// Surname assigned when a fetched entry carries no `sn`.
pub const DEFAULT_SURNAME: &str = "Default Surname";

/// In-memory view of a directory user.
///
/// `cn` and `sn` live in dedicated fields and never appear in the attribute store; every other
/// attribute is kept in insertion order with its values in the order they were added. Attribute
/// names in the store are compared case-sensitively.
///
/// Deserialized users go through the same checks as [`LdapUser::new`] and
/// [`LdapUser::insert_attribute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLdapUser")]
pub struct LdapUser {
    dn: String,
    cn: String,
    sn: String,
    attributes: Vec<(String, Vec<String>)>,
}

/// Unchecked wire form of [`LdapUser`].
#[derive(Deserialize)]
struct RawLdapUser {
    dn: String,
    cn: String,
    sn: String,
    #[serde(default)]
    attributes: Vec<(String, Vec<String>)>,
}

impl TryFrom<RawLdapUser> for LdapUser {
    type Error = Error;

    fn try_from(raw: RawLdapUser) -> Result<Self> {
        let mut user = Self::new(raw.dn, raw.cn, raw.sn)?;
        for (name, values) in raw.attributes {
            if values.is_empty() {
                return Err(Error::InvalidRequest(format!(
                    "attribute {name} has no values"
                )));
            }
            for value in values {
                user.insert_attribute(name.as_str(), value);
            }
        }
        Ok(user)
    }
}

impl LdapUser {
    /// Creates a user with no additional attributes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `dn` is empty or blank.
    pub fn new(
        dn: impl Into<String>,
        cn: impl Into<String>,
        sn: impl Into<String>,
    ) -> Result<Self> {
        let dn = dn.into();
        if dn.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "user distinguished name cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            dn,
            cn: cn.into(),
            sn: sn.into(),
            attributes: Vec::new(),
        })
    }

    /// Appends a value and returns the user, for building fixtures and create targets.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_attribute(name, value);
        self
    }

    /// Distinguished name of the entry.
    #[must_use]
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Common name.
    #[must_use]
    pub fn cn(&self) -> &str {
        &self.cn
    }

    /// Surname.
    #[must_use]
    pub fn sn(&self) -> &str {
        &self.sn
    }

    /// Attribute names in insertion order.
    #[must_use]
    pub fn attribute_keys(&self) -> Vec<&str> {
        self.attributes.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Values of `name`, or an empty slice when the attribute is absent.
    #[must_use]
    pub fn attribute(&self, name: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Iterates over every stored attribute and its values.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.attributes
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Appends `value` to `name`, creating the attribute if needed.
    ///
    /// For `cn`/`sn` the scalar field takes the value. A directory keeps the earlier value too,
    /// and a later search rebuilds the scalar from the first value it returns, so mirroring an
    /// `Add` on a reserved name only matches the directory when the attribute was empty.
    pub fn insert_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some((field, _)) = self.reserved_field(&name) {
            *field = value;
            return;
        }

        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, values)) => values.push(value),
            None => self.attributes.push((name, vec![value])),
        }
    }

    /// Removes every occurrence of `value` from `name`.
    ///
    /// An attribute whose last value is removed is dropped from the store entirely, so
    /// [`LdapUser::attribute_keys`] no longer lists it. For `cn`/`sn`, deleting the current value
    /// resets the field to its placeholder default.
    pub fn delete_attribute(&mut self, name: &str, value: &str) {
        if let Some((field, default)) = self.reserved_field(name) {
            if field.as_str() == value {
                *field = default.to_string();
            }
            return;
        }

        if let Some(index) = self.attributes.iter().position(|(key, _)| key == name) {
            let values = &mut self.attributes[index].1;
            values.retain(|existing| existing != value);
            if values.is_empty() {
                self.attributes.remove(index);
            }
        }
    }

    /// Replaces all values of `name` with the single `value`.
    ///
    /// For `cn`/`sn` the scalar field is updated instead of the attribute store.
    pub fn overwrite_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some((field, _)) = self.reserved_field(&name) {
            *field = value;
            return;
        }

        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, values)) => *values = vec![value],
            None => self.attributes.push((name, vec![value])),
        }
    }

    /// Maps the reserved names `cn` and `sn` (any case) to their scalar field and default.
    ///
    /// This is the only place where the reserved names are special-cased.
    fn reserved_field(&mut self, name: &str) -> Option<(&mut String, &'static str)> {
        if name.eq_ignore_ascii_case("cn") {
            Some((&mut self.cn, DEFAULT_COMMON_NAME))
        } else if name.eq_ignore_ascii_case("sn") {
            Some((&mut self.sn, DEFAULT_SURNAME))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> LdapUser {
        LdapUser::new("cn=jdoe,ou=people,dc=example,dc=com", "jdoe", "Doe").unwrap()
    }

    #[test]
    fn rejects_blank_dn() {
        let err = LdapUser::new("  ", "jdoe", "Doe").unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn missing_attribute_is_empty() {
        let user = sample_user();
        assert!(user.attribute("mail").is_empty());
        assert!(user.attribute_keys().is_empty());
    }

    #[test]
    fn insert_appends_and_keeps_insertion_order() {
        let mut user = sample_user();
        user.insert_attribute("mail", "jdoe@example.com");
        user.insert_attribute("telephoneNumber", "+1-555-0100");
        user.insert_attribute("mail", "john@example.com");

        assert_eq!(user.attribute_keys(), vec!["mail", "telephoneNumber"]);
        assert_eq!(
            user.attribute("mail"),
            &["jdoe@example.com".to_string(), "john@example.com".to_string()]
        );
    }

    #[test]
    fn keys_are_case_sensitive() {
        let user = sample_user().with_attribute("mail", "jdoe@example.com");
        assert!(user.attribute("Mail").is_empty());
    }

    #[test]
    fn insert_then_delete_restores_prior_state() {
        let mut user = sample_user();
        let before = user.clone();
        user.insert_attribute("description", "temp");
        user.delete_attribute("description", "temp");

        assert_eq!(user, before);
        assert!(!user.attribute_keys().contains(&"description"));
    }

    #[test]
    fn delete_keeps_remaining_values() {
        let mut user = sample_user()
            .with_attribute("mail", "a@example.com")
            .with_attribute("mail", "b@example.com");
        user.delete_attribute("mail", "a@example.com");
        assert_eq!(user.attribute("mail"), &["b@example.com".to_string()]);
    }

    #[test]
    fn delete_of_unknown_value_is_noop() {
        let mut user = sample_user().with_attribute("mail", "a@example.com");
        let before = user.clone();
        user.delete_attribute("mail", "missing@example.com");
        user.delete_attribute("telephoneNumber", "1");
        assert_eq!(user, before);
    }

    #[test]
    fn overwrite_replaces_all_values() {
        let mut user = sample_user()
            .with_attribute("mail", "a@example.com")
            .with_attribute("mail", "b@example.com");
        user.overwrite_attribute("mail", "c@example.com");
        assert_eq!(user.attribute("mail"), &["c@example.com".to_string()]);

        user.overwrite_attribute("userPassword", "secret");
        assert_eq!(user.attribute("userPassword"), &["secret".to_string()]);
    }

    #[test]
    fn reserved_names_update_scalar_fields() {
        let mut user = sample_user();
        user.overwrite_attribute("cn", "John Doe");
        user.overwrite_attribute("SN", "Doe-Smith");
        assert_eq!(user.cn(), "John Doe");
        assert_eq!(user.sn(), "Doe-Smith");

        user.insert_attribute("CN", "Johnny");
        assert_eq!(user.cn(), "Johnny");
        assert!(user.attribute_keys().is_empty());
    }

    #[test]
    fn deleting_reserved_value_resets_default() {
        let mut user = sample_user();
        user.delete_attribute("sn", "Other");
        assert_eq!(user.sn(), "Doe");

        user.delete_attribute("sn", "Doe");
        assert_eq!(user.sn(), DEFAULT_SURNAME);
        user.delete_attribute("cn", "jdoe");
        assert_eq!(user.cn(), DEFAULT_COMMON_NAME);
    }

    #[test]
    fn deserialize_rejects_blank_dn() {
        let json = r#"{"dn":"","cn":"x","sn":"y","attributes":[]}"#;
        assert!(serde_json::from_str::<LdapUser>(json).is_err());
    }

    #[test]
    fn deserialize_moves_reserved_names_to_scalar_fields() {
        let json = r#"{
            "dn": "cn=jdoe,ou=people,dc=example,dc=com",
            "cn": "jdoe",
            "sn": "Doe",
            "attributes": [["cn", ["shadow"]], ["mail", ["a@example.com", "b@example.com"]]]
        }"#;
        let user: LdapUser = serde_json::from_str(json).unwrap();

        assert_eq!(user.cn(), "shadow");
        assert_eq!(user.attribute_keys(), vec!["mail"]);
        assert_eq!(user.attribute("mail").len(), 2);
    }

    #[test]
    fn deserialize_rejects_empty_value_list() {
        let json = r#"{"dn":"cn=jdoe,dc=example,dc=com","cn":"jdoe","sn":"Doe","attributes":[["mail",[]]]}"#;
        assert!(serde_json::from_str::<LdapUser>(json).is_err());
    }

    #[test]
    fn serialized_user_deserializes_unchanged() {
        let user = sample_user()
            .with_attribute("mail", "jdoe@example.com")
            .with_attribute("uid", "jdoe");
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(serde_json::from_str::<LdapUser>(&json).unwrap(), user);
    }
}
