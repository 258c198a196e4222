//! Integration tests driving `UserManipulator` against an in-memory directory.
//!
//! The directory understands exactly the request shapes the manipulator produces, which lets
//! these tests follow a user from creation through modification and search.

use async_trait::async_trait;
use ldap_core::Error;
use ldap_users::{
    AttributeOperation, DirectoryConnection, DirectoryRequest, DirectoryResponse, LdapEntry,
    LdapUser, OperationResult, TracingLogger, UserManipulator, DEFAULT_SURNAME,
    PASSWORD_ATTRIBUTE,
};
use std::sync::{Arc, Mutex};

type Entries = Arc<Mutex<Vec<LdapEntry>>>;

/// Minimal directory keyed by DN that evaluates `(&(objectClass=..)(attr=value))` filters.
#[derive(Clone, Default)]
struct InMemoryDirectory {
    entries: Entries,
}

impl InMemoryDirectory {
    fn entry(&self, dn: &str) -> Option<LdapEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|entry| entry.dn == dn)
            .cloned()
    }
}

fn values_mut<'a>(entry: &'a mut LdapEntry, name: &str) -> &'a mut Vec<String> {
    let index = match entry.attributes.iter().position(|(key, _)| key == name) {
        Some(index) => index,
        None => {
            entry.attributes.push((name.to_string(), Vec::new()));
            entry.attributes.len() - 1
        }
    };
    &mut entry.attributes[index].1
}

fn has_value(entry: &LdapEntry, name: &str, value: &str) -> bool {
    entry
        .attributes
        .iter()
        .any(|(key, values)| key.eq_ignore_ascii_case(name) && values.iter().any(|v| v == value))
}

/// Splits `(&(objectClass=person)(uid=alice))` into `[("objectClass", "person"), ("uid", "alice")]`.
fn parse_filter(filter: &str) -> Vec<(String, String)> {
    filter
        .trim_start_matches("(&")
        .trim_end_matches(')')
        .split(')')
        .filter_map(|part| part.strip_prefix('('))
        .filter_map(|part| part.split_once('='))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

#[async_trait]
impl DirectoryConnection for InMemoryDirectory {
    async fn send_request(
        &mut self,
        request: DirectoryRequest,
    ) -> ldap_core::Result<DirectoryResponse> {
        let mut entries = self.entries.lock().unwrap();
        match request {
            DirectoryRequest::Add(add) => {
                if entries.iter().any(|entry| entry.dn == add.dn) {
                    return Err(Error::AlreadyExists(add.dn));
                }
                let mut entry = LdapEntry::new(add.dn);
                for attribute in add.attributes {
                    values_mut(&mut entry, &attribute.name).push(attribute.value);
                }
                entries.push(entry);
                Ok(DirectoryResponse::Done)
            }
            DirectoryRequest::Delete(delete) => {
                let before = entries.len();
                entries.retain(|entry| entry.dn != delete.dn);
                if entries.len() == before {
                    return Err(Error::NoSuchObject(delete.dn));
                }
                Ok(DirectoryResponse::Done)
            }
            DirectoryRequest::Modify(modify) => {
                let entry = entries
                    .iter_mut()
                    .find(|entry| entry.dn == modify.dn)
                    .ok_or_else(|| Error::NoSuchObject(modify.dn.clone()))?;
                let values = values_mut(entry, &modify.attribute);
                match modify.operation {
                    AttributeOperation::Add => values.extend(modify.values),
                    AttributeOperation::Delete => {
                        values.retain(|value| !modify.values.contains(value));
                    }
                    AttributeOperation::Replace => *values = modify.values,
                }
                entry.attributes.retain(|(_, values)| !values.is_empty());
                Ok(DirectoryResponse::Done)
            }
            DirectoryRequest::Search(search) => {
                let conditions = parse_filter(&search.filter);
                let matched = entries
                    .iter()
                    .filter(|entry| entry.dn.ends_with(&search.base_dn))
                    .filter(|entry| {
                        conditions
                            .iter()
                            .all(|(name, value)| has_value(entry, name, value))
                    })
                    .map(|entry| LdapEntry {
                        dn: entry.dn.clone(),
                        attributes: entry
                            .attributes
                            .iter()
                            .filter(|(name, _)| {
                                search
                                    .attributes
                                    .iter()
                                    .any(|wanted| wanted.eq_ignore_ascii_case(name))
                            })
                            .cloned()
                            .collect(),
                    })
                    .collect();
                Ok(DirectoryResponse::Entries(matched))
            }
        }
    }
}

const PEOPLE: &str = "ou=people,dc=example,dc=com";

fn manipulator(directory: &InMemoryDirectory) -> UserManipulator {
    UserManipulator::with_connection(Box::new(TracingLogger), Box::new(directory.clone()))
}

fn jdoe() -> LdapUser {
    LdapUser::new("cn=jdoe,ou=people,dc=example,dc=com", "jdoe", "Doe")
        .unwrap()
        .with_attribute("uid", "jdoe")
        .with_attribute("mail", "jdoe@example.com")
}

#[tokio::test]
async fn created_user_is_found_by_search() {
    let directory = InMemoryDirectory::default();
    let mut manipulator = manipulator(&directory);

    assert_eq!(
        manipulator.create_user(&jdoe(), "inetOrgPerson").await,
        OperationResult::Success
    );
    let stored = directory.entry(jdoe().dn()).unwrap();
    assert_eq!(stored.attributes.len(), 5);

    let outcome = manipulator
        .search_users(PEOPLE, "inetOrgPerson", "uid", &["mail"], &["jdoe"])
        .await;
    assert_eq!(outcome.result, OperationResult::Success);
    assert_eq!(outcome.users.len(), 1);

    let found = &outcome.users[0];
    assert_eq!(found.dn(), jdoe().dn());
    assert_eq!(found.cn(), "jdoe");
    assert_eq!(found.sn(), "Doe");
    assert_eq!(found.attribute("mail"), &["jdoe@example.com".to_string()]);
    assert!(found.attribute("uid").is_empty());
}

#[tokio::test]
async fn duplicate_create_is_reported() {
    let directory = InMemoryDirectory::default();
    let mut manipulator = manipulator(&directory);

    assert!(manipulator.create_user(&jdoe(), "person").await.is_success());
    assert_eq!(
        manipulator.create_user(&jdoe(), "person").await,
        OperationResult::CreateUserError
    );
}

#[tokio::test]
async fn modifications_track_directory_state() {
    let directory = InMemoryDirectory::default();
    let mut manipulator = manipulator(&directory);
    let mut user = jdoe();
    assert!(manipulator.create_user(&user, "person").await.is_success());

    assert!(manipulator
        .modify_user_attribute(AttributeOperation::Add, &mut user, "mail", "john@example.com")
        .await
        .is_success());
    assert!(manipulator
        .modify_user_attribute(
            AttributeOperation::Replace,
            &mut user,
            "telephoneNumber",
            "+1-555-0100",
        )
        .await
        .is_success());
    assert!(manipulator
        .modify_user_attribute(AttributeOperation::Delete, &mut user, "sn", "Doe")
        .await
        .is_success());

    assert_eq!(
        user.attribute("mail"),
        &["jdoe@example.com".to_string(), "john@example.com".to_string()]
    );
    assert_eq!(user.sn(), DEFAULT_SURNAME);

    let outcome = manipulator
        .search_users(
            PEOPLE,
            "person",
            "uid",
            &["mail", "telephoneNumber"],
            &["jdoe"],
        )
        .await;
    let found = &outcome.users[0];
    assert_eq!(found.attribute("mail"), user.attribute("mail"));
    assert_eq!(
        found.attribute("telephoneNumber"),
        user.attribute("telephoneNumber")
    );
    assert_eq!(found.sn(), DEFAULT_SURNAME);
}

#[tokio::test]
async fn modifying_missing_user_leaves_it_unchanged() {
    let directory = InMemoryDirectory::default();
    let mut manipulator = manipulator(&directory);
    let mut user = jdoe();

    let result = manipulator
        .modify_user_attribute(AttributeOperation::Replace, &mut user, "mail", "x@example.com")
        .await;
    assert_eq!(result, OperationResult::ModifyUserAttributeError);
    assert_eq!(user, jdoe());
}

#[tokio::test]
async fn password_change_is_stored_remotely_and_locally() {
    let directory = InMemoryDirectory::default();
    let mut manipulator = manipulator(&directory);
    let mut user = jdoe();
    assert!(manipulator.create_user(&user, "person").await.is_success());

    assert_eq!(
        manipulator.change_user_password(&mut user, "NewPass123").await,
        OperationResult::Success
    );
    assert_eq!(
        user.attribute(PASSWORD_ATTRIBUTE),
        &["NewPass123".to_string()]
    );

    let stored = directory.entry(user.dn()).unwrap();
    assert!(has_value(&stored, PASSWORD_ATTRIBUTE, "NewPass123"));
}

#[tokio::test]
async fn multi_value_search_groups_results_by_input() {
    let directory = InMemoryDirectory::default();
    let mut manipulator = manipulator(&directory);
    for (login, surname) in [("alice", "Liddell"), ("bob", "Builder")] {
        let user = LdapUser::new(format!("uid={login},{PEOPLE}"), login, surname)
            .unwrap()
            .with_attribute("uid", login);
        assert!(manipulator.create_user(&user, "person").await.is_success());
    }

    let outcome = manipulator
        .search_users(PEOPLE, "person", "uid", &[], &["bob", "nobody", "alice"])
        .await;
    assert_eq!(outcome.result, OperationResult::Success);
    assert_eq!(outcome.completed_searches, 3);
    let names: Vec<&str> = outcome.users.iter().map(LdapUser::cn).collect();
    assert_eq!(names, vec!["bob", "alice"]);

    let none = manipulator
        .search_users(PEOPLE, "person", "uid", &[], &["nobody"])
        .await;
    assert_eq!(none.result, OperationResult::SearchUserError);
    assert!(none.users.is_empty());
    assert_eq!(none.completed_searches, 1);
}

#[tokio::test]
async fn deleted_user_is_no_longer_found() {
    let directory = InMemoryDirectory::default();
    let mut manipulator = manipulator(&directory);
    let user = jdoe();
    assert!(manipulator.create_user(&user, "person").await.is_success());

    assert_eq!(manipulator.delete_user(&user).await, OperationResult::Success);
    assert!(directory.entry(user.dn()).is_none());
    assert_eq!(
        manipulator.delete_user(&user).await,
        OperationResult::DeleteUserError
    );

    let outcome = manipulator
        .search_users(PEOPLE, "person", "uid", &[], &["jdoe"])
        .await;
    assert_eq!(outcome.result, OperationResult::SearchUserError);
}
