use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read user file: {0}")]
    Io(#[from] std::io::Error),
    #[error("user file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("user entry {index} is invalid: {reason}")]
    InvalidRecord { index: usize, reason: &'static str },
}

/// One entry of the bootstrap user file.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub email_addr: String,
    pub pwd_hash: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct UserFile {
    users: Vec<UserRecord>,
}

/// Identity probes every authenticated caller exposes.
pub trait Principal {
    fn id(&self) -> u32;
    fn is_active(&self) -> bool;
    fn is_authenticated(&self) -> bool;
}

/// One account. Immutable after load except for the transient
/// `authenticated` flag, which is process-local session state.
#[derive(Debug)]
pub struct User {
    id: u32,
    email: String,
    password_hash: String,
    active: bool,
    authenticated: AtomicBool,
}

impl User {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::Relaxed);
    }

    // Role support is a deliberate stub: every account has the empty set.
    pub fn roles(&self) -> HashSet<String> {
        HashSet::new()
    }
}

impl Principal for User {
    fn id(&self) -> u32 {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Relaxed)
    }
}

/// The set of accounts this process serves. Built once at startup and
/// read-only afterwards; loading twice is not supported.
#[derive(Debug)]
pub struct Directory {
    users: Vec<User>,
}

impl Directory {
    /// Reads the bootstrap user file: `{"users": [{"email_addr", "pwd_hash"}]}`.
    /// Any invalid entry fails the whole load; there is no partial directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let raw = fs::read_to_string(path)?;
        let file: UserFile = serde_json::from_str(&raw)?;
        let directory = Self::from_records(file.users)?;
        info!(users = directory.users.len(), "user directory loaded");
        Ok(directory)
    }

    /// Identifiers are assigned in record order, starting at 1. Duplicate
    /// email addresses are accepted; lookups return the first match and which
    /// record that is for a duplicate is unspecified.
    pub fn from_records(records: Vec<UserRecord>) -> Result<Self, LoadError> {
        let mut users = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            if record.email_addr.is_empty() {
                return Err(LoadError::InvalidRecord {
                    index,
                    reason: "email_addr is empty",
                });
            }
            if record.pwd_hash.is_empty() {
                return Err(LoadError::InvalidRecord {
                    index,
                    reason: "pwd_hash is empty",
                });
            }
            users.push(User {
                id: index as u32 + 1,
                email: record.email_addr,
                password_hash: record.pwd_hash,
                active: record.active,
                authenticated: AtomicBool::new(false),
            });
        }
        Ok(Self { users })
    }

    /// First match by exact, case-sensitive equality.
    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|user| user.email == email)
    }

    pub fn find_by_id(&self, id: u32) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str, hash: &str) -> UserRecord {
        UserRecord {
            email_addr: email.to_string(),
            pwd_hash: hash.to_string(),
            active: true,
        }
    }

    #[test]
    fn assigns_sequential_ids_starting_at_one() {
        let directory = Directory::from_records(vec![
            record("alice@example.com", "$hash-a"),
            record("bob@example.com", "$hash-b"),
        ])
        .expect("load");
        assert_eq!(directory.find_by_email("alice@example.com").unwrap().id(), 1);
        assert_eq!(directory.find_by_email("bob@example.com").unwrap().id(), 2);
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let directory =
            Directory::from_records(vec![record("Alice@example.com", "$hash")]).expect("load");
        assert!(directory.find_by_email("Alice@example.com").is_some());
        assert!(directory.find_by_email("alice@example.com").is_none());
        assert!(directory.find_by_email("Alice@example.com ").is_none());
    }

    #[test]
    fn find_by_id_returns_the_matching_record() {
        let directory = Directory::from_records(vec![
            record("alice@example.com", "$hash-a"),
            record("bob@example.com", "$hash-b"),
        ])
        .expect("load");
        assert_eq!(directory.find_by_id(2).unwrap().email(), "bob@example.com");
        assert!(directory.find_by_id(3).is_none());
    }

    #[test]
    fn duplicate_emails_resolve_to_the_first_match() {
        let directory = Directory::from_records(vec![
            record("dup@example.com", "$hash-first"),
            record("dup@example.com", "$hash-second"),
        ])
        .expect("load");
        let user = directory.find_by_email("dup@example.com").unwrap();
        assert_eq!(user.password_hash(), "$hash-first");
    }

    #[test]
    fn empty_fields_fail_the_whole_load() {
        let err = Directory::from_records(vec![
            record("alice@example.com", "$hash"),
            record("bob@example.com", ""),
        ])
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidRecord { index: 1, .. }));

        let err = Directory::from_records(vec![record("", "$hash")]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRecord { index: 0, .. }));
    }

    #[test]
    fn missing_field_is_a_malformed_file() {
        let raw = r#"{"users": [{"email_addr": "alice@example.com"}]}"#;
        let err = serde_json::from_str::<UserFile>(raw).unwrap_err();
        assert!(err.to_string().contains("pwd_hash"));
    }

    #[test]
    fn authenticated_flag_is_transient_and_settable() {
        let directory =
            Directory::from_records(vec![record("alice@example.com", "$hash")]).expect("load");
        let user = directory.find_by_email("alice@example.com").unwrap();
        assert!(!user.is_authenticated());
        user.set_authenticated(true);
        assert!(user.is_authenticated());
        assert!(user.is_active());
        assert!(user.roles().is_empty());
    }
}
