use keyring::Entry;
use tracing::{debug, warn};

use crate::error::KeystoreError;

pub const SERVICE: &str = "kube-infisical";
pub const CLIENT_ID_KEY: &str = "client_id";
pub const CLIENT_SECRET_KEY: &str = "client_secret";

// `get` yields `Ok(None)` for a missing entry; deleting a missing entry succeeds.
pub trait CredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeystoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), KeystoreError>;
    fn delete(&self, key: &str) -> Result<(), KeystoreError>;
}

pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, KeystoreError> {
        Entry::new(&self.service, key).map_err(|e| KeystoreError::Unavailable(e.to_string()))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeystoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => {
                debug!("keystore hit for {}/{key}", self.service);
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("keystore miss for {}/{key}", self.service);
                Ok(None)
            }
            Err(e) => Err(KeystoreError::Access {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), KeystoreError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| KeystoreError::Access {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    fn delete(&self, key: &str) -> Result<(), KeystoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeystoreError::Access {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// Writes both halves or neither: when the secret cannot be stored the id is
/// removed again.
pub fn store_pair(
    store: &dyn CredentialStore,
    client_id: &str,
    client_secret: &str,
) -> Result<(), KeystoreError> {
    store.put(CLIENT_ID_KEY, client_id)?;
    if let Err(error) = store.put(CLIENT_SECRET_KEY, client_secret) {
        if let Err(rollback) = store.delete(CLIENT_ID_KEY) {
            warn!("failed to roll back {CLIENT_ID_KEY} after partial write: {rollback}");
        }
        return Err(error);
    }
    Ok(())
}

pub fn clear_pair(store: &dyn CredentialStore) -> Result<(), KeystoreError> {
    let id = store.delete(CLIENT_ID_KEY);
    let secret = store.delete(CLIENT_SECRET_KEY);
    id.and(secret)
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    pub struct MemoryStore {
        entries: RefCell<HashMap<String, String>>,
        failing_puts: RefCell<HashSet<String>>,
        failing_gets: RefCell<HashSet<String>>,
        failing_deletes: RefCell<HashSet<String>>,
    }

    impl MemoryStore {
        pub fn with_pair(client_id: &str, client_secret: &str) -> Self {
            let store = Self::default();
            store.insert(CLIENT_ID_KEY, client_id);
            store.insert(CLIENT_SECRET_KEY, client_secret);
            store
        }

        pub fn insert(&self, key: &str, value: &str) {
            self.entries
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
        }

        pub fn value(&self, key: &str) -> Option<String> {
            self.entries.borrow().get(key).cloned()
        }

        pub fn is_empty(&self) -> bool {
            self.entries.borrow().is_empty()
        }

        pub fn fail_put(&self, key: &str) {
            self.failing_puts.borrow_mut().insert(key.to_string());
        }

        pub fn fail_get(&self, key: &str) {
            self.failing_gets.borrow_mut().insert(key.to_string());
        }

        pub fn fail_delete(&self, key: &str) {
            self.failing_deletes.borrow_mut().insert(key.to_string());
        }
    }

    impl CredentialStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>, KeystoreError> {
            if self.failing_gets.borrow().contains(key) {
                return Err(KeystoreError::Access {
                    key: key.to_string(),
                    message: "locked".to_string(),
                });
            }
            Ok(self.value(key))
        }

        fn put(&self, key: &str, value: &str) -> Result<(), KeystoreError> {
            if self.failing_puts.borrow().contains(key) {
                return Err(KeystoreError::Access {
                    key: key.to_string(),
                    message: "read-only".to_string(),
                });
            }
            self.insert(key, value);
            Ok(())
        }

        fn delete(&self, key: &str) -> Result<(), KeystoreError> {
            if self.failing_deletes.borrow().contains(key) {
                return Err(KeystoreError::Access {
                    key: key.to_string(),
                    message: "locked".to_string(),
                });
            }
            self.entries.borrow_mut().remove(key);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[test]
    fn store_pair_writes_both_entries() {
        let store = MemoryStore::default();
        store_pair(&store, "id", "secret").unwrap();
        assert_eq!(store.value(CLIENT_ID_KEY).as_deref(), Some("id"));
        assert_eq!(store.value(CLIENT_SECRET_KEY).as_deref(), Some("secret"));
    }

    #[test]
    fn failed_secret_write_rolls_back_id() {
        let store = MemoryStore::default();
        store.fail_put(CLIENT_SECRET_KEY);
        assert!(store_pair(&store, "id", "secret").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn failed_rollback_still_reports_the_write_error() {
        let store = MemoryStore::default();
        store.fail_put(CLIENT_SECRET_KEY);
        store.fail_delete(CLIENT_ID_KEY);
        let err = store_pair(&store, "id", "secret").unwrap_err();
        assert!(matches!(err, KeystoreError::Access { ref key, .. } if key == CLIENT_SECRET_KEY));
    }

    #[test]
    fn clearing_missing_entries_is_quiet() {
        let store = MemoryStore::default();
        clear_pair(&store).unwrap();
        assert!(store.is_empty());

        let store = MemoryStore::with_pair("a", "b");
        clear_pair(&store).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn partial_clear_tries_both_and_reports() {
        let store = MemoryStore::with_pair("a", "b");
        store.fail_delete(CLIENT_SECRET_KEY);
        let err = clear_pair(&store).unwrap_err();
        assert!(matches!(err, KeystoreError::Access { ref key, .. } if key == CLIENT_SECRET_KEY));
        assert_eq!(store.value(CLIENT_ID_KEY), None);
        assert_eq!(store.value(CLIENT_SECRET_KEY).as_deref(), Some("b"));

        let store = MemoryStore::with_pair("a", "b");
        store.fail_delete(CLIENT_ID_KEY);
        assert!(clear_pair(&store).is_err());
        assert_eq!(store.value(CLIENT_SECRET_KEY), None);
    }

    #[test]
    #[ignore] // needs a running OS keystore
    fn keyring_round_trip() {
        let store = KeyringStore::with_service("kube-infisical-test");
        store.put("ikube-selftest", "value").unwrap();
        assert_eq!(store.get("ikube-selftest").unwrap().as_deref(), Some("value"));
        store.delete("ikube-selftest").unwrap();
        assert_eq!(store.get("ikube-selftest").unwrap(), None);
        store.delete("ikube-selftest").unwrap();
    }
}
