//! Named API key storage
//!
//! Keys such as `metricool` or `compose` live in a [`CredentialStore`]
//! (the OS keyring in normal use, memory in tests). Keyrings cannot be
//! enumerated, so [`CredentialManager`] keeps a names-only registry next to
//! the config so `keys list` has something to show. Values never touch the
//! registry and are never logged.
//!
//! Resolution order for a key named `metricool`:
//! 1. `POSTDECK_METRICOOL_API_KEY` environment variable
//! 2. the configured store

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::{expand_path, CredentialBackend, CredentialsConfig};
use crate::error::{CredentialError, Result};

const KEYRING_SERVICE: &str = "postdeck";

/// Backend holding secret values by name
pub trait CredentialStore: Send + Sync {
    fn store(&self, name: &str, value: &str) -> Result<()>;

    /// `Ok(None)` when nothing is stored under `name`
    fn retrieve(&self, name: &str) -> Result<Option<SecretString>>;

    /// Returns whether something was removed
    fn delete(&self, name: &str) -> Result<bool>;

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.retrieve(name)?.is_some())
    }

    fn backend_name(&self) -> &str;
}

/// OS-native secure storage (macOS Keychain, Windows Credential Manager,
/// Linux Secret Service)
pub struct KeyringStore;

impl KeyringStore {
    /// Fails with `KeyringUnavailable` on hosts without a usable keyring
    pub fn new() -> Result<Self> {
        keyring::Entry::new(KEYRING_SERVICE, "availability_check").map_err(|e| {
            CredentialError::KeyringUnavailable(format!("OS keyring not accessible: {}", e))
        })?;
        Ok(Self)
    }

    fn entry(name: &str) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(KEYRING_SERVICE, name)
            .map_err(|e| CredentialError::KeyringUnavailable(e.to_string()))?)
    }
}

impl CredentialStore for KeyringStore {
    fn store(&self, name: &str, value: &str) -> Result<()> {
        Self::entry(name)?
            .set_password(value)
            .map_err(|e| CredentialError::Keyring(e.to_string()))?;
        tracing::debug!("Stored key '{}' in OS keyring", name);
        Ok(())
    }

    fn retrieve(&self, name: &str) -> Result<Option<SecretString>> {
        match Self::entry(name)?.get_password() {
            Ok(value) => Ok(Some(SecretString::from(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::Keyring(e.to_string()).into()),
        }
    }

    fn delete(&self, name: &str) -> Result<bool> {
        match Self::entry(name)?.delete_password() {
            Ok(()) => {
                tracing::debug!("Deleted key '{}' from OS keyring", name);
                Ok(true)
            }
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(CredentialError::Keyring(e.to_string()).into()),
        }
    }

    fn backend_name(&self) -> &str {
        "keyring"
    }
}

/// Process-local store for tests and throwaway sessions
#[derive(Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<String, SecretString>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, SecretString>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn store(&self, name: &str, value: &str) -> Result<()> {
        self.values()
            .insert(name.to_string(), SecretString::from(value.to_string()));
        Ok(())
    }

    fn retrieve(&self, name: &str) -> Result<Option<SecretString>> {
        Ok(self.values().get(name).cloned())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.values().remove(name).is_some())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Registry {
    #[serde(default)]
    keys: BTreeSet<String>,
}

/// Where a resolved key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    Env,
    Store,
}

/// Registered key name plus whether a value is currently available
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub name: String,
    pub source: Option<KeySource>,
}

/// Front door for named keys: validation, registry upkeep and env overrides
pub struct CredentialManager {
    store: Box<dyn CredentialStore>,
    registry_path: Option<PathBuf>,
    names: Mutex<BTreeSet<String>>,
}

impl CredentialManager {
    /// Build a manager from the `[credentials]` section
    pub fn new(config: &CredentialsConfig) -> Result<Self> {
        match config.backend {
            CredentialBackend::Keyring => {
                let store = KeyringStore::new()?;
                tracing::info!("Using OS keyring for credential storage");
                Self::with_registry(Box::new(store), expand_path(&config.registry_path))
            }
            CredentialBackend::Memory => Ok(Self::in_memory()),
        }
    }

    /// Memory store with an in-memory registry
    pub fn in_memory() -> Self {
        Self {
            store: Box::new(MemoryCredentialStore::new()),
            registry_path: None,
            names: Mutex::new(BTreeSet::new()),
        }
    }

    /// Any store plus a registry file at `path` (created on first write)
    pub fn with_registry(store: Box<dyn CredentialStore>, path: PathBuf) -> Result<Self> {
        let registry = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str::<Registry>(&content)
                .map_err(|e| CredentialError::Registry(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Registry::default(),
            Err(e) => return Err(CredentialError::Io(e).into()),
        };

        Ok(Self {
            store,
            registry_path: Some(path),
            names: Mutex::new(registry.keys),
        })
    }

    pub fn backend_name(&self) -> &str {
        self.store.backend_name()
    }

    /// Store `value` under `name`, replacing any previous value
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        validate_name(name)?;
        if value.trim().is_empty() {
            return Err(crate::error::PostdeckError::Validation(format!(
                "value for key '{}' cannot be empty",
                name
            )));
        }

        self.store.store(name, value)?;

        let mut names = self.names();
        if names.insert(name.to_string()) {
            self.save_registry(&names)?;
        }
        tracing::info!("Stored key '{}' ({})", name, self.backend_name());
        Ok(())
    }

    /// Registered names with where each one currently resolves from
    pub fn list(&self) -> Result<Vec<KeyInfo>> {
        let names: Vec<String> = self.names().iter().cloned().collect();
        names
            .into_iter()
            .map(|name| {
                let source = self.lookup(&name)?.map(|(_, source)| source);
                Ok(KeyInfo { name, source })
            })
            .collect()
    }

    /// Remove a stored key; unknown names are `NotFound`
    pub fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;

        let removed = self.store.delete(name)?;
        let mut names = self.names();
        let registered = names.remove(name);
        if registered {
            self.save_registry(&names)?;
        }

        if !removed && !registered {
            return Err(CredentialError::NotFound(name.to_string()).into());
        }
        tracing::info!("Deleted key '{}'", name);
        Ok(())
    }

    /// Resolve a key, failing with `NotFound` when neither env nor store has it
    pub fn resolve(&self, name: &str) -> Result<SecretString> {
        self.resolve_optional(name)?
            .ok_or_else(|| CredentialError::NotFound(name.to_string()).into())
    }

    /// Resolve a key that may legitimately be absent
    pub fn resolve_optional(&self, name: &str) -> Result<Option<SecretString>> {
        validate_name(name)?;
        Ok(self.lookup(name)?.map(|(secret, _)| secret))
    }

    fn lookup(&self, name: &str) -> Result<Option<(SecretString, KeySource)>> {
        if let Ok(value) = std::env::var(env_var_name(name)) {
            if !value.is_empty() {
                tracing::debug!("Key '{}' resolved from environment", name);
                return Ok(Some((SecretString::from(value), KeySource::Env)));
            }
        }

        Ok(self
            .store
            .retrieve(name)?
            .filter(|secret| !secret.expose_secret().is_empty())
            .map(|secret| (secret, KeySource::Store)))
    }

    fn names(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.names.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save_registry(&self, names: &BTreeSet<String>) -> Result<()> {
        let Some(path) = &self.registry_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(CredentialError::Io)?;
        }
        let registry = Registry {
            keys: names.clone(),
        };
        let content = toml::to_string(&registry)
            .map_err(|e| CredentialError::Registry(e.to_string()))?;
        std::fs::write(path, content).map_err(CredentialError::Io)?;
        Ok(())
    }
}

/// `metricool` -> `POSTDECK_METRICOOL_API_KEY`
pub fn env_var_name(name: &str) -> String {
    format!("POSTDECK_{}_API_KEY", name.to_uppercase().replace('-', "_"))
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CredentialError::InvalidName(name.to_string()).into())
    }
}
