//! Configured secrets handed to admin clients

use std::collections::BTreeMap;

pub struct SecretService {
    secrets: BTreeMap<String, String>,
}

impl SecretService {
    pub fn new(secrets: BTreeMap<String, String>) -> Self {
        Self { secrets }
    }

    /// Look up a secret by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&str> {
        self.secrets
            .get(&name.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.secrets.keys().map(String::as_str)
    }
}
