use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{bail, Context};
use async_trait::async_trait;
use edgepass_core::{IssuanceError, Result};

use crate::credential_provider::CredentialItemNames;

/// Backend holding the private key secret and the two plain parameters.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Short label used in log fields.
    fn source_name(&self) -> &'static str;

    async fn fetch_secret(&self, name: &str) -> Result<String>;

    async fn fetch_parameter(&self, name: &str) -> Result<String>;
}

#[derive(Clone, Default)]
/// In-memory credential source for local runs and tests.
pub struct StaticCredentialSource {
    secrets: BTreeMap<String, String>,
    parameters: BTreeMap<String, String>,
}

impl StaticCredentialSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Serves a PEM file from disk under the configured item names.
    pub fn from_local_key_file(
        names: &CredentialItemNames,
        private_key_path: &Path,
        key_pair_id: &str,
        protected_domain: &str,
    ) -> anyhow::Result<Self> {
        if key_pair_id.trim().is_empty() {
            bail!("local key pair id cannot be empty");
        }
        if protected_domain.trim().is_empty() {
            bail!("local protected domain cannot be empty");
        }
        let pem = std::fs::read_to_string(private_key_path).with_context(|| {
            format!(
                "failed to read local private key {}",
                private_key_path.display()
            )
        })?;
        Ok(Self::new()
            .with_secret(names.private_key_secret.clone(), pem)
            .with_parameter(names.key_pair_id_parameter.clone(), key_pair_id.trim())
            .with_parameter(names.domain_parameter.clone(), protected_domain.trim()))
    }
}

impl fmt::Debug for StaticCredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialSource")
            .field("secrets", &self.secrets.keys().collect::<Vec<_>>())
            .field("parameters", &self.parameters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn fetch_secret(&self, name: &str) -> Result<String> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| IssuanceError::credential_unavailable(name, "secret not found"))
    }

    async fn fetch_parameter(&self, name: &str) -> Result<String> {
        self.parameters
            .get(name)
            .cloned()
            .ok_or_else(|| IssuanceError::credential_unavailable(name, "parameter not found"))
    }
}
