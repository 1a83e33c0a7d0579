use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use edgepass_access::{SigningCredential, SigningKey};
use edgepass_core::{IssuanceError, Result};
use tracing::{debug, info};

use crate::credential_source::CredentialSource;

pub const DEFAULT_PRIVATE_KEY_SECRET_NAME: &str = "get-signed-cookies-sample-private-key";
pub const DEFAULT_KEY_PAIR_ID_PARAMETER_NAME: &str =
    "/get-signed-cookies-sample/CLOUDFRONT_KEY_PAIR_ID";
pub const DEFAULT_DOMAIN_PARAMETER_NAME: &str = "/get-signed-cookies-sample/CLOUDFRONT_DOMAIN";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Names of the three items that make up a signing credential.
pub struct CredentialItemNames {
    pub private_key_secret: String,
    pub key_pair_id_parameter: String,
    pub domain_parameter: String,
}

impl Default for CredentialItemNames {
    fn default() -> Self {
        Self {
            private_key_secret: DEFAULT_PRIVATE_KEY_SECRET_NAME.to_string(),
            key_pair_id_parameter: DEFAULT_KEY_PAIR_ID_PARAMETER_NAME.to_string(),
            domain_parameter: DEFAULT_DOMAIN_PARAMETER_NAME.to_string(),
        }
    }
}

/// Fetches the signing credential once and serves it from memory afterwards.
///
/// Concurrent first calls may each hit the source; the last successful fetch
/// wins the slot. A failed fetch never touches the slot.
pub struct CredentialProvider {
    source: Arc<dyn CredentialSource>,
    names: CredentialItemNames,
    cached: ArcSwapOption<SigningCredential>,
}

impl CredentialProvider {
    pub fn new(source: Arc<dyn CredentialSource>, names: CredentialItemNames) -> Self {
        Self {
            source,
            names,
            cached: ArcSwapOption::empty(),
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cached.load().is_some()
    }

    pub async fn fetch_credential(&self) -> Result<Arc<SigningCredential>> {
        if let Some(credential) = self.cached.load_full() {
            return Ok(credential);
        }

        debug!(
            source = self.source.source_name(),
            private_key_secret = %self.names.private_key_secret,
            key_pair_id_parameter = %self.names.key_pair_id_parameter,
            domain_parameter = %self.names.domain_parameter,
            "fetching signing credential"
        );
        let (pem, key_pair_id, protected_domain) = tokio::try_join!(
            self.fetch_secret_item(&self.names.private_key_secret),
            self.fetch_parameter_item(&self.names.key_pair_id_parameter),
            self.fetch_parameter_item(&self.names.domain_parameter),
        )?;

        let key = SigningKey::from_pem(&self.names.private_key_secret, &pem)?;
        let credential = Arc::new(SigningCredential::new(key, key_pair_id, protected_domain));
        self.cached.store(Some(credential.clone()));
        info!(
            source = self.source.source_name(),
            key_pair_id = %credential.key_pair_id(),
            protected_domain = %credential.protected_domain(),
            "signing credential cached"
        );
        Ok(credential)
    }

    async fn fetch_secret_item(&self, name: &str) -> Result<String> {
        let value = self.source.fetch_secret(name).await?;
        require_non_empty(name, value)
    }

    async fn fetch_parameter_item(&self, name: &str) -> Result<String> {
        let value = self.source.fetch_parameter(name).await?;
        require_non_empty(name, value).map(|value| value.trim().to_string())
    }
}

impl fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("source", &self.source.source_name())
            .field("names", &self.names)
            .field("cached", &self.is_cached())
            .finish()
    }
}

fn require_non_empty(name: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(IssuanceError::credential_unavailable(name, "value is empty"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{CredentialItemNames, CredentialProvider};
    use crate::credential_source::{CredentialSource, StaticCredentialSource};
    use crate::extension_source::{ExtensionCredentialSource, ExtensionSourceConfig};
    use async_trait::async_trait;
    use edgepass_core::IssuanceError;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const PKCS1_PEM: &str = include_str!("../../../testdata/signing-key-pkcs1.pem");

    fn complete_source(names: &CredentialItemNames) -> StaticCredentialSource {
        StaticCredentialSource::new()
            .with_secret(names.private_key_secret.clone(), PKCS1_PEM)
            .with_parameter(names.key_pair_id_parameter.clone(), "K2JCJMDEHXQW5F\n")
            .with_parameter(names.domain_parameter.clone(), "example-cdn.test")
    }

    struct CountingSource {
        inner: StaticCredentialSource,
        secret_calls: AtomicUsize,
        failing: AtomicBool,
    }

    #[async_trait]
    impl CredentialSource for CountingSource {
        fn source_name(&self) -> &'static str {
            "counting"
        }

        async fn fetch_secret(&self, name: &str) -> edgepass_core::Result<String> {
            self.secret_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(IssuanceError::credential_unavailable(name, "store offline"));
            }
            self.inner.fetch_secret(name).await
        }

        async fn fetch_parameter(&self, name: &str) -> edgepass_core::Result<String> {
            self.inner.fetch_parameter(name).await
        }
    }

    struct SlowSource {
        inner: StaticCredentialSource,
    }

    #[async_trait]
    impl CredentialSource for SlowSource {
        fn source_name(&self) -> &'static str {
            "slow"
        }

        async fn fetch_secret(&self, name: &str) -> edgepass_core::Result<String> {
            tokio::time::sleep(Duration::from_millis(25)).await;
            self.inner.fetch_secret(name).await
        }

        async fn fetch_parameter(&self, name: &str) -> edgepass_core::Result<String> {
            tokio::time::sleep(Duration::from_millis(25)).await;
            self.inner.fetch_parameter(name).await
        }
    }

    #[tokio::test]
    async fn functional_fetch_credential_parses_and_trims_items() {
        let names = CredentialItemNames::default();
        let provider = CredentialProvider::new(Arc::new(complete_source(&names)), names);
        assert!(!provider.is_cached());

        let credential = provider.fetch_credential().await.expect("fetch credential");
        assert_eq!(credential.key_pair_id(), "K2JCJMDEHXQW5F");
        assert_eq!(credential.protected_domain(), "example-cdn.test");
        assert!(provider.is_cached());
    }

    #[tokio::test]
    async fn functional_fetch_credential_reads_source_once_then_serves_cache() {
        let names = CredentialItemNames::default();
        let source = Arc::new(CountingSource {
            inner: complete_source(&names),
            secret_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        });
        let provider = CredentialProvider::new(source.clone(), names);

        let first = provider.fetch_credential().await.expect("first fetch");
        source.failing.store(true, Ordering::SeqCst);
        let second = provider.fetch_credential().await.expect("cached fetch");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.secret_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn functional_concurrent_cold_fetches_all_return_usable_credential() {
        let names = CredentialItemNames::default();
        let source = Arc::new(SlowSource {
            inner: complete_source(&names),
        });
        let provider = Arc::new(CredentialProvider::new(source, names));
        assert!(!provider.is_cached());

        let (first, second, third, fourth) = tokio::join!(
            provider.fetch_credential(),
            provider.fetch_credential(),
            provider.fetch_credential(),
            provider.fetch_credential(),
        );
        for result in [first, second, third, fourth] {
            let credential = result.expect("concurrent fetch");
            assert_eq!(credential.key_pair_id(), "K2JCJMDEHXQW5F");
            assert_eq!(credential.protected_domain(), "example-cdn.test");
        }
        assert!(provider.is_cached());
        let cached = provider.fetch_credential().await.expect("cached fetch");
        assert_eq!(cached.key_pair_id(), "K2JCJMDEHXQW5F");
    }

    #[tokio::test]
    async fn regression_failed_fetch_leaves_cache_empty_and_retries_next_call() {
        let names = CredentialItemNames::default();
        let source = Arc::new(CountingSource {
            inner: complete_source(&names),
            secret_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(true),
        });
        let provider = CredentialProvider::new(source.clone(), names.clone());

        let error = provider.fetch_credential().await.expect_err("store offline");
        assert_eq!(
            error,
            IssuanceError::credential_unavailable(names.private_key_secret.clone(), "store offline")
        );
        assert!(!provider.is_cached());

        source.failing.store(false, Ordering::SeqCst);
        provider.fetch_credential().await.expect("recovered fetch");
        assert_eq!(source.secret_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn regression_empty_parameter_is_unavailable() {
        let names = CredentialItemNames::default();
        let source = complete_source(&names).with_parameter(names.domain_parameter.clone(), "  ");
        let provider = CredentialProvider::new(Arc::new(source), names.clone());

        let error = provider.fetch_credential().await.expect_err("empty domain");
        assert_eq!(
            error,
            IssuanceError::credential_unavailable(names.domain_parameter.clone(), "value is empty")
        );
    }

    #[tokio::test]
    async fn regression_malformed_key_is_reported_and_not_cached() {
        let names = CredentialItemNames::default();
        let source =
            complete_source(&names).with_secret(names.private_key_secret.clone(), "not-a-pem");
        let provider = CredentialProvider::new(Arc::new(source), names.clone());

        let error = provider.fetch_credential().await.expect_err("malformed key");
        match error {
            IssuanceError::CredentialMalformed { item, message } => {
                assert_eq!(item, names.private_key_secret);
                assert!(!message.contains("not-a-pem"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!provider.is_cached());
    }

    #[tokio::test]
    async fn integration_fetch_credential_through_extension_endpoint() {
        let server = MockServer::start_async().await;
        let names = CredentialItemNames {
            private_key_secret: "edge-key".to_string(),
            key_pair_id_parameter: "/edge/KEY_PAIR_ID".to_string(),
            domain_parameter: "/edge/DOMAIN".to_string(),
        };
        let secret = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/secretsmanager/get")
                    .query_param("secretId", "edge-key");
                then.status(200).json_body(json!({ "SecretString": PKCS1_PEM }));
            })
            .await;
        let key_pair_id = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/systemsmanager/parameters/get")
                    .query_param("name", "/edge/KEY_PAIR_ID");
                then.status(200)
                    .json_body(json!({ "Parameter": { "Value": "K2JCJMDEHXQW5F" } }));
            })
            .await;
        let domain = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/systemsmanager/parameters/get")
                    .query_param("name", "/edge/DOMAIN");
                then.status(200)
                    .json_body(json!({ "Parameter": { "Value": "example-cdn.test" } }));
            })
            .await;

        let source = ExtensionCredentialSource::new(ExtensionSourceConfig {
            endpoint: server.base_url(),
            session_token: Some("token".to_string()),
            request_timeout_ms: 2_000,
        })
        .expect("extension source");
        let provider = CredentialProvider::new(Arc::new(source), names);

        provider.fetch_credential().await.expect("first fetch");
        let credential = provider.fetch_credential().await.expect("cached fetch");
        assert_eq!(credential.default_resource_pattern(), "https://example-cdn.test/*");
        assert!(secret.hits_async().await >= 1);
        assert!(key_pair_id.hits_async().await >= 1);
        assert!(domain.hits_async().await >= 1);
    }

    #[test]
    fn regression_provider_debug_omits_credential_values() {
        let names = CredentialItemNames::default();
        let provider = CredentialProvider::new(Arc::new(complete_source(&names)), names);
        let rendered = format!("{provider:?}");
        assert!(rendered.contains("cached: false"));
        assert!(!rendered.contains("PRIVATE KEY"));
    }
}
