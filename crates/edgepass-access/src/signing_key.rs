use std::fmt;

use edgepass_core::{IssuanceError, Result};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};

const PKCS1_PEM_LABEL: &str = "BEGIN RSA PRIVATE KEY";
const PKCS8_PEM_LABEL: &str = "BEGIN PRIVATE KEY";

/// RSA private key used to sign access policies.
#[derive(Clone)]
pub struct SigningKey {
    private_key: Box<RsaPrivateKey>,
}

impl SigningKey {
    /// Parses a PEM-encoded RSA key in PKCS#1 or PKCS#8 form.
    ///
    /// `source_name` names the secret the PEM came from and is only used in
    /// error messages. Secret stores sometimes hold the PEM with escaped `\n`
    /// sequences instead of line breaks; those are unescaped first.
    pub fn from_pem(source_name: &str, pem: &str) -> Result<Self> {
        let pem = normalize_pem(pem);
        let parsed = if pem.contains(PKCS1_PEM_LABEL) {
            RsaPrivateKey::from_pkcs1_pem(&pem).map_err(|error| {
                IssuanceError::credential_malformed(
                    source_name,
                    format!("invalid PKCS#1 RSA private key: {error}"),
                )
            })?
        } else if pem.contains(PKCS8_PEM_LABEL) {
            RsaPrivateKey::from_pkcs8_pem(&pem).map_err(|error| {
                IssuanceError::credential_malformed(
                    source_name,
                    format!("invalid PKCS#8 RSA private key: {error}"),
                )
            })?
        } else {
            return Err(IssuanceError::credential_malformed(
                source_name,
                "expected a PEM RSA private key (PKCS#1 or PKCS#8)",
            ));
        };
        Ok(Self {
            private_key: Box::new(parsed),
        })
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    /// Signs `message` with RSASSA-PKCS1-v1_5 over its SHA-1 digest.
    pub fn sign_sha1(&self, message: &[u8]) -> Result<Vec<u8>> {
        let digest = Sha1::digest(message);
        self.private_key
            .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
            .map_err(|error| IssuanceError::signing_failure(error.to_string()))
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

fn normalize_pem(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.contains('\n') && trimmed.contains("\\n") {
        return trimmed.replace("\\n", "\n");
    }
    trimmed.to_string()
}

/// The process-wide signing material: key, its public key id and the protected domain.
#[derive(Clone)]
pub struct SigningCredential {
    key: SigningKey,
    key_pair_id: String,
    protected_domain: String,
}

impl SigningCredential {
    pub fn new(
        key: SigningKey,
        key_pair_id: impl Into<String>,
        protected_domain: impl Into<String>,
    ) -> Self {
        Self {
            key,
            key_pair_id: key_pair_id.into(),
            protected_domain: protected_domain.into(),
        }
    }

    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    pub fn key_pair_id(&self) -> &str {
        self.key_pair_id.as_str()
    }

    pub fn protected_domain(&self) -> &str {
        self.protected_domain.as_str()
    }

    /// Wildcard pattern covering every object served by the protected domain.
    pub fn default_resource_pattern(&self) -> String {
        let domain = self.protected_domain.trim();
        let domain = domain
            .strip_prefix("https://")
            .or_else(|| domain.strip_prefix("http://"))
            .unwrap_or(domain)
            .trim_end_matches('/');
        format!("https://{domain}/*")
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("key", &self.key)
            .field("key_pair_id", &self.key_pair_id)
            .field("protected_domain", &self.protected_domain)
            .finish()
    }
}
