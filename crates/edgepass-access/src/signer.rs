use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use edgepass_core::Result;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};

use crate::policy::PolicyStatement;
use crate::signing_key::SigningCredential;

pub const COOKIE_KEY_PAIR_ID: &str = "CloudFront-Key-Pair-Id";
pub const COOKIE_SIGNATURE: &str = "CloudFront-Signature";
pub const COOKIE_POLICY: &str = "CloudFront-Policy";

#[derive(Debug, Clone, PartialEq, Eq)]
/// The three cookie values the edge verifies on every request.
pub struct SignedCookieSet {
    pub key_pair_id: String,
    pub policy_encoded: String,
    pub signature_encoded: String,
}

impl SignedCookieSet {
    /// Cookie name/value pairs in emission order: key-pair id, signature, policy.
    pub fn cookies(&self) -> [(&'static str, &str); 3] {
        [
            (COOKIE_KEY_PAIR_ID, self.key_pair_id.as_str()),
            (COOKIE_SIGNATURE, self.signature_encoded.as_str()),
            (COOKIE_POLICY, self.policy_encoded.as_str()),
        ]
    }

    /// Decodes `CloudFront-Policy` back into the signed policy statement.
    pub fn decode_policy(&self) -> anyhow::Result<PolicyStatement> {
        let bytes = decode_cdn_base64(&self.policy_encoded).context("failed to decode policy")?;
        let raw = String::from_utf8(bytes).context("policy is not UTF-8")?;
        PolicyStatement::parse_canonical(&raw)
    }
}

/// Base64 with `+`, `=` and `/` swapped for `-`, `_` and `~` so values need no cookie escaping.
pub fn encode_cdn_base64(bytes: &[u8]) -> String {
    BASE64
        .encode(bytes)
        .chars()
        .map(|ch| match ch {
            '+' => '-',
            '=' => '_',
            '/' => '~',
            other => other,
        })
        .collect()
}

pub fn decode_cdn_base64(raw: &str) -> anyhow::Result<Vec<u8>> {
    let standard = raw
        .trim()
        .chars()
        .map(|ch| match ch {
            '-' => '+',
            '_' => '=',
            '~' => '/',
            other => other,
        })
        .collect::<String>();
    BASE64
        .decode(standard)
        .context("value is not CDN-safe base64")
}

/// Signs the canonical form of `policy` with the credential's key.
pub fn sign(credential: &SigningCredential, policy: &PolicyStatement) -> Result<SignedCookieSet> {
    let canonical = policy.canonical_json();
    let signature = credential.key().sign_sha1(canonical.as_bytes())?;
    Ok(SignedCookieSet {
        key_pair_id: credential.key_pair_id().to_string(),
        policy_encoded: encode_cdn_base64(canonical.as_bytes()),
        signature_encoded: encode_cdn_base64(&signature),
    })
}

/// Checks a cookie set the way the edge does: signature over the decoded policy bytes.
pub fn verify_signed_cookie_set(
    public_key: &RsaPublicKey,
    cookies: &SignedCookieSet,
) -> anyhow::Result<()> {
    let policy = decode_cdn_base64(&cookies.policy_encoded).context("failed to decode policy")?;
    let signature =
        decode_cdn_base64(&cookies.signature_encoded).context("failed to decode signature")?;
    let digest = Sha1::digest(&policy);
    public_key
        .verify(Pkcs1v15Sign::new::<Sha1>(), &digest, &signature)
        .map_err(|error| anyhow!("signature does not match policy: {error}"))
}
