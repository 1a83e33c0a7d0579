use std::path::PathBuf;

use clap::Parser;
use edgepass_provider::{
    DEFAULT_DOMAIN_PARAMETER_NAME, DEFAULT_KEY_PAIR_ID_PARAMETER_NAME,
    DEFAULT_PRIVATE_KEY_SECRET_NAME,
};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_non_blank(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("value cannot be empty".to_string());
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Parser)]
#[command(
    name = "edgepass",
    about = "Issues signed CDN access cookies to authorized callers",
    version
)]
pub struct Cli {
    #[arg(
        long = "bind",
        env = "EDGEPASS_BIND",
        default_value = "127.0.0.1:8787",
        help = "Socket address for the cookie issuer server (host:port)"
    )]
    pub bind: String,

    #[arg(
        long = "private-key-name",
        env = "PRIVATE_KEY_NAME",
        default_value = DEFAULT_PRIVATE_KEY_SECRET_NAME,
        value_parser = parse_non_blank,
        help = "Secret id holding the PEM-encoded RSA signing key"
    )]
    pub private_key_name: String,

    #[arg(
        long = "key-pair-id-name",
        env = "CLOUDFRONT_KEY_PAIR_ID_NAME",
        default_value = DEFAULT_KEY_PAIR_ID_PARAMETER_NAME,
        value_parser = parse_non_blank,
        help = "Parameter name holding the public key id"
    )]
    pub key_pair_id_name: String,

    #[arg(
        long = "domain-name",
        env = "CLOUDFRONT_DOMAIN_NAME",
        default_value = DEFAULT_DOMAIN_PARAMETER_NAME,
        value_parser = parse_non_blank,
        help = "Parameter name holding the protected distribution domain"
    )]
    pub domain_name: String,

    #[arg(
        long = "resource-pattern",
        env = "EDGEPASS_RESOURCE_PATTERN",
        help = "Resource URL granted by issued cookies; defaults to https://<domain>/*"
    )]
    pub resource_pattern: Option<String>,

    #[arg(
        long = "validity-seconds",
        env = "EDGEPASS_VALIDITY_SECONDS",
        default_value_t = 60,
        allow_negative_numbers = true,
        help = "Lifetime of issued cookies in seconds; must be positive"
    )]
    pub validity_seconds: i64,

    #[arg(
        long = "extension-endpoint",
        env = "EDGEPASS_EXTENSION_ENDPOINT",
        default_value = "http://localhost:2773",
        help = "Base URL of the Parameters and Secrets extension"
    )]
    pub extension_endpoint: String,

    #[arg(
        long = "extension-token",
        env = "AWS_SESSION_TOKEN",
        hide_env_values = true,
        help = "Session token sent to the Parameters and Secrets extension"
    )]
    pub extension_token: Option<String>,

    #[arg(
        long = "credential-fetch-timeout-ms",
        env = "EDGEPASS_CREDENTIAL_FETCH_TIMEOUT_MS",
        default_value_t = 3_000,
        value_parser = parse_positive_u64,
        help = "Timeout for each credential lookup in milliseconds"
    )]
    pub credential_fetch_timeout_ms: u64,

    #[arg(
        long = "auth-password",
        env = "EDGEPASS_AUTH_PASSWORD",
        hide_env_values = true,
        help = "Require this exact password; without it any non-empty password is accepted"
    )]
    pub auth_password: Option<String>,

    #[arg(
        long = "local-private-key-file",
        env = "EDGEPASS_LOCAL_PRIVATE_KEY_FILE",
        requires_all = ["local_key_pair_id", "local_domain"],
        help = "Serve credentials from a local PEM file instead of the extension"
    )]
    pub local_private_key_file: Option<PathBuf>,

    #[arg(
        long = "local-key-pair-id",
        env = "EDGEPASS_LOCAL_KEY_PAIR_ID",
        requires = "local_private_key_file",
        help = "Public key id used with --local-private-key-file"
    )]
    pub local_key_pair_id: Option<String>,

    #[arg(
        long = "local-domain",
        env = "EDGEPASS_LOCAL_DOMAIN",
        requires = "local_private_key_file",
        help = "Protected domain used with --local-private-key-file"
    )]
    pub local_domain: Option<String>,
}
