use std::sync::Arc;

use anyhow::{Context, Result};
use edgepass_access::{Authenticator, NonEmptyPasswordAuthenticator, StaticPasswordAuthenticator};
use edgepass_gateway::{run_cookie_issuer_server, CookieIssuerServerConfig};
use edgepass_provider::{
    CredentialItemNames, CredentialProvider, CredentialSource, ExtensionCredentialSource,
    ExtensionSourceConfig, StaticCredentialSource,
};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::Cli;

pub fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

pub fn credential_item_names(cli: &Cli) -> CredentialItemNames {
    CredentialItemNames {
        private_key_secret: cli.private_key_name.clone(),
        key_pair_id_parameter: cli.key_pair_id_name.clone(),
        domain_parameter: cli.domain_name.clone(),
    }
}

pub fn build_credential_source(
    cli: &Cli,
    names: &CredentialItemNames,
) -> Result<Arc<dyn CredentialSource>> {
    if let Some(path) = cli.local_private_key_file.as_deref() {
        let source = StaticCredentialSource::from_local_key_file(
            names,
            path,
            cli.local_key_pair_id.as_deref().unwrap_or_default(),
            cli.local_domain.as_deref().unwrap_or_default(),
        )
        .context("failed to load local signing credential")?;
        return Ok(Arc::new(source));
    }

    let source = ExtensionCredentialSource::new(ExtensionSourceConfig {
        endpoint: cli.extension_endpoint.clone(),
        session_token: cli.extension_token.clone(),
        request_timeout_ms: cli.credential_fetch_timeout_ms,
    })?;
    Ok(Arc::new(source))
}

pub fn build_authenticator(cli: &Cli) -> Arc<dyn Authenticator> {
    match cli.auth_password.as_deref() {
        Some(password) if !password.is_empty() => {
            Arc::new(StaticPasswordAuthenticator::new(password))
        }
        _ => Arc::new(NonEmptyPasswordAuthenticator),
    }
}

pub fn build_server_config(cli: &Cli) -> CookieIssuerServerConfig {
    CookieIssuerServerConfig {
        bind: cli.bind.clone(),
        resource_pattern: cli.resource_pattern.clone(),
        validity_seconds: cli.validity_seconds,
    }
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    let config = build_server_config(&cli);
    config
        .validate()
        .context("invalid cookie issuer configuration")?;

    let names = credential_item_names(&cli);
    let source = build_credential_source(&cli, &names)?;
    let authenticator = build_authenticator(&cli);
    info!(
        credential_source = source.source_name(),
        private_key_secret = %names.private_key_secret,
        key_pair_id_parameter = %names.key_pair_id_parameter,
        domain_parameter = %names.domain_parameter,
        static_password = cli.auth_password.is_some(),
        "starting edgepass"
    );

    let provider = Arc::new(CredentialProvider::new(source, names));
    run_cookie_issuer_server(config, provider, authenticator).await
}
