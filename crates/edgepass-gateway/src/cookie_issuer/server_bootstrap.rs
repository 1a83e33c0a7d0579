//! Cookie issuer server bootstrap and router wiring.

use super::issuance_runtime::{handle_get_signed_cookies, handle_health};
use super::*;

/// Validates configuration, binds `config.bind` and serves until Ctrl-C.
pub async fn run_cookie_issuer_server(
    config: CookieIssuerServerConfig,
    provider: Arc<CredentialProvider>,
    authenticator: Arc<dyn Authenticator>,
) -> Result<()> {
    config
        .validate()
        .context("invalid cookie issuer configuration")?;
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind cookie issuer server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound cookie issuer address")?;

    info!(
        endpoint = GET_SIGNED_COOKIES_ENDPOINT,
        addr = %local_addr,
        validity_seconds = config.validity_seconds,
        "cookie issuer server listening"
    );

    let state = Arc::new(CookieIssuerState::new(config, provider, authenticator));
    let app = build_cookie_issuer_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("cookie issuer server exited unexpectedly")?;

    info!("cookie issuer server stopped");
    Ok(())
}

pub fn build_cookie_issuer_router(state: Arc<CookieIssuerState>) -> Router {
    Router::new()
        .route(GET_SIGNED_COOKIES_ENDPOINT, post(handle_get_signed_cookies))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}
