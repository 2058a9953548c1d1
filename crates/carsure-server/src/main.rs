mod api;
mod middleware;

use std::sync::Arc;

use carsure_assess::AnalysisPipeline;
use carsure_firebase::{FirebaseClient, IdentityToolkitVerifier, StaticTokenVerifier, TokenVerifier};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

const FIREBASE_TIMEOUT_SECS: u64 = 15;
const VERIFY_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(carsure_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, ai_provider = %config.ai_provider, "starting carsure server");

    let firebase = Arc::new(FirebaseClient::new(
        &config.firebase_database_url,
        FIREBASE_TIMEOUT_SECS,
        config.firebase_list_timeout_secs,
    )?);
    let pipeline = AnalysisPipeline::from_config(&config)?;

    let verifier: Arc<dyn TokenVerifier> = match config.firebase_api_key.as_deref() {
        Some(key) => Arc::new(IdentityToolkitVerifier::new(key, VERIFY_TIMEOUT_SECS)?),
        None => {
            tracing::warn!("FIREBASE_API_KEY not set; every bearer token will be rejected");
            Arc::new(StaticTokenVerifier::new())
        }
    };
    let auth = AuthState::new(verifier, config.dev_auth_bypass(), &config.admin_uids);

    let bind_addr = config.bind_addr;
    let app = build_app(
        AppState {
            config,
            firebase,
            pipeline,
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
