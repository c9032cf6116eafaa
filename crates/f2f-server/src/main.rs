mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

const RESEND_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(f2f_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = f2f_db::PoolConfig::from_app_config(&config);
    let pool = f2f_db::connect_pool(&config.database_url, pool_config).await?;
    f2f_db::run_migrations(&pool).await?;

    let _scheduler = scheduler::build_scheduler(pool.clone(), Arc::clone(&config)).await?;

    let notifier = build_notifier(&config)?;
    let auth = AuthState::from_env(
        &config.api_key_hash_salt,
        matches!(config.env, f2f_core::Environment::Development),
    )?;
    let app = build_app(AppState { pool, notifier }, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "f2f-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_notifier(
    config: &f2f_core::AppConfig,
) -> anyhow::Result<Option<Arc<f2f_notify::Notifier>>> {
    let Some(api_key) = config.resend_api_key.as_deref() else {
        tracing::warn!("F2F_RESEND_API_KEY not set; transactional email disabled");
        return Ok(None);
    };

    let client = f2f_notify::ResendClient::with_base_url(
        api_key,
        RESEND_TIMEOUT_SECS,
        &config.resend_base_url,
    )?;
    Ok(Some(Arc::new(f2f_notify::Notifier::new(
        client,
        config.from_email.clone(),
    ))))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
