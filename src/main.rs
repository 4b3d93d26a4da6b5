// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

use std::sync::Arc;

use iprovidence_server::{
    api::router,
    config::{AppConfig, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    identity::IdentityClient,
    notify::{
        templates::EmailRenderer, DisabledMailer, MailTransport, NotificationWorker, Notifier,
        SmtpMailer, QUEUE_CAPACITY,
    },
    state::AppState,
    storage::PgStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    info!(
        max_connections = config.database_max_connections,
        "connecting to PostgreSQL"
    );
    let store = PgStore::connect(&config.database_url, config.database_max_connections).await?;
    let identity = IdentityClient::new(&config.identity_base_url, &config.identity_api_key)?;

    let mailer: Arc<dyn MailTransport> = match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "SMTP delivery enabled");
            Arc::new(SmtpMailer::new(smtp)?)
        }
        None => {
            warn!("SMTP_HOST not set; notification emails will be discarded");
            Arc::new(DisabledMailer)
        }
    };

    let shutdown = CancellationToken::new();
    let (notifier, queue) = Notifier::channel(QUEUE_CAPACITY);
    let renderer = EmailRenderer::new(config.app_base_url.clone())?;
    let worker = NotificationWorker::new(queue, mailer, renderer);
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    let state = AppState::new(Arc::new(store), Arc::new(identity), notifier);
    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "iProvidence gateway listening (docs at /docs)");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        error!(error = %e, "notification worker panicked");
    }

    served?;
    info!("server stopped");
    Ok(())
}
