use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use voicematters::api;
use voicematters::config::Config;
use voicematters::host::rest::CommandTarget;
use voicematters::host::MattermostClient;
use voicematters::livekit::LiveKitClient;
use voicematters::plugin::Plugin;
use voicematters::state::AppState;
use voicematters::store::ConfigStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging; LOG_FORMAT=json for log shippers
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");
    tracing_subscriber::registry()
        .with((!json_logs).then(|| fmt::layer()))
        .with(json_logs.then(|| fmt::layer().json()))
        .with(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting VoiceMatters...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        host = %config.server_host,
        port = %config.server_port,
        mattermost = %config.mattermost_url,
        plugin_id = %config.plugin_id,
        "Configuration loaded"
    );

    let timeout = Duration::from_secs(config.request_timeout_seconds);
    let http = reqwest::Client::builder().timeout(timeout).build()?;

    let mut host = MattermostClient::new(
        http.clone(),
        &config.mattermost_url,
        &config.mattermost_token,
        &config.plugin_id,
    );
    if let (Some(team_id), Some(url)) = (config.team_id.clone(), config.command_url()) {
        host = host.with_command_target(CommandTarget { team_id, url });
    } else {
        tracing::warn!("TEAM_ID or PUBLIC_URL not set, slash command registration will fail");
    }

    let settings = ConfigStore::default();
    let rooms = LiveKitClient::new(http, settings.clone());
    let state = AppState::new(config.clone(), settings, Arc::new(host), Arc::new(rooms));
    let plugin = Arc::new(Plugin::new(state.clone()));

    // The host delivers configuration before activation.
    plugin.on_configuration_change().await?;
    plugin.on_activate().await?;

    #[cfg(unix)]
    tokio::spawn(reload_on_hangup(plugin.clone()));

    if config.is_exposed() && config.proxy_secret.is_none() {
        tracing::warn!(
            host = %config.server_host,
            "listening beyond loopback without PLUGIN_PROXY_SECRET, caller identity can be forged"
        );
    }

    // Build router. Browsers reach the plugin routes through the Mattermost
    // origin, so no CORS layer.
    let app = Router::new()
        .merge(api::create_router(state))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, prefix = %config.route_prefix(), "Server listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    plugin.on_deactivate().await?;
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Re-read plugin settings from the host on SIGHUP.
#[cfg(unix)]
async fn reload_on_hangup(plugin: Arc<Plugin>) {
    let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGHUP handler");
            return;
        }
    };

    while hangup.recv().await.is_some() {
        tracing::info!("Received SIGHUP, reloading plugin settings...");
        if let Err(e) = plugin.on_configuration_change().await {
            tracing::error!(error = %e, "Failed to reload plugin settings");
        }
    }
}

/// Handle shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down...");
        },
    }
}
