mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::context::AppContext;
use crate::core::middleware;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::features::ads::handlers::AdState;
use crate::features::ads::{
    routes as ads_routes, AdLifecycleService, AdRepository, ExpirySweeper, PgAdRepository,
};
use crate::features::health::handlers::HealthState;
use crate::features::health::{routes as health_routes, HealthService};
use axum::Router;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Parser, Debug)]
#[command(name = "smartpole-ads", about = "SmartPole advertisement service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Deactivate every expired ad once, then exit.
    SweepExpired,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli, worker_threads))
}

async fn async_main(cli: Cli, worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    tracing::info!("Configuration loaded successfully");

    let ctx = AppContext::startup(config).await?;

    let repository: Arc<dyn AdRepository> = Arc::new(PgAdRepository::new(ctx.pool.clone()));
    let sweeper = Arc::new(ExpirySweeper::new(Arc::clone(&repository)));

    match cli.command.unwrap_or(Command::Serve) {
        Command::SweepExpired => {
            let result = sweeper.sweep_once(Utc::now()).await;
            ctx.shutdown().await;

            let report = result?;
            tracing::info!(
                "Sweep finished: scanned={}, deactivated={}, skipped={}, failed={}",
                report.scanned,
                report.deactivated,
                report.skipped,
                report.failed
            );
            Ok(())
        }
        Command::Serve => serve(ctx, repository, sweeper).await,
    }
}

async fn serve(
    ctx: AppContext,
    repository: Arc<dyn AdRepository>,
    sweeper: Arc<ExpirySweeper>,
) -> anyhow::Result<()> {
    let config = &ctx.config;

    let ad_service = Arc::new(AdLifecycleService::new(
        Arc::clone(&repository),
        Arc::clone(&ctx.stager),
    ));
    tracing::info!("Ad lifecycle service initialized");

    let health_service = Arc::new(HealthService::new(
        Arc::clone(&repository),
        Arc::clone(&ctx.stager),
    ));
    tracing::info!("Health service initialized");

    // Background expiry sweeper, stopped through the watch channel on shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = match config.sweeper.interval {
        Some(period) => {
            let sweeper = Arc::clone(&sweeper);
            let handle = tokio::spawn(async move {
                sweeper.run(period, shutdown_rx).await;
            });
            tracing::info!("Expiry sweeper worker spawned");
            Some(handle)
        }
        None => {
            tracing::info!("Expiry sweeper disabled (EXPIRY_SWEEP_INTERVAL_SECS=0)");
            None
        }
    };

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger =
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi));

    let ad_state = AdState {
        service: ad_service,
        sweeper,
        public_base_url: config.app.public_base_url.clone(),
    };
    let health_state = HealthState {
        service: health_service,
        public_base_url: config.app.public_base_url.clone(),
    };

    let app = Router::new()
        .merge(swagger)
        .merge(ads_routes::routes(ad_state, &ctx.stager))
        .merge(health_routes::routes(health_state))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    let addr = config.app.server_address();
    let listener = bind_listener(&addr)?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, draining background work");
    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweeper_handle {
        if let Err(e) = handle.await {
            tracing::error!("Expiry sweeper task failed: {}", e);
        }
    }

    ctx.shutdown().await;
    Ok(())
}

/// TCP listener tuned through socket2
fn bind_listener(addr: &str) -> anyhow::Result<tokio::net::TcpListener> {
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    Ok(tokio::net::TcpListener::from_std(socket.into())?)
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
