use actix_web::{middleware::DefaultHeaders, web, App, HttpServer};
use std::time::Duration;
use tracing::{error, info};

use girok_api::config::ApiConfig;
use girok_api::middleware::{PolicyGuard, RequestId};
use girok_api::routes;
use girok_api::state::AppState;
use girok_api::workers::{ConsentSweeper, DsrWorker, OutboxPublisher, SanctionSweeper};
use girok_api::logging;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize configuration
    let config = match ApiConfig::from_env() {
        Ok(config) => {
            if let Err(e) = config.validate() {
                eprintln!("Configuration validation failed: {e}");
                std::process::exit(1);
            }
            config
        }
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    info!(
        "Starting Girok API v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.server_address()
    );

    let app_state = match AppState::new(config.clone()).await {
        Ok(state) => {
            info!("Application state initialized");
            state
        }
        Err(e) => {
            error!("Failed to initialize application state: {e}");
            std::process::exit(1);
        }
    };

    // Required system laws are present after every boot
    match app_state.legal().seed_laws().await {
        Ok(0) => info!("law registry already seeded"),
        Ok(inserted) => info!(inserted, "law registry seeded"),
        Err(e) => {
            error!("Failed to seed law registry: {e}");
            std::process::exit(1);
        }
    }

    if app_state.config.workers.enabled {
        spawn_workers(&app_state);
    } else {
        info!("background workers disabled by configuration");
    }

    let server_state = app_state.clone();
    let cors_origins = app_state.config.cors.allowed_origins.clone();
    let server = HttpServer::new(move || {
        let mut cors = actix_cors::Cors::default()
            .allowed_methods(vec!["GET", "POST", "DELETE", "PATCH", "OPTIONS"])
            .allowed_headers(vec![
                "Content-Type",
                "Authorization",
                "X-Service-Id",
                "X-Operator-Id",
                "X-Subject-Id",
            ])
            .supports_credentials()
            .max_age(3600);
        for origin in &cors_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .app_data(web::Data::new(server_state.clone()))
            .wrap(RequestId)
            .wrap(PolicyGuard)
            .wrap(cors)
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .configure(routes::configure_routes)
    });

    let server = if let Some(workers) = app_state.config.server.workers {
        server.workers(workers)
    } else {
        server
    };

    let server = server.bind(app_state.config.server_address())?;
    let server = server.run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    info!(
        "Girok API ready and listening on {}",
        app_state.config.server_address()
    );

    shutdown_signal().await;
    info!("shutdown signal received");

    // Drain: readiness answers 503 while in-flight requests finish,
    // then workers stop and the server closes gracefully
    app_state.set_ready(false);
    tokio::time::sleep(Duration::from_secs(
        app_state.config.server.shutdown_grace_secs,
    ))
    .await;
    app_state.begin_shutdown();
    server_handle.stop(true).await;

    match server_task.await {
        Ok(Ok(())) => info!("server shut down cleanly"),
        Ok(Err(e)) => error!("server error during shutdown: {e}"),
        Err(e) => error!("failed to join server task: {e}"),
    }

    Ok(())
}

/// Spawn the background workers against the shared state
fn spawn_workers(state: &AppState) {
    let outbox_publisher = OutboxPublisher::new(
        state.outbox().clone(),
        state.bus().clone(),
        Duration::from_secs(state.config.workers.outbox_poll_secs),
        state.shutdown_signal(),
    );
    tokio::spawn(outbox_publisher.run());

    let sanction_sweeper = SanctionSweeper::new(
        state.sanctions().clone(),
        Duration::from_secs(state.config.workers.sanction_sweep_secs),
        state.shutdown_signal(),
    );
    tokio::spawn(sanction_sweeper.run());

    let consent_sweeper = ConsentSweeper::new(state.consents().clone(), state.shutdown_signal());
    tokio::spawn(consent_sweeper.run());

    let dsr_worker = DsrWorker::new(state.dsr().clone(), state.shutdown_signal());
    tokio::spawn(dsr_worker.run());

    info!("background workers started");
}

/// Wait for SIGTERM or Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
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
                error!("failed to install SIGTERM handler: {e}");
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
}
