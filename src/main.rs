use std::process;
use std::sync::Arc;

use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use vetrina::{
    application::{
        admin::AdminContentService, catalog::CatalogService, error::AppError,
        interactions::InteractionService,
    },
    cache::{CacheConfig, CacheTrigger, QueryCache, Sweep, spawn_sweeper},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AppState, rate_limit::RateLimiter},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn connect_pool(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let url = settings.database.url.as_deref().ok_or_else(|| {
        AppError::unexpected("no database URL configured; set database.url or --database-url")
    })?;

    PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::Infra(InfraError::Database(err)))
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::Infra(InfraError::Database(err)))?;
    info!("migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::Infra(InfraError::Database(err)))?;

    let db = Arc::new(PostgresRepositories::new(pool));

    let cache = Arc::new(QueryCache::new(CacheConfig::from(&settings.cache)));
    let trigger = Arc::new(CacheTrigger::new(cache.clone()));

    let catalog = Arc::new(CatalogService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        cache.clone(),
    ));
    let interactions = Arc::new(InteractionService::new(db.clone(), db.clone()));
    let admin = Arc::new(AdminContentService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        trigger,
    ));

    let rate_limiter = Arc::new(RateLimiter::new(
        std::time::Duration::from_secs(settings.rate_limit.window_seconds.get().into()),
        settings.rate_limit.max_requests.get(),
    ));

    let sweep_targets: Vec<Arc<dyn Sweep>> = vec![
        cache.clone() as Arc<dyn Sweep>,
        rate_limiter.clone() as Arc<dyn Sweep>,
    ];
    let sweeper = spawn_sweeper(sweep_targets, settings.sweep.cadence);

    let state = AppState {
        catalog,
        interactions,
        admin,
        users: db.clone(),
        health: db.clone(),
        rate_limiter,
    };

    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::Infra(InfraError::server(err.to_string())))?;

    info!(addr = %settings.server.addr, "vetrina listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
    .await
    .map_err(|err| AppError::Infra(InfraError::server(err.to_string())))?;

    sweeper.abort();
    info!("vetrina stopped");
    Ok(())
}

async fn shutdown_signal(drain: std::time::Duration) {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                error!(error = %error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!(drain_seconds = drain.as_secs(), "shutdown signal received");
}
