// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use elearn_backend::config::Config;
use elearn_backend::routes;
use elearn_backend::services::notify::sender_from_config;
use elearn_backend::services::reminders::{ReminderEngine, spawn_daily};
use elearn_backend::services::storage::LocalDiskStore;
use elearn_backend::state::AppState;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let (config, config_warnings) = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    for warning in &config_warnings {
        tracing::warn!("{}", warning);
    }

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let notifier = sender_from_config(&config).expect("Failed to build mail client");
    if config.mail_api_url.is_none() {
        tracing::info!("MAIL_API_URL not set; reminder emails will only be logged.");
    }

    // Create AppState
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        store: Arc::new(LocalDiskStore::new(&config.media_root)),
        notifier: notifier.clone(),
    };

    // Daily reminder job. Reads progress only; never touches grading state.
    if config.reminder_interval_hours > 0 {
        let engine = Arc::new(ReminderEngine::new(pool.clone(), config.clone(), notifier));
        let period = Duration::from_secs(config.reminder_interval_hours * 3600);
        spawn_daily(engine, period);
        tracing::info!(
            "Study reminders scheduled every {} hour(s)",
            config.reminder_interval_hours
        );
    }

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", config.bind_addr, e));
    tracing::info!("Listening on {}", config.bind_addr);

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}
