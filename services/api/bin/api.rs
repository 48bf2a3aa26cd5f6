//! Main Entrypoint for the GoDash API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the database connection pool and running migrations.
//! 3. Resolving the model providers and building the agents.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use godash_api::{config::Config, db::Db, router::create_router, state::AppState};
use godash_core::{
    OrchestratorSettings, TrainingOrchestrator,
    agents::Agents,
    prompts::{PromptBook, load_prompt_dir},
    resolver::{AgentRole, ModelResolver},
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Database ---
    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let db = Arc::new(Db::new(pool));
    db.run_migrations().await?;
    info!("Database connection established and migrations are up-to-date.");

    // --- 4. Initialize Agents ---
    let mut prompts = PromptBook::new(config.content_language.clone());
    if let Some(prompts_path) = &config.prompts_path {
        let overrides = load_prompt_dir(prompts_path).with_context(|| {
            format!("Failed to load prompts from {}", prompts_path.display())
        })?;
        info!(count = overrides.len(), path = %prompts_path.display(), "Prompt overrides loaded");
        prompts = prompts.with_overrides(overrides);
    }

    let resolver = ModelResolver::new(config.models.clone());
    for role in [AgentRole::Actor, AgentRole::Passive] {
        let resolved = resolver.resolve(role);
        info!(
            role = %role,
            model = %resolved.model,
            base_url = %resolved.base_url,
            source = ?resolved.source,
            "Model resolved"
        );
    }
    let agents = Agents::from_resolver(&resolver, Arc::new(prompts), config.generation_timeout);

    let orchestrator = TrainingOrchestrator::new(
        db,
        agents,
        OrchestratorSettings {
            prefetch_content: config.content_prefetch,
        },
    );
    let app_state = Arc::new(AppState { orchestrator });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        language = %config.content_language,
        timeout = ?config.generation_timeout,
        prefetch = config.content_prefetch,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
