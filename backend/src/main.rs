use sqlx::sqlite::SqlitePoolOptions;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verbotron::GameSettings;
use verbotron::config::Config;
use verbotron::game::engine::{ChatModel, SentenceApi};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    let addr = config.addr();

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!().run(&pool).await?;

    let model = match &config.judge.api_key {
        Some(key) => {
            let model = ChatModel::new(
                key,
                &config.judge.base_url,
                &config.judge.model,
                config.judge.timeout,
            )?;
            tracing::info!(model = %config.judge.model, "Remote judging enabled");
            Some(Arc::new(model))
        }
        None => {
            tracing::warn!("JUDGE_API_KEY not set, free-text modes are judged locally");
            None
        }
    };

    let sentence_api = match &config.sentence_api_url {
        Some(url) => {
            tracing::info!(url = %url, "Fetching sentences from remote service");
            Some(SentenceApi::new(url, Duration::from_secs(10))?)
        }
        None => None,
    };

    let settings = GameSettings {
        data_dir: config.data_dir.clone().into(),
        sentence_api,
        model,
        session: config.session.clone(),
    };

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, verbotron::app_with_config(pool, settings))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
