use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use mandal_core::CoreConfig;

/// Main entry point for the Mandal application
///
/// Resolves configuration from the environment (and `.env`), makes sure the order store exists
/// and serves the REST API with Swagger UI at `/swagger-ui`.
///
/// # Environment Variables
/// - `MANDAL_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MANDAL_DATA_DIR`: Directory for order storage (default: "mandal_data")
/// - `API_KEY`: API key for the order endpoints
/// - `UPI_*`, `RECEIPT_*`, `MANDAL_ORG_*`, `TWILIO_*`: see `CoreConfig::from_lookup`
///
/// # Errors
/// Returns an error if configuration is invalid, the order directory cannot be created or the
/// server fails to bind or run.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mandal=info".parse()?)
                .add_directive("mandal_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("MANDAL_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::from_lookup(|key| std::env::var(key).ok())?);
    let orders_dir = cfg.orders_dir();
    std::fs::create_dir_all(&orders_dir)
        .with_context(|| format!("creating order directory {}", orders_dir.display()))?;

    tracing::info!("++ Starting Mandal REST on {}", rest_addr);
    tracing::info!("++ Orders stored under {}", orders_dir.display());

    let app = router(AppState::from_config(cfg, std::env::var("API_KEY").ok())?);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
