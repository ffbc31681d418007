use recipebox::{config::Config, db, routes, state::AppState};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load environment. Silently ignores a missing .env.
    dotenvy::dotenv().ok();

    // 2. Error reporting. Sentry stays disabled unless SENTRY_DSN is set. The guard has to live as long as main.
    let _guard = sentry::init((std::env::var("SENTRY_DSN").ok(), sentry::ClientOptions {
        release: sentry::release_name!(),
        traces_sample_rate: 1.0,
        ..Default::default()
    }));

    // 3. TLS provider. Must happen before any TLS connection (database, sentry).
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // 4. Logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "recipebox=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    tracing::info!("Starting Recipe Box API...");

    // 5. Config, validated before anything binds
    let config = Config::from_env()?;

    // 6. Store. Runs migrations before handing back the pool.
    let db = db::connect(&config).await?;
    tracing::info!("Store ready");

    // 7. Serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(db, config);
    let app = routes::create_routes(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
