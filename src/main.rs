use neocrm::config::ServerConfig;
use neocrm::{routes, state};

#[tokio::main]
async fn main() {
    // A missing .env is fine; real deployments set the environment directly.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();
    match &config.api_url {
        Ok(url) => tracing::info!(%url, "external api configured"),
        Err(e) => tracing::warn!(error = %e, "external api not configured; routes will answer 500"),
    }

    let state = state::AppState::new(&config);
    let app = routes::app(state);

    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "neocrm listening");
    axum::serve(listener, app).await.expect("server failed");
}
