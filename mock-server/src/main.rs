use mock_server::MockConfig;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    // An empty MOCK_TOTAL_FIELD disables meta totals.
    let config = match std::env::var("MOCK_TOTAL_FIELD") {
        Ok(field) if field.is_empty() => MockConfig { total_field: None },
        Ok(field) => MockConfig { total_field: Some(field) },
        Err(_) => MockConfig::default(),
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, total_field = ?config.total_field, "listening");
    mock_server::run_with(listener, config).await
}
