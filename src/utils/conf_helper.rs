use tokio::fs;
use std::sync::OnceLock;
use tracing::info;
use crate::models::dashboard_config::DashboardConfig;
use tokio::net::TcpListener;

const CONFIG_PATH: &str = "dashboard.json";

static CONFIG_CACHE: OnceLock<DashboardConfig> = OnceLock::new();

pub async fn init_config_and_bind() -> Result<TcpListener, String> {
    let data = fs::read_to_string(CONFIG_PATH)
        .await
        .map_err(|e| format!("File read Error: {e} {CONFIG_PATH}"))?;

    let mut config = parse_config(&data)?;

    let bind_addr = format!(
        "{}:{}",
        config.connection.ip,
        config.connection.port
    );

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("Bind failed: {e}"))?;

    let actual_port = listener
        .local_addr()
        .map_err(|e| format!("Addr error: {e}"))?
        .port();

    // port 0 in the file means "pick one"
    config.connection.port = actual_port;

    CONFIG_CACHE
        .set(config)
        .map_err(|_| "Config already initialized".to_string())?;

    info!("Config initialized with dynamic port: {}", actual_port);

    Ok(listener)
}

pub fn parse_config(data: &str) -> Result<DashboardConfig, String> {
    let config: DashboardConfig = serde_json::from_str(data)
        .map_err(|e| format!("JSON Parse Error: {e}"))?;

    if !config.backend.offline && config.backend.url.is_empty() {
        return Err("backend.url is required unless backend.offline is set".to_string());
    }

    Ok(config)
}

pub fn get_cached_config() -> &'static DashboardConfig {
    CONFIG_CACHE.get().expect("Config not initialized")
}
