//! `ctxlink serve` — Start the protocol server.

use ctxlink_config::AppConfig;
use tracing::info;

pub async fn run(
    config: AppConfig,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = apply_overrides(config, host_override, port_override)?;

    println!("🔗 ctxlink server");
    println!("   Listening: ws://{}", config.server.addr());
    println!("   Health:    http://{}/health", config.server.addr());
    info!(
        addr = %config.server.addr(),
        model = %config.model.default_model_id,
        "Starting server"
    );

    ctxlink_gateway::start(config).await?;

    Ok(())
}

/// Command-line flags win over file and environment settings.
fn apply_overrides(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<AppConfig, String> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        if port == 0 {
            return Err("--port must be non-zero".into());
        }
        config.server.port = port;
    }
    Ok(config)
}
