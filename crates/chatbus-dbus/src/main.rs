use chatbus_dbus::config::LOG_ENV;
use chatbus_dbus::ServiceConfig;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let config = ServiceConfig::from_env()?;

    info!("chatbus-dbus starting on the {} bus", config.bus);
    chatbus_dbus::run_service(&config).await?;

    Ok(())
}
