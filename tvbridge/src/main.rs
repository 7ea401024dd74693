//! Daemon entry point.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tvbridge::config::BridgeConfig;
use tvbridge::runtime::Bridge;
use tvbridge::shutdown::{self, Shutdown};
use tvbridge_device::loopback::LoopbackScanner;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match BridgeConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            return ExitCode::from(1);
        }
    };

    init_tracing(&config.log_level);
    info!(
        device = %config.device_id,
        broker = %config.mqtt_host,
        base_topic = %config.base_topic,
        "tvbridge starting"
    );

    let shutdown = Shutdown::new();
    shutdown::install_signal_handlers(&shutdown);

    // Protocol backends plug in through the DeviceScanner trait; the
    // loopback backend stands in until one is wired up.
    let scanner = LoopbackScanner::single(&config.device_id, &config.device_address);

    match Bridge::new(config, scanner).run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "bridge exited with a fatal error");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
