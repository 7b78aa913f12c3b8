//! WiFi association and DHCP

use embassy_net::Stack;
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController};
use feelslike_core::config::DeviceCredentials;
use feelslike_core::telemetry::ConnectError;
use log::{debug, error, info};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Configure station mode and join the access point. One attempt only.
pub async fn join(
    controller: &mut WifiController<'static>,
    credentials: &DeviceCredentials<'_>,
) -> Result<(), ConnectError> {
    let client_config = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(credentials.ssid.into())
            .with_password(credentials.password.into()),
    );
    controller.set_config(&client_config).map_err(|e| {
        error!("Failed to configure WiFi: {:?}", e);
        ConnectError::Hardware
    })?;

    if !matches!(controller.is_started(), Ok(true)) {
        controller.start_async().await.map_err(|e| {
            error!("Failed to start WiFi: {:?}", e);
            ConnectError::Hardware
        })?;
        debug!("WiFi started");
    }

    controller.connect_async().await.map_err(|e| {
        error!("Failed to join {}: {:?}", credentials.ssid, e);
        ConnectError::Association
    })?;
    info!("Connected to {}!", credentials.ssid);
    Ok(())
}

/// Wait for link up and a DHCP lease. Callers bound this with a timeout.
pub async fn wait_for_ip(stack: Stack<'static>) {
    while !stack.is_link_up() {
        Timer::after(POLL_INTERVAL).await;
    }
    debug!("Link up");

    loop {
        if let Some(config) = stack.config_v4() {
            info!("Got IP: {}", config.address);
            return;
        }
        Timer::after(POLL_INTERVAL).await;
    }
}
