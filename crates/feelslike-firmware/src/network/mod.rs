//! Adafruit IO connectivity
//!
//! [`AdafruitIoConnector`] performs the single connectivity attempt of a
//! wake: join WiFi, wait for DHCP, resolve the broker, open TCP and TLS,
//! then open the MQTT session. Each failure maps onto a [`ConnectError`]
//! so the cycle can tell an unreachable network from a broken device.

pub mod socket;
pub mod tls;
pub mod wifi;

use core::fmt::Write as _;

use embassy_net::dns::DnsQueryType;
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Duration, with_timeout};
use esp_radio::wifi::WifiController;
use feelslike_core::config::DeviceCredentials;
use feelslike_core::telemetry::mqtt::{ConnectOptions, MqttSession};
use feelslike_core::telemetry::{BROKER_HOST, BROKER_PORT, ConnectError, Connector};
use log::{error, info, warn};

use crate::rng::HardwareRng;
use socket::AsyncTcpSocket;
use tls::{ConnectionBuffers, TlsStream};

/// Upper bound on association plus DHCP.
pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(30);

pub type AdafruitIoSession = MqttSession<TlsStream>;

/// WiFi controller and the network stack running on top of it.
pub struct Radio {
    pub controller: WifiController<'static>,
    pub stack: Stack<'static>,
}

pub struct AdafruitIoConnector {
    radio: Option<Radio>,
    rng: HardwareRng,
}

impl AdafruitIoConnector {
    /// `radio` is `None` when the radio failed to initialise; every connect
    /// attempt then fails with [`ConnectError::Hardware`].
    pub fn new(radio: Option<Radio>, rng: HardwareRng) -> Self {
        Self { radio, rng }
    }

    fn client_id(&mut self) -> heapless::String<24> {
        let mut id = heapless::String::new();
        // 10 + 8 characters always fit.
        let _ = write!(id, "feelslike-{:08x}", rand_core::RngCore::next_u32(&mut self.rng));
        id
    }
}

impl Connector for AdafruitIoConnector {
    type Session = AdafruitIoSession;

    async fn connect(
        &mut self,
        credentials: &DeviceCredentials<'_>,
    ) -> Result<AdafruitIoSession, ConnectError> {
        let client_id = self.client_id();
        let Some(radio) = self.radio.as_mut() else {
            error!("WiFi radio unavailable");
            return Err(ConnectError::Hardware);
        };
        let buffers = ConnectionBuffers::take().ok_or(ConnectError::AlreadyUsed)?;
        let stack = radio.stack;

        with_timeout(NETWORK_TIMEOUT, async {
            wifi::join(&mut radio.controller, credentials).await?;
            wifi::wait_for_ip(stack).await;
            Ok::<(), ConnectError>(())
        })
        .await
        .map_err(|_| {
            warn!("No network after {} s", NETWORK_TIMEOUT.as_secs());
            ConnectError::Timeout
        })??;

        let endpoint = resolve_broker(stack).await?;

        let mut socket = AsyncTcpSocket::new(stack, buffers.tcp_rx, buffers.tcp_tx);
        socket
            .connect(endpoint)
            .await
            .map_err(|_| ConnectError::Socket)?;
        info!("TCP connection established to {}", endpoint);

        let transport = tls::open(
            socket,
            BROKER_HOST,
            buffers.tls_read,
            buffers.tls_write,
            &mut self.rng,
        )
        .await
        .map_err(|_| ConnectError::Tls)?;

        info!("Connecting to Adafruit IO...");
        let options = ConnectOptions::for_credentials(&client_id, credentials);
        let session = MqttSession::open(transport, &options).await?;
        Ok(session)
    }
}

async fn resolve_broker(stack: Stack<'static>) -> Result<IpEndpoint, ConnectError> {
    let addresses = stack
        .dns_query(BROKER_HOST, DnsQueryType::A)
        .await
        .map_err(|e| {
            error!("DNS query for {} failed: {:?}", BROKER_HOST, e);
            ConnectError::Dns
        })?;
    let address = addresses.first().copied().ok_or_else(|| {
        error!("DNS returned no results for {}", BROKER_HOST);
        ConnectError::Dns
    })?;
    let endpoint = IpEndpoint::new(address, BROKER_PORT);
    info!("Resolved {} to {}", BROKER_HOST, endpoint);
    Ok(endpoint)
}
