//! Telemetry service collaborators
//!
//! Readings go to Adafruit IO. A [`Connector`] performs the whole
//! connectivity attempt (network association through the service handshake)
//! and hands back a [`Telemetry`] session, or a [`ConnectError`] that says
//! whether the device should carry on offline.

pub mod mqtt;

use embedded_io::ErrorKind;
use thiserror_no_std::Error;

use crate::config::DeviceCredentials;
use mqtt::ConnectReturnCode;

/// Fixed telemetry broker.
pub const BROKER_HOST: &str = "io.adafruit.com";
/// MQTT over TLS.
pub const BROKER_PORT: u16 = 8883;

pub const FEED_TEMPERATURE: &str = "temperature";
pub const FEED_HUMIDITY: &str = "humidity";
pub const FEED_HEAT_INDEX: &str = "heatindex";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectError {
    #[error("WiFi association failed")]
    Association,
    #[error("timed out waiting for the network")]
    Timeout,
    #[error("DNS lookup for the broker failed")]
    Dns,
    #[error("TCP connection to the broker failed")]
    Socket,
    #[error("TLS handshake failed")]
    Tls,
    #[error("connection closed by the broker")]
    Closed,
    #[error("broker refused the session: {0:?}")]
    Refused(ConnectReturnCode),
    #[error("radio hardware unavailable")]
    Hardware,
    #[error("credentials do not fit the session buffers")]
    CredentialsTooLong,
    #[error("malformed response from the broker")]
    Protocol,
    #[error("connector already used this wake")]
    AlreadyUsed,
}

impl ConnectError {
    /// Whether this is an expected offline condition rather than a fault.
    ///
    /// Connectivity errors send the cycle into offline mode; everything else
    /// is fatal.
    pub const fn is_connectivity(&self) -> bool {
        match self {
            Self::Association
            | Self::Timeout
            | Self::Dns
            | Self::Socket
            | Self::Tls
            | Self::Closed
            | Self::Refused(_) => true,
            Self::Hardware | Self::CredentialsTooLong | Self::Protocol | Self::AlreadyUsed => false,
        }
    }

    pub(crate) fn from_io_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Closed,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    #[error("feed topic does not fit the topic buffer")]
    TopicTooLong,
    #[error("publish packet does not fit the session buffer")]
    PacketTooLarge,
    #[error("transport error while publishing: {0:?}")]
    Transport(ErrorKind),
}

/// An open session with the telemetry service.
pub trait Telemetry {
    /// Publish one numeric value to a named feed. Fire and forget.
    fn publish(&mut self, feed: &str, value: f32)
    -> impl Future<Output = Result<(), PublishError>>;
}

/// Performs the single connectivity attempt of a wake cycle.
pub trait Connector {
    type Session: Telemetry;

    fn connect(
        &mut self,
        credentials: &DeviceCredentials<'_>,
    ) -> impl Future<Output = Result<Self::Session, ConnectError>>;
}
