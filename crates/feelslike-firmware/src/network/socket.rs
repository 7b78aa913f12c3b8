//! TCP socket adapter for the TLS layer
//!
//! `embedded-tls` drives its transport through the `embedded-io-async` 0.7
//! traits, which `embassy_net::tcp::TcpSocket` does not implement directly.

use embassy_net::tcp::{self, ConnectError as TcpConnectError, TcpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::Duration;
use embedded_io::ErrorKind;
use embedded_io_async::{ErrorType, Read, Write};
use log::error;
use thiserror_no_std::Error;

/// Idle timeout applied to the broker socket.
pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketError {
    #[error("connection reset by peer")]
    Reset,
    #[error("connection refused or unreachable")]
    Unreachable,
    #[error("socket timed out")]
    TimedOut,
}

impl embedded_io::Error for SocketError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Reset => ErrorKind::ConnectionReset,
            Self::Unreachable => ErrorKind::ConnectionRefused,
            Self::TimedOut => ErrorKind::TimedOut,
        }
    }
}

impl From<tcp::Error> for SocketError {
    fn from(_: tcp::Error) -> Self {
        // ConnectionReset is the only variant embassy-net reports here.
        Self::Reset
    }
}

impl From<TcpConnectError> for SocketError {
    fn from(err: TcpConnectError) -> Self {
        match err {
            TcpConnectError::TimedOut => Self::TimedOut,
            _ => Self::Unreachable,
        }
    }
}

pub struct AsyncTcpSocket<'a> {
    socket: TcpSocket<'a>,
}

impl<'a> AsyncTcpSocket<'a> {
    pub fn new(stack: Stack<'a>, rx_buffer: &'a mut [u8], tx_buffer: &'a mut [u8]) -> Self {
        let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        Self { socket }
    }

    pub async fn connect(&mut self, endpoint: IpEndpoint) -> Result<(), SocketError> {
        self.socket.connect(endpoint).await.map_err(|e| {
            error!("TCP connect to {} failed: {:?}", endpoint, e);
            SocketError::from(e)
        })
    }
}

impl ErrorType for AsyncTcpSocket<'_> {
    type Error = SocketError;
}

impl Read for AsyncTcpSocket<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.socket.read(buf).await?)
    }
}

impl Write for AsyncTcpSocket<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(self.socket.write(buf).await?)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(self.socket.flush().await?)
    }
}
