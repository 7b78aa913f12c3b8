//! TLS 1.3 transport to the broker
//!
//! Buffers live in static memory: a TLS 1.3 record can carry 16 KiB of
//! plaintext, so the read side must hold a full record plus header and tag.
//! The write side only ever carries the handshake and small MQTT packets.

use embedded_tls::{
    Aes128GcmSha256, CryptoProvider, NoVerify, TlsConfig, TlsConnection, TlsContext, TlsVerifier,
};
use log::{error, info};
use static_cell::ConstStaticCell;

use super::socket::AsyncTcpSocket;

pub const TLS_READ_BUF_SIZE: usize = 16640;
pub const TLS_WRITE_BUF_SIZE: usize = 4096;
pub const TCP_BUF_SIZE: usize = 4096;

static TCP_RX: ConstStaticCell<[u8; TCP_BUF_SIZE]> = ConstStaticCell::new([0; TCP_BUF_SIZE]);
static TCP_TX: ConstStaticCell<[u8; TCP_BUF_SIZE]> = ConstStaticCell::new([0; TCP_BUF_SIZE]);
static TLS_READ: ConstStaticCell<[u8; TLS_READ_BUF_SIZE]> =
    ConstStaticCell::new([0; TLS_READ_BUF_SIZE]);
static TLS_WRITE: ConstStaticCell<[u8; TLS_WRITE_BUF_SIZE]> =
    ConstStaticCell::new([0; TLS_WRITE_BUF_SIZE]);

pub type TlsStream = TlsConnection<'static, AsyncTcpSocket<'static>, Aes128GcmSha256>;

/// Static buffers for the one broker connection of a wake.
pub struct ConnectionBuffers {
    pub tcp_rx: &'static mut [u8; TCP_BUF_SIZE],
    pub tcp_tx: &'static mut [u8; TCP_BUF_SIZE],
    pub tls_read: &'static mut [u8; TLS_READ_BUF_SIZE],
    pub tls_write: &'static mut [u8; TLS_WRITE_BUF_SIZE],
}

impl ConnectionBuffers {
    /// Claim the buffers. Returns `None` once they have been handed out.
    pub fn take() -> Option<Self> {
        Some(Self {
            tcp_rx: TCP_RX.try_take()?,
            tcp_tx: TCP_TX.try_take()?,
            tls_read: TLS_READ.try_take()?,
            tls_write: TLS_WRITE.try_take()?,
        })
    }
}

/// Crypto provider over the hardware RNG.
///
/// Certificates are not verified; embedded-tls has no trust store.
struct HardwareCryptoProvider<'a, RNG> {
    rng: &'a mut RNG,
    verifier: NoVerify,
}

impl<'a, RNG> HardwareCryptoProvider<'a, RNG> {
    fn new(rng: &'a mut RNG) -> Self {
        Self {
            rng,
            verifier: NoVerify,
        }
    }
}

impl<RNG> CryptoProvider for HardwareCryptoProvider<'_, RNG>
where
    RNG: rand_core::CryptoRngCore,
{
    type CipherSuite = Aes128GcmSha256;
    type Signature = &'static [u8];

    fn rng(&mut self) -> impl rand_core::CryptoRngCore {
        &mut *self.rng
    }

    fn verifier(
        &mut self,
    ) -> Result<&mut impl TlsVerifier<Self::CipherSuite>, embedded_tls::TlsError> {
        Ok(&mut self.verifier)
    }
}

/// Run the TLS handshake over a connected socket.
pub async fn open<RNG>(
    socket: AsyncTcpSocket<'static>,
    server_name: &str,
    read_buf: &'static mut [u8],
    write_buf: &'static mut [u8],
    rng: &mut RNG,
) -> Result<TlsStream, embedded_tls::TlsError>
where
    RNG: rand_core::CryptoRngCore,
{
    let config = TlsConfig::new().with_server_name(server_name);
    let mut connection = TlsStream::new(socket, read_buf, write_buf);

    let provider = HardwareCryptoProvider::new(rng);
    connection
        .open(TlsContext::new(&config, provider))
        .await
        .map_err(|e| {
            error!("TLS handshake with {} failed: {:?}", server_name, e);
            e
        })?;

    info!("TLS session established with {}", server_name);
    Ok(connection)
}
