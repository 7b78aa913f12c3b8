//! Minimal MQTT 3.1.1 client session
//!
//! Adafruit IO speaks MQTT 3.1.1, so this module implements just the packets
//! a wake cycle needs: CONNECT, CONNACK and QoS 0 PUBLISH. The session runs
//! over any `embedded-io-async` transport (a TLS connection on the device, an
//! in-memory stream in tests).
//!
//! Wire layout (big-endian, MQTT 3.1.1 section 2 and 3):
//! - fixed header: packet type/flags (1 byte), remaining length (1-4 bytes)
//! - strings: 2 byte length prefix followed by UTF-8 bytes

use core::fmt::Write as _;

use embedded_io::Error as _;
use embedded_io_async::{Read, ReadExactError, Write};
use log::{debug, error, info};
use thiserror_no_std::Error;

use super::{ConnectError, PublishError, Telemetry};
use crate::config::DeviceCredentials;

/// Packet assembly buffer. Holds one CONNECT or PUBLISH packet.
pub const MQTT_BUFFER_SIZE: usize = 512;

/// Keep-alive announced to the broker. A wake cycle is far shorter.
pub const KEEP_ALIVE_SECS: u16 = 60;

const MAX_USERNAME_LEN: usize = 64;
const MAX_TOPIC_LEN: usize = 128;

const PROTOCOL_NAME: &str = "MQTT";
const PROTOCOL_LEVEL_3_1_1: u8 = 0x04;

const PACKET_CONNECT: u8 = 0x10;
const PACKET_CONNACK: u8 = 0x20;
const PACKET_PUBLISH: u8 = 0x30;

const FLAG_USERNAME: u8 = 0x80;
const FLAG_PASSWORD: u8 = 0x40;
const FLAG_CLEAN_SESSION: u8 = 0x02;

/// Largest value the remaining-length field can carry.
const MAX_REMAINING_LENGTH: usize = 268_435_455;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("packet does not fit in the buffer")]
    BufferTooSmall,
    #[error("field longer than 65535 bytes")]
    FieldTooLong,
}

/// CONNACK return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectReturnCode {
    Accepted,
    UnacceptableProtocolVersion,
    IdentifierRejected,
    ServerUnavailable,
    BadUsernameOrPassword,
    NotAuthorized,
}

impl ConnectReturnCode {
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Accepted),
            1 => Some(Self::UnacceptableProtocolVersion),
            2 => Some(Self::IdentifierRejected),
            3 => Some(Self::ServerUnavailable),
            4 => Some(Self::BadUsernameOrPassword),
            5 => Some(Self::NotAuthorized),
            _ => None,
        }
    }
}

/// Fields of a CONNECT packet.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions<'a> {
    pub client_id: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub keep_alive_secs: u16,
}

impl<'a> ConnectOptions<'a> {
    /// Adafruit IO logs in with the account name and the IO key.
    pub fn for_credentials(client_id: &'a str, credentials: &DeviceCredentials<'a>) -> Self {
        Self {
            client_id,
            username: credentials.service_username,
            password: credentials.service_key,
            keep_alive_secs: KEEP_ALIVE_SECS,
        }
    }
}

struct PacketWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> PacketWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put_u8(&mut self, value: u8) -> Result<(), EncodeError> {
        let slot = self.buf.get_mut(self.pos).ok_or(EncodeError::BufferTooSmall)?;
        *slot = value;
        self.pos += 1;
        Ok(())
    }

    fn put_u16(&mut self, value: u16) -> Result<(), EncodeError> {
        self.put_bytes(&value.to_be_bytes())
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        let end = self.pos + bytes.len();
        let dest = self
            .buf
            .get_mut(self.pos..end)
            .ok_or(EncodeError::BufferTooSmall)?;
        dest.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn put_str(&mut self, value: &str) -> Result<(), EncodeError> {
        let len = u16::try_from(value.len()).map_err(|_| EncodeError::FieldTooLong)?;
        self.put_u16(len)?;
        self.put_bytes(value.as_bytes())
    }

    fn put_remaining_length(&mut self, mut len: usize) -> Result<(), EncodeError> {
        if len > MAX_REMAINING_LENGTH {
            return Err(EncodeError::FieldTooLong);
        }
        loop {
            let mut byte = (len % 128) as u8;
            len /= 128;
            if len > 0 {
                byte |= 0x80;
            }
            self.put_u8(byte)?;
            if len == 0 {
                return Ok(());
            }
        }
    }

    fn finish(self) -> usize {
        self.pos
    }
}

/// Encoded size of a length-prefixed string.
const fn str_len(value: &str) -> usize {
    2 + value.len()
}

/// Encode a CONNECT packet into `buf`, returning its length.
pub fn encode_connect(buf: &mut [u8], options: &ConnectOptions<'_>) -> Result<usize, EncodeError> {
    let remaining = str_len(PROTOCOL_NAME)
        + 1 // protocol level
        + 1 // connect flags
        + 2 // keep alive
        + str_len(options.client_id)
        + str_len(options.username)
        + str_len(options.password);

    let mut w = PacketWriter::new(buf);
    w.put_u8(PACKET_CONNECT)?;
    w.put_remaining_length(remaining)?;
    w.put_str(PROTOCOL_NAME)?;
    w.put_u8(PROTOCOL_LEVEL_3_1_1)?;
    w.put_u8(FLAG_USERNAME | FLAG_PASSWORD | FLAG_CLEAN_SESSION)?;
    w.put_u16(options.keep_alive_secs)?;
    w.put_str(options.client_id)?;
    w.put_str(options.username)?;
    w.put_str(options.password)?;
    Ok(w.finish())
}

/// Encode a QoS 0, non-retained PUBLISH packet into `buf`, returning its length.
pub fn encode_publish(buf: &mut [u8], topic: &str, payload: &[u8]) -> Result<usize, EncodeError> {
    let remaining = str_len(topic) + payload.len();

    let mut w = PacketWriter::new(buf);
    w.put_u8(PACKET_PUBLISH)?;
    w.put_remaining_length(remaining)?;
    w.put_str(topic)?;
    w.put_bytes(payload)?;
    Ok(w.finish())
}

/// Decode the 4 byte CONNACK packet.
///
/// Returns `None` if the bytes are not a well-formed CONNACK.
pub fn decode_connack(packet: &[u8; 4]) -> Option<ConnectReturnCode> {
    if packet[0] != PACKET_CONNACK || packet[1] != 0x02 || packet[2] & 0xFE != 0 {
        return None;
    }
    ConnectReturnCode::from_byte(packet[3])
}

/// An open MQTT session over transport `T`.
pub struct MqttSession<T> {
    transport: T,
    username: heapless::String<MAX_USERNAME_LEN>,
    buffer: [u8; MQTT_BUFFER_SIZE],
}

impl<T> MqttSession<T>
where
    T: Read + Write,
{
    /// Send CONNECT over an established transport and wait for CONNACK.
    pub async fn open(mut transport: T, options: &ConnectOptions<'_>) -> Result<Self, ConnectError> {
        let mut username = heapless::String::new();
        username
            .push_str(options.username)
            .map_err(|_| ConnectError::CredentialsTooLong)?;

        let mut buffer = [0u8; MQTT_BUFFER_SIZE];
        let len = encode_connect(&mut buffer, options).map_err(|e| {
            error!("Failed to encode MQTT CONNECT: {}", e);
            ConnectError::CredentialsTooLong
        })?;

        transport
            .write_all(&buffer[..len])
            .await
            .map_err(|e| ConnectError::from_io_kind(e.kind()))?;
        transport
            .flush()
            .await
            .map_err(|e| ConnectError::from_io_kind(e.kind()))?;
        debug!("MQTT CONNECT sent ({} bytes)", len);

        let mut connack = [0u8; 4];
        transport
            .read_exact(&mut connack)
            .await
            .map_err(|e| match e {
                ReadExactError::UnexpectedEof => ConnectError::Closed,
                ReadExactError::Other(e) => ConnectError::from_io_kind(e.kind()),
            })?;

        match decode_connack(&connack) {
            Some(ConnectReturnCode::Accepted) => {
                info!("MQTT session accepted");
                Ok(Self {
                    transport,
                    username,
                    buffer,
                })
            }
            Some(code) => {
                error!("MQTT session refused: {:?}", code);
                Err(ConnectError::Refused(code))
            }
            None => {
                error!("Malformed CONNACK: {:02x?}", connack);
                Err(ConnectError::Protocol)
            }
        }
    }

    /// Give back the underlying transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T> Telemetry for MqttSession<T>
where
    T: Read + Write,
{
    async fn publish(&mut self, feed: &str, value: f32) -> Result<(), PublishError> {
        let mut topic = heapless::String::<MAX_TOPIC_LEN>::new();
        write!(topic, "{}/feeds/{}", self.username, feed).map_err(|_| PublishError::TopicTooLong)?;

        let mut payload = heapless::String::<32>::new();
        write!(payload, "{}", value).map_err(|_| PublishError::PacketTooLarge)?;

        let len = encode_publish(&mut self.buffer, &topic, payload.as_bytes())
            .map_err(|_| PublishError::PacketTooLarge)?;

        self.transport
            .write_all(&self.buffer[..len])
            .await
            .map_err(|e| PublishError::Transport(e.kind()))?;
        self.transport
            .flush()
            .await
            .map_err(|e| PublishError::Transport(e.kind()))?;

        debug!("Published {} to {}", payload, topic);
        Ok(())
    }
}
