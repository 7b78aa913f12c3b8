//! In-memory collaborators shared by the unit tests.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;

use embassy_time::Duration;
use embedded_io::ErrorKind;
use embedded_io_async::{ErrorType, Read, Write};

use crate::config::DeviceCredentials;
use crate::display::{Display, TextScreen};
use crate::power::PowerControl;
use crate::sensors::{MeasurementMode, Reading, Sensor, SensorError};
use crate::telemetry::{ConnectError, Connector, PublishError, Telemetry};

/// Byte stream that replays canned input and records everything written.
#[derive(Default)]
pub struct MemoryStream {
    input: VecDeque<u8>,
    pub written: Vec<u8>,
    pub fail_writes: Option<ErrorKind>,
}

impl MemoryStream {
    pub fn with_input(bytes: &[u8]) -> Self {
        Self {
            input: bytes.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl ErrorType for MemoryStream {
    type Error = ErrorKind;
}

impl Read for MemoryStream {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        while n < buf.len() {
            match self.input.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for MemoryStream {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if let Some(kind) = self.fail_writes {
            return Err(kind);
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Everything the wake cycle asked of its collaborators, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BringUp,
    Connect { ssid: String },
    SerialNumber,
    SetMode(MeasurementMode),
    Measure,
    Show { lines: Vec<String> },
    Publish { feed: String, value: f32 },
    Sleep(Duration),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub struct MockConnector {
    pub log: EventLog,
    pub outcome: Result<(), ConnectError>,
    pub publish_failure: Option<PublishError>,
}

pub struct MockSession {
    log: EventLog,
    publish_failure: Option<PublishError>,
}

impl Connector for MockConnector {
    type Session = MockSession;

    async fn connect(
        &mut self,
        credentials: &DeviceCredentials<'_>,
    ) -> Result<MockSession, ConnectError> {
        self.log.borrow_mut().push(Event::Connect {
            ssid: credentials.ssid.to_string(),
        });
        self.outcome.map(|()| MockSession {
            log: self.log.clone(),
            publish_failure: self.publish_failure,
        })
    }
}

impl Telemetry for MockSession {
    async fn publish(&mut self, feed: &str, value: f32) -> Result<(), PublishError> {
        self.log.borrow_mut().push(Event::Publish {
            feed: feed.to_string(),
            value,
        });
        match self.publish_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub struct MockSensor {
    pub log: EventLog,
    pub reading: Result<Reading, SensorError>,
    pub mode: MeasurementMode,
}

impl Sensor for MockSensor {
    async fn serial_number(&mut self) -> Result<u32, SensorError> {
        self.log.borrow_mut().push(Event::SerialNumber);
        Ok(0x0BAD_CAFE)
    }

    fn set_mode(&mut self, mode: MeasurementMode) {
        self.log.borrow_mut().push(Event::SetMode(mode));
        self.mode = mode;
    }

    fn mode(&self) -> MeasurementMode {
        self.mode
    }

    async fn measure(&mut self) -> Result<Reading, SensorError> {
        self.log.borrow_mut().push(Event::Measure);
        self.reading
    }
}

pub struct MockDisplay {
    pub log: EventLog,
    pub fail: bool,
}

#[derive(Debug)]
pub struct PanelFault;

impl Display for MockDisplay {
    type Error = PanelFault;

    async fn show(&mut self, screen: &TextScreen) -> Result<(), PanelFault> {
        self.log.borrow_mut().push(Event::Show {
            lines: screen
                .lines()
                .iter()
                .map(|line| line.text.as_str().to_string())
                .collect(),
        });
        if self.fail { Err(PanelFault) } else { Ok(()) }
    }
}

pub struct MockPower {
    pub log: EventLog,
}

impl PowerControl for MockPower {
    type Halt = ();

    fn deep_sleep(&mut self, duration: Duration) -> Self::Halt {
        self.log.borrow_mut().push(Event::Sleep(duration));
    }
}
