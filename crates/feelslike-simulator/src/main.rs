//! Desktop simulator for one feelslike wake cycle.
//!
//! Runs the real [`WakeCycle`] against simulated hardware: the sensor returns
//! the reading given on the command line, the e-paper screen is written to
//! `feelslike-screen.png`, and the MQTT session talks to an in-process broker
//! that logs every PUBLISH. Settings come from `settings.env` and the
//! environment, exactly as the firmware expects them.
//!
//! ```text
//! feelslike-simulator [TEMP_C] [HUMIDITY] [--offline]
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use embassy_time::Duration;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay};
use embedded_io_async::{ErrorType, Read, Write};
use log::{debug, info, warn};

use feelslike_core::config::{DeviceCredentials, REQUIRED_KEYS, Settings};
use feelslike_core::cycle::{Completed, CycleError, CycleReport, WakeCycle};
use feelslike_core::display::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Display, TextScreen};
use feelslike_core::power::PowerControl;
use feelslike_core::sensors::{MeasurementMode, Reading, Sensor, SensorError};
use feelslike_core::telemetry::mqtt::{ConnectOptions, MqttSession};
use feelslike_core::telemetry::{ConnectError, Connector};

/// Where the rendered screen is written.
const SCREEN_PATH: &str = "feelslike-screen.png";

/// Pixel scale factor for the output image.
const IMAGE_SCALE: u32 = 2;

const DEFAULT_READING: Reading = Reading {
    temperature_celsius: 35.0,
    relative_humidity_percent: 50.0,
};

struct Args {
    reading: Reading,
    offline: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut numbers = Vec::new();
    let mut offline = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--offline" => offline = true,
            "-h" | "--help" => {
                return Err("usage: feelslike-simulator [TEMP_C] [HUMIDITY] [--offline]".into());
            }
            value => numbers.push(
                value
                    .parse::<f32>()
                    .map_err(|_| format!("not a number: {value}"))?,
            ),
        }
    }

    let reading = match numbers.as_slice() {
        [] => DEFAULT_READING,
        [t] => Reading {
            temperature_celsius: *t,
            ..DEFAULT_READING
        },
        [t, h] => Reading {
            temperature_celsius: *t,
            relative_humidity_percent: *h,
        },
        _ => return Err("expected at most two numbers: TEMP_C HUMIDITY".into()),
    };

    Ok(Args { reading, offline })
}

/// Settings from `settings.env`, overridden by the process environment.
fn load_settings() -> HashMap<&'static str, String> {
    match dotenvy::from_filename("settings.env") {
        Ok(path) => info!("Loaded settings from {}", path.display()),
        Err(e) => debug!("No settings.env loaded: {}", e),
    }

    REQUIRED_KEYS
        .iter()
        .filter_map(|&key| {
            std::env::var(key)
                .ok()
                .filter(|value| !value.is_empty())
                .map(|value| (key, value))
        })
        .collect()
}

struct SimulatedSensor {
    reading: Reading,
    mode: MeasurementMode,
}

impl Sensor for SimulatedSensor {
    async fn serial_number(&mut self) -> Result<u32, SensorError> {
        Ok(0x5EED_0001)
    }

    fn set_mode(&mut self, mode: MeasurementMode) {
        self.mode = mode;
    }

    fn mode(&self) -> MeasurementMode {
        self.mode
    }

    async fn measure(&mut self) -> Result<Reading, SensorError> {
        Ok(self.reading)
    }
}

struct PngDisplay {
    display: SimulatorDisplay<BinaryColor>,
    path: PathBuf,
}

impl PngDisplay {
    fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            display: SimulatorDisplay::new(Size::new(DISPLAY_WIDTH, DISPLAY_HEIGHT)),
            path: path.into(),
        }
    }
}

impl Display for PngDisplay {
    type Error = io::Error;

    async fn show(&mut self, screen: &TextScreen) -> Result<(), io::Error> {
        let Ok(()) = screen.draw(&mut self.display);

        let settings = OutputSettingsBuilder::new()
            .theme(BinaryColorTheme::LcdWhite)
            .scale(IMAGE_SCALE)
            .build();
        self.display
            .to_rgb_output_image(&settings)
            .save_png(&self.path)
            .map_err(io::Error::other)?;

        for line in screen.lines() {
            info!("screen | {}", line.text);
        }
        info!("Screen written to {}", self.path.display());
        Ok(())
    }
}

/// In-process broker: accepts every session and logs each PUBLISH.
#[derive(Default)]
struct LoopbackBroker {
    pending: Vec<u8>,
}

impl ErrorType for LoopbackBroker {
    type Error = Infallible;
}

impl Read for LoopbackBroker {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

impl Write for LoopbackBroker {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        match buf.first().map(|b| b >> 4) {
            // CONNECT: answer with CONNACK, session accepted
            Some(1) => self.pending.extend_from_slice(&[0x20, 0x02, 0x00, 0x00]),
            Some(3) => log_publish(buf),
            _ => debug!("broker <- {:02x?}", buf),
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Topic and payload of a QoS 0 PUBLISH small enough for a one-byte length.
fn log_publish(packet: &[u8]) {
    let [_, _, hi, lo, rest @ ..] = packet else {
        return;
    };
    let topic_len = usize::from(u16::from_be_bytes([*hi, *lo]));
    if topic_len > rest.len() {
        return;
    }
    let (topic, payload) = rest.split_at(topic_len);
    info!(
        "broker <- PUBLISH {} = {}",
        String::from_utf8_lossy(topic),
        String::from_utf8_lossy(payload)
    );
}

struct SimulatedConnector {
    offline: bool,
}

impl Connector for SimulatedConnector {
    type Session = MqttSession<LoopbackBroker>;

    async fn connect(
        &mut self,
        credentials: &DeviceCredentials<'_>,
    ) -> Result<Self::Session, ConnectError> {
        if self.offline {
            warn!("Simulating unreachable network {}", credentials.ssid);
            return Err(ConnectError::Association);
        }
        info!("Connected to {}!", credentials.ssid);
        let options = ConnectOptions::for_credentials("feelslike-simulator", credentials);
        MqttSession::open(LoopbackBroker::default(), &options).await
    }
}

struct SimulatedPower;

impl PowerControl for SimulatedPower {
    type Halt = Duration;

    fn deep_sleep(&mut self, duration: Duration) -> Duration {
        info!("(deep sleep for {} s skipped)", duration.as_secs());
        duration
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let values = load_settings();
    let settings = Settings::lookup(|key| values.get(key).map(String::as_str));

    exit_code(&run_cycle(&args, settings).outcome)
}

/// One wake against the simulated collaborators.
fn run_cycle(args: &Args, settings: Settings<'_>) -> Completed<Duration> {
    embassy_futures::block_on(WakeCycle::boot(settings, SimulatedPower, || {
        (
            SimulatedConnector {
                offline: args.offline,
            },
            SimulatedSensor {
                reading: args.reading,
                mode: MeasurementMode::default(),
            },
            PngDisplay::new(SCREEN_PATH),
        )
    }))
}

fn exit_code(outcome: &Result<CycleReport, CycleError>) -> ExitCode {
    match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
