//! One wake cycle
//!
//! `ValidateConfig -> AttemptConnect -> ReadSensor -> ComputeHeatIndex ->
//! UpdateDisplay -> Publish (online only) -> Sleep`
//!
//! Each wake is a fresh boot, so all state lives in a [`WakeCycle`] that is
//! consumed by [`WakeCycle::run_and_sleep`]. A fatal error skips the remaining
//! steps but never the sleep.

use log::{debug, error, info, warn};
use thiserror_no_std::Error;

use crate::config::{ConfigError, Settings};
use crate::display::{Display, ScreenError, readings_screen};
use crate::heat_index::{DerivedMetrics, within_regression_domain};
use crate::power::{PowerControl, SLEEP_DURATION};
use crate::sensors::{MeasurementMode, Reading, Sensor, SensorError};
use crate::telemetry::{
    ConnectError, Connector, FEED_HEAT_INDEX, FEED_HUMIDITY, FEED_TEMPERATURE, PublishError,
    Telemetry,
};

/// Mode selected before the single measurement.
pub const MEASUREMENT_MODE: MeasurementMode = MeasurementMode::NoHeatHighPrecision;

/// Outcome of the connectivity attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

/// What a completed cycle did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub reading: Reading,
    pub metrics: DerivedMetrics,
    pub connectivity: Connectivity,
    /// Number of feeds published.
    pub published: usize,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("could not lay out the screen: {0}")]
    Layout(#[from] ScreenError),
    #[error("panel refresh failed")]
    Refresh,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("connection error: {0}")]
    Connect(#[from] ConnectError),
    #[error("sensor error: {0}")]
    Sensor(#[from] SensorError),
    #[error("display error: {0}")]
    Display(#[from] DisplayError),
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
}

/// How a wake ended. On hardware `halt` is uninhabited, so a value of this
/// type is never actually produced there.
pub struct Completed<H> {
    pub outcome: Result<CycleReport, CycleError>,
    pub halt: H,
}

/// The collaborators of one wake.
pub struct WakeCycle<C, S, D, P> {
    connector: C,
    sensor: S,
    display: D,
    power: P,
}

impl<C, S, D, P> WakeCycle<C, S, D, P>
where
    C: Connector,
    S: Sensor,
    D: Display,
    P: PowerControl,
{
    pub fn new(connector: C, sensor: S, display: D, power: P) -> Self {
        Self {
            connector,
            sensor,
            display,
            power,
        }
    }

    /// Validate `settings` and only then bring up the collaborators.
    ///
    /// `bring_up` is where hardware and network setup belongs. On a
    /// configuration error it is never called and the device goes straight
    /// back to sleep.
    pub async fn boot<F>(settings: Settings<'_>, mut power: P, bring_up: F) -> Completed<P::Halt>
    where
        F: FnOnce() -> (C, S, D),
    {
        if let Err(e) = settings.validate() {
            let outcome = Err(CycleError::from(e));
            log_outcome(&outcome);
            let halt = sleep(&mut power);
            return Completed { outcome, halt };
        }

        let (connector, sensor, display) = bring_up();
        Self::new(connector, sensor, display, power)
            .complete(settings)
            .await
    }

    /// Run the cycle, then deep-sleep whatever the outcome.
    pub async fn run_and_sleep(self, settings: Settings<'_>) -> P::Halt {
        self.complete(settings).await.halt
    }

    /// Like [`run_and_sleep`](Self::run_and_sleep), but also hands back the
    /// outcome for hosts where the sleep returns.
    pub async fn complete(mut self, settings: Settings<'_>) -> Completed<P::Halt> {
        let outcome = self.run(settings).await;
        log_outcome(&outcome);
        let halt = sleep(&mut self.power);
        Completed { outcome, halt }
    }

    /// Everything up to, but not including, the sleep.
    pub async fn run(&mut self, settings: Settings<'_>) -> Result<CycleReport, CycleError> {
        let credentials = settings.validate()?;

        info!("Connecting to {}", credentials.ssid);
        let mut session = match self.connector.connect(&credentials).await {
            Ok(session) => {
                info!("Connected to Adafruit IO");
                Some(session)
            }
            Err(e) if e.is_connectivity() => {
                warn!("Connection failed ({}), continuing offline", e);
                None
            }
            Err(e) => return Err(e.into()),
        };

        let reading = self.acquire().await?;
        let metrics = DerivedMetrics::from_reading(&reading);
        if !within_regression_domain(&reading) {
            debug!(
                "Heat index extrapolated outside the Rothfusz fit ({:.1} F, {:.1} %)",
                metrics.temperature_fahrenheit, reading.relative_humidity_percent
            );
        }

        let screen = readings_screen(&reading, &metrics).map_err(DisplayError::from)?;
        self.display.show(&screen).await.map_err(|e| {
            error!("Display refresh failed: {:?}", e);
            DisplayError::Refresh
        })?;

        let (connectivity, published) = match session.as_mut() {
            Some(session) => (
                Connectivity::Online,
                publish_readings(session, &reading, &metrics).await?,
            ),
            None => (Connectivity::Offline, 0),
        };

        Ok(CycleReport {
            reading,
            metrics,
            connectivity,
            published,
        })
    }

    async fn acquire(&mut self) -> Result<Reading, SensorError> {
        let serial = self.sensor.serial_number().await?;
        info!("Found SHT4x with serial number {:#x}", serial);

        self.sensor.set_mode(MEASUREMENT_MODE);
        info!("Current mode is: {}", self.sensor.mode().label());

        let reading = self.sensor.measure().await?;
        info!(
            "Measured {:.2} C, {:.2} %",
            reading.temperature_celsius, reading.relative_humidity_percent
        );
        Ok(reading)
    }
}

fn log_outcome(outcome: &Result<CycleReport, CycleError>) {
    match outcome {
        Ok(report) => info!(
            "Cycle complete: {:?}, {} feeds published",
            report.connectivity, report.published
        ),
        Err(e) => error!("Cycle aborted: {}", e),
    }
}

fn sleep<P: PowerControl>(power: &mut P) -> P::Halt {
    info!("Entering deep sleep for {} seconds", SLEEP_DURATION.as_secs());
    power.deep_sleep(SLEEP_DURATION)
}

/// Publish the three feeds in order, stopping at the first failure.
async fn publish_readings<T: Telemetry>(
    session: &mut T,
    reading: &Reading,
    metrics: &DerivedMetrics,
) -> Result<usize, PublishError> {
    let feeds = [
        (FEED_TEMPERATURE, reading.temperature_celsius),
        (FEED_HUMIDITY, reading.relative_humidity_percent),
        (FEED_HEAT_INDEX, metrics.heat_index_fahrenheit),
    ];

    for (feed, value) in feeds {
        session.publish(feed, value).await?;
        debug!("Published {} = {}", feed, value);
    }

    Ok(feeds.len())
}
