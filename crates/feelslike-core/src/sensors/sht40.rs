use crate::sensors::{MeasurementMode, Reading, SensorError};

use super::Sensor;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use sht4x::{Precision, Sht4xAsync};

pub struct SHT40Sensor<I, D> {
    sensor: Sht4xAsync<I, D>,
    delay: D,
    mode: MeasurementMode,
}

impl<I: I2c, D: DelayNs> SHT40Sensor<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            sensor: Sht4xAsync::<I, D>::new(i2c),
            delay,
            mode: MeasurementMode::default(),
        }
    }
}

impl From<MeasurementMode> for Precision {
    fn from(mode: MeasurementMode) -> Self {
        match mode {
            MeasurementMode::NoHeatHighPrecision => Precision::High,
            MeasurementMode::NoHeatMediumPrecision => Precision::Medium,
            MeasurementMode::NoHeatLowPrecision => Precision::Low,
        }
    }
}

// Implementation for actual I2c devices
impl<I: I2c, D: DelayNs> Sensor for SHT40Sensor<I, D> {
    async fn serial_number(&mut self) -> Result<u32, SensorError> {
        self.sensor
            .serial_number(&mut self.delay)
            .await
            .map_err(|e| {
                log::error!("SHT40 serial number read failed: {:?}", e);
                SensorError::InitializationFailed {
                    sensor: "SHT40",
                    details: "sensor did not answer the serial number request",
                }
            })
    }

    fn set_mode(&mut self, mode: MeasurementMode) {
        self.mode = mode;
    }

    fn mode(&self) -> MeasurementMode {
        self.mode
    }

    async fn measure(&mut self) -> Result<Reading, SensorError> {
        let measurement = self
            .sensor
            .measure(self.mode.into(), &mut self.delay)
            .await
            .map_err(|e| {
                log::error!("SHT40 measurement failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "SHT40",
                    operation: "measure temperature/humidity",
                    details: "I2C communication error or sensor not responding",
                }
            })?;

        Ok(Reading {
            temperature_celsius: measurement.temperature_celsius().to_num::<f32>(),
            relative_humidity_percent: measurement.humidity_percent().to_num::<f32>(),
        })
    }
}
