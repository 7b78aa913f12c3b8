#[cfg(feature = "sensor-sht40")]
mod sht40;

use thiserror_no_std::Error;

#[cfg(feature = "sensor-sht40")]
pub use sht40::SHT40Sensor;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} initialization failed: {details}")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor} failed to {operation}: {details}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
}

/// One temperature/humidity measurement pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_celsius: f32,
    pub relative_humidity_percent: f32,
}

/// Measurement modes of the SHT4x family that leave the heater off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasurementMode {
    #[default]
    NoHeatHighPrecision,
    NoHeatMediumPrecision,
    NoHeatLowPrecision,
}

impl MeasurementMode {
    /// Diagnostic label, as printed in the datasheet's command table.
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoHeatHighPrecision => "NOHEAT_HIGHPRECISION",
            Self::NoHeatMediumPrecision => "NOHEAT_MEDPRECISION",
            Self::NoHeatLowPrecision => "NOHEAT_LOWPRECISION",
        }
    }
}

/// A bus-attached temperature/humidity sensor.
pub trait Sensor {
    /// Read the factory serial number, for diagnostics.
    fn serial_number(&mut self) -> impl Future<Output = Result<u32, SensorError>>;

    /// Select the mode used by subsequent measurements.
    fn set_mode(&mut self, mode: MeasurementMode);

    fn mode(&self) -> MeasurementMode;

    /// Take exactly one measurement in the current mode.
    fn measure(&mut self) -> impl Future<Output = Result<Reading, SensorError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_high_precision_without_heater() {
        assert_eq!(MeasurementMode::default(), MeasurementMode::NoHeatHighPrecision);
        assert_eq!(MeasurementMode::default().label(), "NOHEAT_HIGHPRECISION");
    }

    #[test]
    fn test_error_messages() {
        use alloc::string::ToString;

        let err = SensorError::ReadFailed {
            sensor: "SHT40",
            operation: "measure temperature/humidity",
            details: "I2C communication error or sensor not responding",
        };
        assert_eq!(
            err.to_string(),
            "SHT40 failed to measure temperature/humidity: \
             I2C communication error or sensor not responding"
        );
    }
}
