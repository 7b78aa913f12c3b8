//! Heat index ("feels like") derivation
//!
//! Uses the Rothfusz regression published by the US National Weather Service.
//! The regression is only a good fit at `T >= 80 °F` and `RH >= 40 %`, but it
//! is applied unconditionally. [`within_regression_domain`] lets callers tell
//! when the result is an extrapolation.

use crate::sensors::Reading;

/// Lowest temperature (°F) the regression was fitted for.
pub const REGRESSION_MIN_TEMPERATURE_F: f32 = 80.0;
/// Lowest relative humidity (%) the regression was fitted for.
pub const REGRESSION_MIN_HUMIDITY: f32 = 40.0;

/// Convert degrees Celsius to degrees Fahrenheit.
#[inline]
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

/// Rothfusz heat index in °F from a Celsius temperature and relative humidity.
///
/// No rounding and no range check is performed. The polynomial is evaluated
/// in `f64`; the result is narrowed once.
pub fn heat_index(temperature_celsius: f32, relative_humidity_percent: f32) -> f32 {
    let t = f64::from(temperature_celsius) * 1.8 + 32.0;
    let h = f64::from(relative_humidity_percent);

    let hi = -42.379 + 2.049_015_23 * t + 10.143_331_27 * h
        - 0.224_755_41 * t * h
        - 0.006_837_83 * t * t
        - 0.054_817_17 * h * h
        + 0.001_228_74 * t * t * h
        + 0.000_852_82 * t * h * h
        - 0.000_001_99 * t * t * h * h;
    hi as f32
}

/// Values derived from one [`Reading`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    pub temperature_fahrenheit: f32,
    pub heat_index_fahrenheit: f32,
}

impl DerivedMetrics {
    pub fn from_reading(reading: &Reading) -> Self {
        Self {
            temperature_fahrenheit: celsius_to_fahrenheit(reading.temperature_celsius),
            heat_index_fahrenheit: heat_index(
                reading.temperature_celsius,
                reading.relative_humidity_percent,
            ),
        }
    }
}

/// Whether a reading falls inside the range the regression was fitted for.
pub fn within_regression_domain(reading: &Reading) -> bool {
    celsius_to_fahrenheit(reading.temperature_celsius) >= REGRESSION_MIN_TEMPERATURE_F
        && reading.relative_humidity_percent >= REGRESSION_MIN_HUMIDITY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32, tolerance: f32) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} ± {tolerance}, got {actual}"
        );
    }

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert_close(celsius_to_fahrenheit(0.0), 32.0, 1e-4);
        assert_close(celsius_to_fahrenheit(100.0), 212.0, 1e-3);
        assert_close(celsius_to_fahrenheit(-40.0), -40.0, 1e-4);
        assert_close(celsius_to_fahrenheit(35.0), 95.0, 1e-4);
    }

    #[test]
    fn test_known_values() {
        // 95 °F at 50 % is the textbook ~105 °F case.
        assert_close(heat_index(35.0, 50.0), 105.216, 0.01);
        assert_close(heat_index(30.0, 70.0), 95.068, 0.01);
        assert_close(heat_index(20.0, 40.0), 77.359, 0.01);
    }

    #[test]
    fn test_heat_index_is_deterministic() {
        let inputs = [(35.0, 50.0), (22.5, 45.3), (-5.0, 90.0), (41.2, 12.0)];
        for (t, h) in inputs {
            assert_eq!(heat_index(t, h).to_bits(), heat_index(t, h).to_bits());
        }
    }

    #[test]
    fn test_applied_outside_regression_domain() {
        // Cold and dry inputs are still run through the polynomial as-is.
        assert_close(heat_index(0.0, 0.0), 16.188, 0.01);
        assert_close(heat_index(-10.0, 80.0), 287.061, 0.05);
    }

    #[test]
    fn test_one_decimal_rounding_matches_double_precision() {
        // 853.35000357 in f64; an all-f32 evaluation lands just below .35.
        let hi = heat_index(-40.0, 65.7);
        assert_eq!(alloc::format!("{:.1}", hi), "853.4");
        assert!(hi > 853.35);
    }

    #[test]
    fn test_derived_metrics_from_reading() {
        let reading = Reading {
            temperature_celsius: 35.0,
            relative_humidity_percent: 50.0,
        };
        let metrics = DerivedMetrics::from_reading(&reading);

        assert_close(metrics.temperature_fahrenheit, 95.0, 1e-4);
        assert_eq!(
            metrics.heat_index_fahrenheit.to_bits(),
            heat_index(35.0, 50.0).to_bits()
        );
        assert!(within_regression_domain(&reading));
    }

    #[test]
    fn test_regression_domain_bounds() {
        let cool = Reading {
            temperature_celsius: 20.0,
            relative_humidity_percent: 60.0,
        };
        assert!(!within_regression_domain(&cool));

        let dry = Reading {
            temperature_celsius: 35.0,
            relative_humidity_percent: 20.0,
        };
        assert!(!within_regression_domain(&dry));

        let edge = Reading {
            temperature_celsius: 30.0,
            relative_humidity_percent: 40.0,
        };
        assert!(within_regression_domain(&edge));
    }
}
