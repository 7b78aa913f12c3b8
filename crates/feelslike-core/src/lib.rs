//! Hardware-independent core library for feelslike
//!
//! This crate contains all platform-agnostic logic for the feelslike e-paper
//! node: settings validation, the heat index calculation, the sensor,
//! display, telemetry and power traits, the MQTT session used to talk to
//! Adafruit IO, and the wake cycle that ties them together.
//!
//! It is `#![no_std]` so it compiles on both the ESP32-S2 firmware and
//! desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod config;
pub mod cycle;
pub mod display;
pub mod heat_index;
pub mod power;
pub mod sensors;
pub mod telemetry;

#[cfg(test)]
mod testing;
