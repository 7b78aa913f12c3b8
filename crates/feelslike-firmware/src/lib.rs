//! ESP32-S2 firmware-specific modules for feelslike
//!
//! This crate contains the hardware side of the wake cycle: the Adafruit
//! MagTag's e-paper panel, WiFi and TLS transport to Adafruit IO, the RTC
//! deep-sleep controller, and the settings baked in at build time.

#![no_std]

extern crate alloc;

pub mod epaper;
pub mod network;
pub mod power;
pub mod rng;
pub mod settings;
