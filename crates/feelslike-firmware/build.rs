//! Bakes the device settings into the firmware image.
//!
//! `settings.env` (next to this file) is read at build time and each known
//! key is exported as a compile-time environment variable. Keys already set
//! in the build environment win. Missing keys are not a build error: the
//! firmware reports them on the e-paper log and goes back to sleep.

use std::path::Path;

const SETTINGS_FILE: &str = "settings.env";
const KEYS: [&str; 4] = ["WIFI_SSID", "WIFI_PASSWORD", "AIO_USERNAME", "AIO_KEY"];

fn main() {
    println!("cargo:rustc-link-arg=-Tlinkall.x");
    println!("cargo:rerun-if-changed={SETTINGS_FILE}");
    for key in KEYS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    if !Path::new(SETTINGS_FILE).exists() {
        println!("cargo:warning={SETTINGS_FILE} not found; device will report missing settings");
        return;
    }

    let entries = match dotenvy::from_filename_iter(SETTINGS_FILE) {
        Ok(entries) => entries,
        Err(e) => panic!("failed to read {SETTINGS_FILE}: {e}"),
    };

    for entry in entries {
        let (key, value) = match entry {
            Ok(pair) => pair,
            Err(e) => panic!("malformed line in {SETTINGS_FILE}: {e}"),
        };
        if !KEYS.contains(&key.as_str()) || value.is_empty() {
            continue;
        }
        if std::env::var_os(&key).is_some() {
            continue;
        }
        println!("cargo:rustc-env={key}={value}");
    }
}
