//! Device settings baked in by `build.rs`.

use feelslike_core::config::Settings;

/// Settings as captured at build time. Absent keys stay `None`.
pub fn build_settings() -> Settings<'static> {
    Settings {
        ssid: non_empty(option_env!("WIFI_SSID")),
        password: non_empty(option_env!("WIFI_PASSWORD")),
        service_username: non_empty(option_env!("AIO_USERNAME")),
        service_key: non_empty(option_env!("AIO_KEY")),
    }
}

fn non_empty(value: Option<&'static str>) -> Option<&'static str> {
    value.filter(|v| !v.is_empty())
}
