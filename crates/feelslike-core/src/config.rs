//! Device settings and credential validation
//!
//! The settings store may be missing any of its keys. [`Settings::validate`]
//! is the only way to obtain [`DeviceCredentials`], so nothing downstream can
//! start a connection with incomplete credentials.

use core::fmt;

use thiserror_no_std::Error;

/// Settings key holding the WiFi network name.
pub const WIFI_SSID_KEY: &str = "WIFI_SSID";
/// Settings key holding the WiFi passphrase.
pub const WIFI_PASSWORD_KEY: &str = "WIFI_PASSWORD";
/// Settings key holding the Adafruit IO user name.
pub const AIO_USERNAME_KEY: &str = "AIO_USERNAME";
/// Settings key holding the Adafruit IO key.
pub const AIO_KEY_KEY: &str = "AIO_KEY";

/// Every key the settings store must provide, in reporting order.
pub const REQUIRED_KEYS: [&str; 4] = [
    WIFI_SSID_KEY,
    WIFI_PASSWORD_KEY,
    AIO_USERNAME_KEY,
    AIO_KEY_KEY,
];

/// Raw view of the settings store. Any value may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings<'a> {
    pub ssid: Option<&'a str>,
    pub password: Option<&'a str>,
    pub service_username: Option<&'a str>,
    pub service_key: Option<&'a str>,
}

impl<'a> Settings<'a> {
    /// Build settings by looking each required key up in some store.
    pub fn lookup<F>(mut get: F) -> Self
    where
        F: FnMut(&str) -> Option<&'a str>,
    {
        Self {
            ssid: get(WIFI_SSID_KEY),
            password: get(WIFI_PASSWORD_KEY),
            service_username: get(AIO_USERNAME_KEY),
            service_key: get(AIO_KEY_KEY),
        }
    }

    /// Check that every required value is present.
    ///
    /// Reports all missing keys at once, not just the first one.
    pub fn validate(self) -> Result<DeviceCredentials<'a>, ConfigError> {
        match (
            self.ssid,
            self.password,
            self.service_username,
            self.service_key,
        ) {
            (Some(ssid), Some(password), Some(service_username), Some(service_key)) => {
                Ok(DeviceCredentials {
                    ssid,
                    password,
                    service_username,
                    service_key,
                })
            }
            _ => {
                let mut missing = MissingKeys::default();
                let present = [
                    self.ssid.is_some(),
                    self.password.is_some(),
                    self.service_username.is_some(),
                    self.service_key.is_some(),
                ];
                for (key, present) in REQUIRED_KEYS.iter().zip(present) {
                    if !present {
                        missing.push(key);
                    }
                }
                Err(ConfigError::MissingSettings { missing })
            }
        }
    }
}

/// Validated credentials for one wake cycle.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DeviceCredentials<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
    pub service_username: &'a str,
    pub service_key: &'a str,
}

// Secrets stay out of logs.
impl fmt::Debug for DeviceCredentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .field("service_username", &self.service_username)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

/// The subset of [`REQUIRED_KEYS`] a settings store failed to provide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingKeys(heapless::Vec<&'static str, 4>);

impl MissingKeys {
    fn push(&mut self, key: &'static str) {
        // Capacity matches REQUIRED_KEYS, so this cannot overflow.
        let _ = self.0.push(key);
    }

    /// Whether `key` was reported missing.
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| *k == key)
    }

    pub fn as_slice(&self) -> &[&'static str] {
        &self.0
    }
}

impl fmt::Display for MissingKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{key}'")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "WiFi and Adafruit IO settings are kept in settings.env, please add them there. \
         The settings file must contain 'WIFI_SSID', 'WIFI_PASSWORD', 'AIO_USERNAME' \
         and 'AIO_KEY' at a minimum (missing: {missing})"
    )]
    MissingSettings { missing: MissingKeys },
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    fn complete() -> Settings<'static> {
        Settings {
            ssid: Some("backyard"),
            password: Some("hunter22"),
            service_username: Some("aio_user"),
            service_key: Some("aio_0123"),
        }
    }

    #[test]
    fn test_complete_settings_validate() {
        let credentials = complete().validate().unwrap();
        assert_eq!(credentials.ssid, "backyard");
        assert_eq!(credentials.password, "hunter22");
        assert_eq!(credentials.service_username, "aio_user");
        assert_eq!(credentials.service_key, "aio_0123");
    }

    #[test]
    fn test_each_missing_key_is_reported() {
        let cases = [
            (Settings { ssid: None, ..complete() }, WIFI_SSID_KEY),
            (Settings { password: None, ..complete() }, WIFI_PASSWORD_KEY),
            (Settings { service_username: None, ..complete() }, AIO_USERNAME_KEY),
            (Settings { service_key: None, ..complete() }, AIO_KEY_KEY),
        ];

        for (settings, key) in cases {
            let ConfigError::MissingSettings { missing } = settings.validate().unwrap_err();
            assert_eq!(missing.as_slice(), &[key]);
        }
    }

    #[test]
    fn test_error_message_names_all_required_keys() {
        let err = Settings::default().validate().unwrap_err();
        let message = err.to_string();
        for key in REQUIRED_KEYS {
            assert!(message.contains(key), "message should name {key}: {message}");
        }

        let ConfigError::MissingSettings { missing } = err;
        assert_eq!(missing.as_slice(), &REQUIRED_KEYS);
    }

    #[test]
    fn test_lookup_reads_required_keys() {
        let settings = Settings::lookup(|key| match key {
            WIFI_SSID_KEY => Some("backyard"),
            AIO_KEY_KEY => Some("aio_0123"),
            _ => None,
        });

        assert_eq!(settings.ssid, Some("backyard"));
        assert_eq!(settings.password, None);
        assert_eq!(settings.service_username, None);
        assert_eq!(settings.service_key, Some("aio_0123"));

        let ConfigError::MissingSettings { missing } = settings.validate().unwrap_err();
        assert!(missing.contains(WIFI_PASSWORD_KEY));
        assert!(missing.contains(AIO_USERNAME_KEY));
        assert!(!missing.contains(WIFI_SSID_KEY));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credentials = complete().validate().unwrap();
        let debug = alloc::format!("{credentials:?}");
        assert!(!debug.contains("hunter22"));
        assert!(!debug.contains("aio_0123"));
        assert!(debug.contains("backyard"));
    }
}
