//! Power control

use embassy_time::Duration;

/// How long the device sleeps between wakes.
pub const SLEEP_DURATION: Duration = Duration::from_secs(600);

/// Puts the device into deep sleep.
///
/// On hardware `Halt` is [`core::convert::Infallible`]: the call never
/// returns and the next wake is a fresh boot. Host implementations may
/// return to let the caller inspect what happened.
pub trait PowerControl {
    type Halt;

    fn deep_sleep(&mut self, duration: Duration) -> Self::Halt;
}
