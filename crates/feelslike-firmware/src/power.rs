//! RTC deep sleep

use core::convert::Infallible;
use core::time::Duration as CoreDuration;

use embassy_time::Duration;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::rtc_cntl::sleep::TimerWakeupSource;
use feelslike_core::power::{PowerControl, SLEEP_DURATION};
use log::debug;

pub struct RtcPower<'d> {
    rtc: Rtc<'d>,
}

impl<'d> RtcPower<'d> {
    pub fn new(rtc: Rtc<'d>) -> Self {
        Self { rtc }
    }
}

impl PowerControl for RtcPower<'_> {
    type Halt = Infallible;

    fn deep_sleep(&mut self, duration: Duration) -> Infallible {
        debug!("Arming RTC wake-up in {} s", duration.as_secs());
        let timer = TimerWakeupSource::new(CoreDuration::from_micros(duration.as_micros()));
        self.rtc.sleep_deep(&[&timer])
    }
}

/// Deep sleep from a context that no longer owns the RTC, such as the panic
/// handler. Waking reboots into a fresh cycle.
pub fn sleep_after_panic() -> ! {
    // SAFETY: called only once the firmware has stopped using the RTC.
    let lpwr = unsafe { esp_hal::peripherals::LPWR::steal() };
    let mut rtc = Rtc::new(lpwr);
    let timer = TimerWakeupSource::new(CoreDuration::from_micros(SLEEP_DURATION.as_micros()));
    rtc.sleep_deep(&[&timer])
}
