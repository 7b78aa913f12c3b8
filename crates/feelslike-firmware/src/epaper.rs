//! MagTag 2.9" e-paper panel
//!
//! The panel is an SSD1680 driven in landscape. It is brought up on the
//! first refresh, which is also the only refresh of a wake, and put to sleep
//! right after so the image holds while the board is powered down.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use epd_waveshare::epd2in9_v2::{Display2in9, Epd2in9};
use epd_waveshare::prelude::*;
use feelslike_core::display::{Display, TextScreen};
use log::{error, info};
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpaperError {
    #[error("panel already refreshed this wake")]
    AlreadyRefreshed,
    #[error("SPI transfer to the panel failed")]
    Bus,
    #[error("failed to render the frame")]
    Render,
}

struct PanelPins<BUSY, DC, RST> {
    busy: BUSY,
    dc: DC,
    rst: RST,
}

pub struct EpaperDisplay<SPI, BUSY, DC, RST, DELAY> {
    spi: SPI,
    delay: DELAY,
    pins: Option<PanelPins<BUSY, DC, RST>>,
}

impl<SPI, BUSY, DC, RST, DELAY> EpaperDisplay<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    pub fn new(spi: SPI, busy: BUSY, dc: DC, rst: RST, delay: DELAY) -> Self {
        Self {
            spi,
            delay,
            pins: Some(PanelPins { busy, dc, rst }),
        }
    }
}

impl<SPI, BUSY, DC, RST, DELAY> Display for EpaperDisplay<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    type Error = EpaperError;

    async fn show(&mut self, screen: &TextScreen) -> Result<(), EpaperError> {
        let PanelPins { busy, dc, rst } = self.pins.take().ok_or(EpaperError::AlreadyRefreshed)?;

        let mut epd = Epd2in9::new(&mut self.spi, busy, dc, rst, &mut self.delay, None)
            .map_err(|e| {
                error!("Failed to initialise e-paper panel: {:?}", e);
                EpaperError::Bus
            })?;

        let mut frame = Display2in9::default();
        frame.set_rotation(DisplayRotation::Rotate90);
        screen.draw(&mut frame).map_err(|_| EpaperError::Render)?;

        epd.update_and_display_frame(&mut self.spi, frame.buffer(), &mut self.delay)
            .map_err(|e| {
                error!("E-paper refresh failed: {:?}", e);
                EpaperError::Bus
            })?;
        info!("E-paper refreshed");

        epd.sleep(&mut self.spi, &mut self.delay).map_err(|e| {
            error!("Failed to put e-paper panel to sleep: {:?}", e);
            EpaperError::Bus
        })
    }
}
