//! Text screen for the e-paper panel
//!
//! The panel shows a handful of text lines at fixed positions. Lines are
//! registered once with [`TextScreen::add_text`] and filled with
//! [`TextScreen::set_text`]; the finished screen is handed to a [`Display`]
//! in one piece so the e-paper only refreshes once per wake.

use core::fmt::{self, Write};

use embedded_graphics::{
    geometry::Point,
    mono_font::{
        MonoFont, MonoTextStyle,
        ascii::{FONT_6X10, FONT_10X20},
    },
    pixelcolor::{BinaryColor, PixelColor},
    prelude::*,
    text::{Baseline, Text, TextStyleBuilder},
};
use thiserror_no_std::Error;

use crate::heat_index::DerivedMetrics;
use crate::sensors::Reading;

pub const DISPLAY_WIDTH: u32 = 296;
pub const DISPLAY_HEIGHT: u32 = 128;

/// Left edge of the reading lines.
const TEXT_X: i32 = 50;
const TEXT_SCALE: u32 = 2;

/// Maximum number of lines a screen can hold.
pub const MAX_LINES: usize = 4;

/// Maximum length of one line, in bytes.
pub const LINE_CAPACITY: usize = 48;

pub type LineText = heapless::String<LINE_CAPACITY>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenError {
    #[error("screen has no room for another line")]
    TooManyLines,
    #[error("no text line at index {0}")]
    InvalidIndex(usize),
    #[error("text does not fit in one line")]
    TextOverflow,
}

/// One positioned text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    /// Left edge, vertical centre of the text.
    pub position: Point,
    pub scale: u32,
    pub text: LineText,
}

impl TextLine {
    fn font(&self) -> &'static MonoFont<'static> {
        match self.scale {
            0 | 1 => &FONT_6X10,
            _ => &FONT_10X20,
        }
    }
}

/// A set of text lines ready to be drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextScreen {
    lines: heapless::Vec<TextLine, MAX_LINES>,
}

impl TextScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty line and return its index.
    pub fn add_text(&mut self, position: Point, scale: u32) -> Result<usize, ScreenError> {
        let index = self.lines.len();
        self.lines
            .push(TextLine {
                position,
                scale,
                text: LineText::new(),
            })
            .map_err(|_| ScreenError::TooManyLines)?;
        Ok(index)
    }

    /// Replace the text of line `index`.
    pub fn set_text(&mut self, index: usize, text: fmt::Arguments<'_>) -> Result<(), ScreenError> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(ScreenError::InvalidIndex(index))?;
        line.text.clear();
        line.text
            .write_fmt(text)
            .map_err(|_| ScreenError::TextOverflow)
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    pub fn line_text(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|line| line.text.as_str())
    }

    /// Clear `target` and draw every line onto it.
    pub fn draw<D, C>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = C>,
        C: PixelColor + From<BinaryColor>,
    {
        target.clear(C::from(BinaryColor::Off))?;

        let text_style = TextStyleBuilder::new().baseline(Baseline::Middle).build();
        for line in &self.lines {
            let character_style = MonoTextStyle::new(line.font(), C::from(BinaryColor::On));
            Text::with_text_style(&line.text, line.position, character_style, text_style)
                .draw(target)?;
        }

        Ok(())
    }
}

/// Build the three-line readings screen.
pub fn readings_screen(
    reading: &Reading,
    metrics: &DerivedMetrics,
) -> Result<TextScreen, ScreenError> {
    let mut screen = TextScreen::new();
    let height = DISPLAY_HEIGHT as i32;

    let temperature = screen.add_text(Point::new(TEXT_X, height / 4), TEXT_SCALE)?;
    let humidity = screen.add_text(Point::new(TEXT_X, 2 * height / 4), TEXT_SCALE)?;
    let feels_like = screen.add_text(Point::new(TEXT_X, 3 * height / 4), TEXT_SCALE)?;

    screen.set_text(
        temperature,
        format_args!("Temperature: {:.1} C", reading.temperature_celsius),
    )?;
    screen.set_text(
        humidity,
        format_args!("Humidity: {:.1} %", reading.relative_humidity_percent),
    )?;
    screen.set_text(
        feels_like,
        format_args!("Feels like: {:.1} F", metrics.heat_index_fahrenheit),
    )?;

    Ok(screen)
}

/// The e-paper panel.
pub trait Display {
    type Error: fmt::Debug;

    /// Draw `screen` and refresh the panel once.
    fn show(&mut self, screen: &TextScreen) -> impl Future<Output = Result<(), Self::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mock_display::MockDisplay;

    fn reading(t: f32, h: f32) -> (Reading, DerivedMetrics) {
        let reading = Reading {
            temperature_celsius: t,
            relative_humidity_percent: h,
        };
        (reading, DerivedMetrics::from_reading(&reading))
    }

    #[test]
    fn test_readings_screen_text() {
        let (reading, metrics) = reading(35.0, 50.0);
        let screen = readings_screen(&reading, &metrics).unwrap();

        assert_eq!(screen.lines().len(), 3);
        assert_eq!(screen.line_text(0), Some("Temperature: 35.0 C"));
        assert_eq!(screen.line_text(1), Some("Humidity: 50.0 %"));
        assert_eq!(screen.line_text(2), Some("Feels like: 105.2 F"));
    }

    #[test]
    fn test_readings_screen_rounds_to_one_decimal() {
        let (reading, metrics) = reading(21.46, 38.04);
        let screen = readings_screen(&reading, &metrics).unwrap();

        assert_eq!(screen.line_text(0), Some("Temperature: 21.5 C"));
        assert_eq!(screen.line_text(1), Some("Humidity: 38.0 %"));
        assert_eq!(screen.line_text(2), Some("Feels like: 76.9 F"));
    }

    #[test]
    fn test_readings_screen_positions() {
        let (reading, metrics) = reading(20.0, 40.0);
        let screen = readings_screen(&reading, &metrics).unwrap();

        let positions: heapless::Vec<Point, MAX_LINES> =
            screen.lines().iter().map(|line| line.position).collect();
        assert_eq!(
            positions.as_slice(),
            &[Point::new(50, 32), Point::new(50, 64), Point::new(50, 96)]
        );
        assert!(screen.lines().iter().all(|line| line.scale == 2));
    }

    #[test]
    fn test_negative_temperature_formatting() {
        let (reading, metrics) = reading(-4.26, 81.0);
        let screen = readings_screen(&reading, &metrics).unwrap();
        assert_eq!(screen.line_text(0), Some("Temperature: -4.3 C"));
    }

    #[test]
    fn test_set_text_invalid_index() {
        let mut screen = TextScreen::new();
        screen.add_text(Point::new(0, 0), 1).unwrap();
        assert_eq!(
            screen.set_text(3, format_args!("nope")),
            Err(ScreenError::InvalidIndex(3))
        );
    }

    #[test]
    fn test_add_text_capacity() {
        let mut screen = TextScreen::new();
        for i in 0..MAX_LINES {
            assert_eq!(screen.add_text(Point::zero(), 1), Ok(i));
        }
        assert_eq!(
            screen.add_text(Point::zero(), 1),
            Err(ScreenError::TooManyLines)
        );
    }

    #[test]
    fn test_set_text_overflow() {
        let mut screen = TextScreen::new();
        let index = screen.add_text(Point::zero(), 1).unwrap();
        assert_eq!(
            screen.set_text(index, format_args!("Feels like: {:.1} F", f32::MAX)),
            Err(ScreenError::TextOverflow)
        );
    }

    #[test]
    fn test_draw_clears_and_renders_text() {
        let mut screen = TextScreen::new();
        let index = screen.add_text(Point::new(0, 5), 1).unwrap();
        screen.set_text(index, format_args!("A")).unwrap();

        let mut display = MockDisplay::<BinaryColor>::new();
        display.set_allow_overdraw(true);
        screen.draw(&mut display).unwrap();

        let glyph_lit = (0..6)
            .flat_map(|x| (0..11).map(move |y| Point::new(x, y)))
            .any(|p| display.get_pixel(p) == Some(BinaryColor::On));
        assert!(glyph_lit);
        assert_eq!(display.get_pixel(Point::new(63, 63)), Some(BinaryColor::Off));
    }
}
