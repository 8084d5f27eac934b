//! Display driver interface
//!
//! The physical matrix is owned by a driver behind [`MatrixDisplay`]; the
//! GATT model only pushes pixels and asks for a flush.

use crate::domain::pixel::PixelColor;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DisplayError {
    #[error("display bus error: {0}")]
    Bus(String),
    #[error("pixel ({column}, {row}) is outside the matrix")]
    OutOfBounds { column: usize, row: usize },
    #[error("brightness {0} is out of range (0-15)")]
    Brightness(u8),
}

/// Frame-buffered LED matrix
///
/// `set_pixel` and `clear` only touch the buffer; nothing reaches the
/// hardware until `write_display`.
pub trait MatrixDisplay {
    fn begin(&mut self) -> Result<(), DisplayError>;
    fn clear(&mut self) -> Result<(), DisplayError>;
    fn set_pixel(&mut self, column: usize, row: usize, color: PixelColor)
        -> Result<(), DisplayError>;
    fn write_display(&mut self) -> Result<(), DisplayError>;
}

/// Bring the display up blank: begin, clear and flush.
pub fn setup_display<D: MatrixDisplay + ?Sized>(display: &mut D) -> Result<(), DisplayError> {
    display.begin()?;
    display.clear()?;
    display.write_display()?;
    info!("Display initialized");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingDisplay;
    use super::*;

    #[test]
    fn test_setup_display_flushes_blank_frame() {
        let mut display = RecordingDisplay::default();
        display.buffer[2][5] = PixelColor::Red;

        setup_display(&mut display).unwrap();

        assert!(display.begun);
        assert_eq!(display.clears, 1);
        assert_eq!(display.flushed.len(), 1);
        assert!(display.flushed[0]
            .iter()
            .flatten()
            .all(|color| *color == PixelColor::Off));
    }

    #[test]
    fn test_setup_display_reports_bus_failure() {
        let mut display = RecordingDisplay::failing();
        assert!(matches!(
            setup_display(&mut display),
            Err(DisplayError::Bus(_))
        ));
    }
}
