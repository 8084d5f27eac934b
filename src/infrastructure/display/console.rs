use crate::domain::display::{DisplayError, MatrixDisplay};
use crate::domain::pixel::{PixelColor, MATRIX_SIZE};
use tracing::info;

type Frame = [[PixelColor; MATRIX_SIZE]; MATRIX_SIZE];

/// Matrix backend for hosts without the LED backpack: every flush logs the
/// frame, one line per row.
#[derive(Debug, Default)]
pub struct ConsoleMatrix {
    buffer: Frame,
    shown: Frame,
}

impl ConsoleMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last flushed frame
    pub fn frame(&self) -> &Frame {
        &self.shown
    }

    pub fn render_row(row: &[PixelColor; MATRIX_SIZE]) -> String {
        row.iter()
            .map(|color| match color {
                PixelColor::Off => '.',
                PixelColor::Red => 'R',
                PixelColor::Green => 'G',
                PixelColor::Yellow => 'Y',
            })
            .collect()
    }
}

impl MatrixDisplay for ConsoleMatrix {
    fn begin(&mut self) -> Result<(), DisplayError> {
        info!("Console matrix ready");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.buffer = Frame::default();
        Ok(())
    }

    fn set_pixel(
        &mut self,
        column: usize,
        row: usize,
        color: PixelColor,
    ) -> Result<(), DisplayError> {
        let pixel = self
            .buffer
            .get_mut(row)
            .and_then(|r| r.get_mut(column))
            .ok_or(DisplayError::OutOfBounds { column, row })?;
        *pixel = color;
        Ok(())
    }

    fn write_display(&mut self) -> Result<(), DisplayError> {
        self.shown = self.buffer;
        for (index, row) in self.shown.iter().enumerate() {
            info!(target: "matrix", "{} {}", index, Self::render_row(row));
        }
        Ok(())
    }
}
