//! HT16K33 Bicolor Matrix Driver
//!
//! Drives the Adafruit 8x8 bicolor LED backpack over I2C.
//!
//! # Frame Buffer (16 bytes)
//!
//! ```text
//! [2y]    : green LEDs of row y, bit x = column x
//! [2y+1]  : red LEDs of row y, bit x = column x
//! ```
//!
//! Yellow lights both LEDs of a pixel. The whole buffer is sent in one
//! write starting at display RAM address 0x00.

use crate::domain::display::{DisplayError, MatrixDisplay};
use crate::domain::pixel::{PixelColor, MATRIX_SIZE};
use embedded_hal::i2c::{Error as _, I2c};
use tracing::{debug, trace};

/// Default I2C address of the backpack
pub const DEFAULT_ADDRESS: u8 = 0x70;

/// Highest brightness level
pub const MAX_BRIGHTNESS: u8 = 15;

const BUFFER_LEN: usize = MATRIX_SIZE * 2;

const CMD_SYSTEM_SETUP: u8 = 0x20;
const OSCILLATOR_ON: u8 = 0x01;
const CMD_DISPLAY_SETUP: u8 = 0x80;
const DISPLAY_ON: u8 = 0x01;
const BLINK_OFF: u8 = 0x00;
const CMD_BRIGHTNESS: u8 = 0xE0;
const DISPLAY_RAM: u8 = 0x00;

pub struct Ht16k33Matrix<I2C> {
    i2c: I2C,
    address: u8,
    brightness: u8,
    buffer: [u8; BUFFER_LEN],
}

impl<I2C: I2c> Ht16k33Matrix<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            brightness: MAX_BRIGHTNESS,
            buffer: [0; BUFFER_LEN],
        }
    }

    /// Brightness applied by `begin` (0-15)
    pub fn with_brightness(mut self, brightness: u8) -> Result<Self, DisplayError> {
        if brightness > MAX_BRIGHTNESS {
            return Err(DisplayError::Brightness(brightness));
        }
        self.brightness = brightness;
        Ok(self)
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn command(&mut self, command: u8) -> Result<(), DisplayError> {
        trace!("HT16K33 command {:#04x}", command);
        self.i2c
            .write(self.address, &[command])
            .map_err(|e| DisplayError::Bus(format!("{:?}", e.kind())))
    }

    fn set_led(&mut self, led: usize, on: bool) {
        let (index, bit) = (led / 8, led % 8);
        if on {
            self.buffer[index] |= 1 << bit;
        } else {
            self.buffer[index] &= !(1 << bit);
        }
    }
}

impl<I2C: I2c> MatrixDisplay for Ht16k33Matrix<I2C> {
    fn begin(&mut self) -> Result<(), DisplayError> {
        debug!(
            "Starting HT16K33 at {:#04x}, brightness {}",
            self.address, self.brightness
        );
        self.command(CMD_SYSTEM_SETUP | OSCILLATOR_ON)?;
        self.command(CMD_DISPLAY_SETUP | DISPLAY_ON | BLINK_OFF)?;
        self.command(CMD_BRIGHTNESS | self.brightness)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.buffer = [0; BUFFER_LEN];
        Ok(())
    }

    fn set_pixel(
        &mut self,
        column: usize,
        row: usize,
        color: PixelColor,
    ) -> Result<(), DisplayError> {
        if column >= MATRIX_SIZE || row >= MATRIX_SIZE {
            return Err(DisplayError::OutOfBounds { column, row });
        }
        let led = row * 16 + column;
        self.set_led(led, color.has_green());
        self.set_led(led + 8, color.has_red());
        Ok(())
    }

    fn write_display(&mut self) -> Result<(), DisplayError> {
        let mut frame = [0u8; BUFFER_LEN + 1];
        frame[0] = DISPLAY_RAM;
        frame[1..].copy_from_slice(&self.buffer);
        self.i2c
            .write(self.address, &frame)
            .map_err(|e| DisplayError::Bus(format!("{:?}", e.kind())))
    }
}
