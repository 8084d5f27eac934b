//! Display Drivers
//!
//! Implementations of [`MatrixDisplay`](crate::domain::display::MatrixDisplay):
//!
//! - [`ht16k33`] - Adafruit bicolor backpack over any `embedded-hal` I2C bus
//! - [`console`] - logs frames, for hosts without the hardware

pub mod console;
pub mod ht16k33;

pub use console::ConsoleMatrix;
pub use ht16k33::Ht16k33Matrix;
