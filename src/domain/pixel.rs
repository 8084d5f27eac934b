//! Row Payload Codec
//!
//! Every matrix row is carried over the air as two bytes, two bits per
//! pixel, most significant bits first:
//!
//! ```text
//! Pixel  |  0  |  1  |  2  |  3  |  4  |  5  |  6  |  7
//! -------+-----+-----+-----+-----+-----+-----+-----+-----
//! Bit    | 7 6 | 5 4 | 3 2 | 1 0 | 7 6 | 5 4 | 3 2 | 1 0
//! -------+-----+-----+-----+-----+-----+-----+-----+-----
//! Byte   |           0           |           1
//! ```
//!
//! Codes: `00` off, `01` red, `10` green, `11` yellow.

use std::fmt;

/// Number of rows and columns on the matrix
pub const MATRIX_SIZE: usize = 8;

/// Bytes per row on the wire
pub const ROW_PAYLOAD_LEN: usize = 2;

const PIXELS_PER_BYTE: usize = 4;

/// Color of a single bicolor pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelColor {
    #[default]
    Off,
    Red,
    Green,
    Yellow,
}

impl PixelColor {
    /// Map the low two bits of `code` to a color. Every code is valid.
    pub fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0b00 => Self::Off,
            0b01 => Self::Red,
            0b10 => Self::Green,
            _ => Self::Yellow,
        }
    }

    /// The two-bit wire code of this color
    pub fn code(self) -> u8 {
        match self {
            Self::Off => 0b00,
            Self::Red => 0b01,
            Self::Green => 0b10,
            Self::Yellow => 0b11,
        }
    }

    pub fn has_red(self) -> bool {
        matches!(self, Self::Red | Self::Yellow)
    }

    pub fn has_green(self) -> bool {
        matches!(self, Self::Green | Self::Yellow)
    }
}

/// Decoded colors of one row, indexed by column
pub type RowColors = [PixelColor; MATRIX_SIZE];

/// Decode a two-byte row payload into the colors of its eight columns
pub fn decode(byte0: u8, byte1: u8) -> RowColors {
    let mut colors = [PixelColor::Off; MATRIX_SIZE];
    for (half, byte) in [byte0, byte1].into_iter().enumerate() {
        for slot in 0..PIXELS_PER_BYTE {
            let shift = 6 - 2 * slot;
            colors[half * PIXELS_PER_BYTE + slot] = PixelColor::from_code(byte >> shift);
        }
    }
    colors
}

/// The raw state of one row: exactly two bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowPayload([u8; ROW_PAYLOAD_LEN]);

impl RowPayload {
    pub const fn new(byte0: u8, byte1: u8) -> Self {
        Self([byte0, byte1])
    }

    /// Take the first two bytes of a write, padding missing bytes with `0x00`.
    /// Trailing bytes past the second are dropped.
    pub fn from_write(value: &[u8]) -> Self {
        let mut bytes = [0u8; ROW_PAYLOAD_LEN];
        for (slot, byte) in bytes.iter_mut().zip(value) {
            *slot = *byte;
        }
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; ROW_PAYLOAD_LEN] {
        self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn colors(&self) -> RowColors {
        decode(self.0[0], self.0[1])
    }
}

impl fmt::Display for RowPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#04x}, {:#04x}]", self.0[0], self.0[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PixelColor::*;

    #[test]
    fn test_decode_all_off() {
        assert_eq!(decode(0x00, 0x00), [Off; MATRIX_SIZE]);
    }

    #[test]
    fn test_decode_all_yellow() {
        assert_eq!(decode(0xFF, 0xFF), [Yellow; MATRIX_SIZE]);
    }

    #[test]
    fn test_decode_mixed_row() {
        // 10 10 01 01 | 00 11 11 00
        assert_eq!(
            decode(0xA5, 0x3C),
            [Green, Green, Red, Red, Off, Yellow, Yellow, Off]
        );
    }

    #[test]
    fn test_decode_is_msb_first() {
        assert_eq!(decode(0b0100_0000, 0x00)[0], Red);
        assert_eq!(decode(0x00, 0b0000_0010)[7], Green);
    }

    #[test]
    fn test_color_codes() {
        for code in 0..4u8 {
            assert_eq!(PixelColor::from_code(code).code(), code);
        }
        assert!(Yellow.has_red() && Yellow.has_green());
        assert!(!Off.has_red() && !Off.has_green());
        assert!(Red.has_red() && !Red.has_green());
    }

    #[test]
    fn test_payload_from_write() {
        assert_eq!(RowPayload::from_write(&[0xA5, 0x3C]), RowPayload::new(0xA5, 0x3C));
        assert_eq!(
            RowPayload::from_write(&[0xA5, 0x3C, 0xFF, 0x01]),
            RowPayload::new(0xA5, 0x3C)
        );
        assert_eq!(RowPayload::from_write(&[0xA5]), RowPayload::new(0xA5, 0x00));
        assert_eq!(RowPayload::from_write(&[]), RowPayload::default());
    }

    #[test]
    fn test_payload_display() {
        assert_eq!(RowPayload::new(0xA5, 0x0C).to_string(), "[0xa5, 0x0c]");
    }
}
