//! LED Matrix GATT Profile
//!
//! One primary service holding eight read/write characteristics, one per
//! matrix row. Row characteristic UUIDs share a base and differ only in the
//! last hex digit, which is the row index.
//!
//! ```text
//! LedApplication
//! └── LedService            12345678-1234-5678-1234-56789abc0010 (primary)
//!     ├── row 0             12345678-1234-5678-1234-56789abc0000 (read, write)
//!     ├── row 1             12345678-1234-5678-1234-56789abc0001 (read, write)
//!     │   ...
//!     └── row 7             12345678-1234-5678-1234-56789abc0007 (read, write)
//! ```

use crate::domain::display::{DisplayError, MatrixDisplay};
use crate::domain::pixel::{RowPayload, MATRIX_SIZE, ROW_PAYLOAD_LEN};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::{uuid, Uuid};

/// LED service UUID
pub const LED_SERVICE_UUID: Uuid = uuid!("12345678-1234-5678-1234-56789abc0010");

/// Row characteristic UUIDs are this base followed by one hex digit
pub const ROW_UUID_BASE: &str = "12345678-1234-5678-1234-56789abc000";

const HEX_DIGITS: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("row {row} is outside the matrix (0-{})", MATRIX_SIZE - 1)]
    RowOutOfRange { row: usize },
    #[error("invalid characteristic UUID {text}: {source}")]
    InvalidUuid {
        text: String,
        #[source]
        source: uuid::Error,
    },
}

/// Lowercase hex digit for `index`, or `None` past 15
pub fn hex_digit(index: usize) -> Option<char> {
    HEX_DIGITS.get(index).copied()
}

/// UUID of the characteristic for `row`
pub fn row_uuid(row: usize) -> Result<Uuid, ProfileError> {
    if row >= MATRIX_SIZE {
        return Err(ProfileError::RowOutOfRange { row });
    }
    let digit = hex_digit(row).ok_or(ProfileError::RowOutOfRange { row })?;
    let text = format!("{ROW_UUID_BASE}{digit}");
    Uuid::parse_str(&text).map_err(|source| ProfileError::InvalidUuid { text, source })
}

/// Per-request metadata the host stack hands to read/write callbacks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Address of the requesting central, if known
    pub device: Option<String>,
    pub offset: u16,
    pub mtu: Option<u16>,
}

/// GATT properties of a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharacteristicFlags {
    pub read: bool,
    pub write: bool,
}

pub trait Readable {
    fn read_value(&self, options: &RequestOptions) -> Vec<u8>;
}

pub trait Writable {
    fn write_value(
        &mut self,
        value: &[u8],
        options: &RequestOptions,
        display: &mut dyn MatrixDisplay,
    );
}

/// Characteristic backing one row of the matrix
#[derive(Debug, Clone)]
pub struct RowCharacteristic {
    row: usize,
    uuid: Uuid,
    value: RowPayload,
}

impl RowCharacteristic {
    /// Create the characteristic for `row`. Rows outside the matrix are rejected.
    pub fn new(row: usize) -> Result<Self, ProfileError> {
        Ok(Self {
            row,
            uuid: row_uuid(row)?,
            value: RowPayload::default(),
        })
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn flags(&self) -> CharacteristicFlags {
        CharacteristicFlags {
            read: true,
            write: true,
        }
    }

    /// Last stored payload
    pub fn value(&self) -> RowPayload {
        self.value
    }

    fn render(&self, display: &mut dyn MatrixDisplay) -> Result<(), DisplayError> {
        for (column, color) in self.value.colors().into_iter().enumerate() {
            display.set_pixel(column, self.row, color)?;
        }
        display.write_display()
    }
}

impl Readable for RowCharacteristic {
    fn read_value(&self, options: &RequestOptions) -> Vec<u8> {
        info!(row = self.row, value = %self.value, "Row characteristic read");
        debug!("Read options: {:?}", options);
        self.value.to_vec()
    }
}

impl Writable for RowCharacteristic {
    fn write_value(
        &mut self,
        value: &[u8],
        options: &RequestOptions,
        display: &mut dyn MatrixDisplay,
    ) {
        info!(row = self.row, value = ?value, "Row characteristic write");
        debug!("Write options: {:?}", options);

        if value.len() < ROW_PAYLOAD_LEN {
            warn!(
                row = self.row,
                len = value.len(),
                "Short row write, padding with zeros"
            );
        }

        // The row is recorded even if the display rejects it
        self.value = RowPayload::from_write(value);
        if let Err(e) = self.render(display) {
            error!(row = self.row, "Failed to update display row: {}", e);
        }
    }
}

/// Description of one characteristic for the host stack's attribute tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicDescriptor {
    pub row: usize,
    pub uuid: Uuid,
    pub flags: CharacteristicFlags,
}

/// Description of one service for the host stack's attribute tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub uuid: Uuid,
    pub primary: bool,
    pub characteristics: Vec<CharacteristicDescriptor>,
}

/// The LED service: one characteristic per matrix row
#[derive(Debug, Clone)]
pub struct LedService {
    rows: Vec<RowCharacteristic>,
}

impl LedService {
    pub fn new() -> Result<Self, ProfileError> {
        let rows = (0..MATRIX_SIZE)
            .map(RowCharacteristic::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn uuid(&self) -> Uuid {
        LED_SERVICE_UUID
    }

    pub fn is_primary(&self) -> bool {
        true
    }

    pub fn rows(&self) -> &[RowCharacteristic] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> Option<&RowCharacteristic> {
        self.rows.get(row)
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut RowCharacteristic> {
        self.rows.get_mut(row)
    }

    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor {
            uuid: self.uuid(),
            primary: self.is_primary(),
            characteristics: self
                .rows
                .iter()
                .map(|chrc| CharacteristicDescriptor {
                    row: chrc.row(),
                    uuid: chrc.uuid(),
                    flags: chrc.flags(),
                })
                .collect(),
        }
    }
}

/// GATT application registered with the host stack
#[derive(Debug, Clone)]
pub struct LedApplication {
    service: LedService,
}

impl LedApplication {
    pub fn new() -> Result<Self, ProfileError> {
        Ok(Self {
            service: LedService::new()?,
        })
    }

    pub fn service(&self) -> &LedService {
        &self.service
    }

    /// Attribute tree handed to the service manager on registration
    pub fn services(&self) -> Vec<ServiceDescriptor> {
        vec![self.service.descriptor()]
    }

    /// Dispatch a read to `row`; `None` if the application has no such row
    pub fn read_row(&self, row: usize, options: &RequestOptions) -> Option<Vec<u8>> {
        self.service.row(row).map(|chrc| chrc.read_value(options))
    }

    /// Dispatch a write to `row`; returns `false` if the application has no such row
    pub fn write_row(
        &mut self,
        row: usize,
        value: &[u8],
        options: &RequestOptions,
        display: &mut dyn MatrixDisplay,
    ) -> bool {
        match self.service.row_mut(row) {
            Some(chrc) => {
                chrc.write_value(value, options, display);
                true
            }
            None => {
                warn!(row, "Write to unknown row ignored");
                false
            }
        }
    }
}
