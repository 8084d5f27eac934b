//! Bluetooth Module
//!
//! Binds the LED matrix profile to a BLE host stack.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  PeripheralController                    │
//! │   (single owner of the profile model and the display)    │
//! └───────────────▲──────────────────────────┬───────────────┘
//!                 │ ControllerEvent          │ HostStack
//!                 │ (read/write, results)    │ (register app / ad)
//! ┌───────────────┴──────────────────────────▼───────────────┐
//! │                        BluezHost                         │
//! │  - GATT application: 1 service, 8 row characteristics    │
//! │  - LE advertisement: peripheral, service UUID, tx power  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`bluez`] - BlueZ over D-Bus via `bluer` (feature `bluez`)

#[cfg(feature = "bluez")]
pub mod bluez;

#[cfg(feature = "bluez")]
pub use bluez::BluezHost;
