//! BLE peripheral exposing an 8x8 bicolor LED matrix as a GATT profile.
//!
//! A central writes one two-byte bitmap per row characteristic and can read
//! back the last value written.
//!
//! - [`domain`] - pixel codec, GATT profile model, controller state machine, settings
//! - [`infrastructure`] - BlueZ binding, display drivers, logging

pub mod domain;
pub mod infrastructure;
