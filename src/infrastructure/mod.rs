pub mod bluetooth;
pub mod display;
pub mod logging;
