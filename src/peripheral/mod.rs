//! BLE echo peripheral controller

pub mod controller;

pub use controller::{EchoPeripheral, PeripheralError, PeripheralState};
