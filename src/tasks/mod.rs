//! Embassy tasks module

pub mod ble;

pub use ble::ble_task;
