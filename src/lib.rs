#![cfg_attr(not(test), no_std)]

pub mod ble;
pub mod config;
pub mod peripheral;
pub mod protocol;
pub mod radio;

// These modules depend on embassy/async features only available with embedded feature
#[cfg(feature = "embedded")]
pub mod tasks;
