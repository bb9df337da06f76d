//! Bluetooth Low Energy module
//!
//! Advertising payload encoding plus, on the embedded target, the Nordic
//! UART Service definition and the trouble-host radio adapter.

pub mod advertising;

#[cfg(feature = "embedded")]
pub mod radio;
#[cfg(feature = "embedded")]
pub mod service;

pub use advertising::{encode_advertising_data, AdvertisingData, AdvertisingError};

#[cfg(feature = "embedded")]
pub use radio::TroubleRadio;
#[cfg(feature = "embedded")]
pub use service::{NordicUartService, Server};
