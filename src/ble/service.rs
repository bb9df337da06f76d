//! Nordic UART Service (NUS) definition
//!
//! Implements the standard Nordic UART Service for BLE serial communication.
//! - Service UUID: 6E400001-B5A3-F393-E0A9-E50E24DCCA9E
//! - RX Characteristic: 6E400002-... (write, write without response)
//! - TX Characteristic: 6E400003-... (notify)

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use trouble_host::prelude::*;

use crate::config::nus::{MAX_PACKET_SIZE, MAX_REPLY_SIZE};

/// Nordic UART Service
///
/// Values are variable length so the echoed bytes go out exactly as built,
/// without padding to the characteristic capacity.
#[gatt_service(uuid = "6e400001-b5a3-f393-e0a9-e50e24dcca9e")]
pub struct NordicUartService {
    /// TX Characteristic - server notifies echoed text here
    #[characteristic(uuid = "6e400003-b5a3-f393-e0a9-e50e24dcca9e", notify)]
    pub tx: heapless::Vec<u8, MAX_REPLY_SIZE>,

    /// RX Characteristic - client writes text here
    #[characteristic(uuid = "6e400002-b5a3-f393-e0a9-e50e24dcca9e", write, write_without_response)]
    pub rx: heapless::Vec<u8, MAX_PACKET_SIZE>,
}

/// BLE GATT Server with Nordic UART Service
#[gatt_server(mutex_type = CriticalSectionRawMutex)]
pub struct Server {
    pub nus: NordicUartService,
}
