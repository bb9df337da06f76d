//! Advertising payload encoder
//!
//! Builds the legacy advertising payload broadcast while the peripheral
//! is waiting for a central:
//!
//! ```text
//! [0x02][0x01][0x02]                 flags: LE general discoverable
//! [len(name) + 1][0x09][name...]     complete local name
//! ```

use crate::config::advertising::MAX_PAYLOAD;
use heapless::Vec;
use trouble_host::prelude::{AdStructure, LE_GENERAL_DISCOVERABLE};

/// Encoded advertising payload
pub type AdvertisingData = Vec<u8, MAX_PAYLOAD>;

/// Errors that can occur while building the advertising payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingError {
    /// Name does not fit in the remaining payload space
    NameTooLong,
}

/// Encode the flags and complete local name AD structures for `name`.
pub fn encode_advertising_data(name: &str) -> Result<AdvertisingData, AdvertisingError> {
    let mut buf = [0u8; MAX_PAYLOAD];
    let len = AdStructure::encode_slice(
        &[
            AdStructure::Flags(LE_GENERAL_DISCOVERABLE),
            AdStructure::CompleteLocalName(name.as_bytes()),
        ],
        &mut buf,
    )
    .map_err(|_| AdvertisingError::NameTooLong)?;

    Vec::from_slice(&buf[..len]).map_err(|_| AdvertisingError::NameTooLong)
}
