//! Configuration constants for the ESP32-S3 BLE echo peripheral

/// Device identity
pub mod device {
    /// Name advertised in the complete local name field
    pub const NAME: &str = "ESP32 Echo";

    /// Upper three bytes of the random static address.
    /// The lower three come from the eFuse MAC.
    pub const ADDRESS_SUFFIX: [u8; 3] = [0x1E, 0x83, 0xE7];
}

/// Advertising parameters
pub mod advertising {
    /// Advertising interval in milliseconds
    pub const INTERVAL_MS: u64 = 100;

    /// Maximum legacy advertising payload size
    pub const MAX_PAYLOAD: usize = 31;

    /// Longest name that fits after the flags field
    /// (31 - 3 bytes of flags - 2 bytes of name header)
    pub const MAX_NAME_LEN: usize = MAX_PAYLOAD - 3 - 2;
}

/// Nordic UART Service
pub mod nus {
    /// Maximum RX characteristic value size
    pub const MAX_PACKET_SIZE: usize = 128;

    /// TX capacity: a full RX write plus the trailing newline
    pub const MAX_REPLY_SIZE: usize = MAX_PACKET_SIZE + 1;
}

/// BLE host resources
pub mod host {
    /// Number of maximum concurrent connections
    pub const CONNECTIONS_MAX: usize = 1;

    /// Number of L2CAP channels
    pub const L2CAP_CHANNELS_MAX: usize = 3;

    /// HCI command slots for the external controller
    pub const HCI_SLOTS: usize = 10;
}

/// Heap size for esp-radio (BLE requires significant heap)
pub mod memory {
    pub const HEAP_SIZE: usize = 64 * 1024;
}

/// Logging
pub mod logging {
    pub const LEVEL: log::LevelFilter = log::LevelFilter::Info;
}
