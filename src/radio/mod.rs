pub mod traits;

pub use traits::{AttributeHandle, BleEvent, ConnectionHandle, NusHandles, RadioError, RadioStack};
