//! BLE radio stack trait for abstraction and testability
//!
//! This trait defines the primitives the peripheral controller composes,
//! allowing the trouble-host stack to be swapped with a mock for testing.

use core::future::Future;

/// Opaque GATT attribute handle assigned at registration
pub type AttributeHandle = u16;

/// Link-layer connection handle reported on connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionHandle(pub u16);

/// Attribute handles of the registered Nordic UART Service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NusHandles {
    /// Write target (central to peripheral)
    pub rx: AttributeHandle,
    /// Notify target (peripheral to central)
    pub tx: AttributeHandle,
}

/// Events delivered by the radio stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleEvent {
    /// A central connected
    Connected(ConnectionHandle),
    /// The central disconnected
    Disconnected,
    /// A central wrote to an attribute
    Write { handle: AttributeHandle },
}

/// Errors that can occur during radio operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Radio could not be activated
    ActivationFailed,
    /// GATT service registration failed
    RegistrationFailed,
    /// Advertising could not be started
    AdvertisingFailed,
    /// Attribute handle is not known to the stack
    UnknownHandle,
    /// Value does not fit the attribute or the caller's buffer
    ValueTooLong,
    /// Notification could not be sent
    NotifyFailed,
    /// No central is connected
    NotConnected,
    /// Event requested while neither advertising nor connected
    Idle,
}

/// Abstract BLE radio stack interface for testability
///
/// This trait allows the peripheral controller to work with either the
/// trouble-host stack or a mock implementation for testing.
pub trait RadioStack {
    /// Bring the radio up
    fn activate(&mut self) -> impl Future<Output = Result<(), RadioError>>;

    /// Register the Nordic UART Service and return its attribute handles
    fn register_nus(&mut self) -> impl Future<Output = Result<NusHandles, RadioError>>;

    /// Copy the current value of an attribute into `buf`
    ///
    /// Returns the number of bytes copied.
    fn read_attribute(
        &mut self,
        handle: AttributeHandle,
        buf: &mut [u8],
    ) -> Result<usize, RadioError>;

    /// Set an attribute value and notify it to the connected central
    fn notify(
        &mut self,
        handle: AttributeHandle,
        data: &[u8],
    ) -> impl Future<Output = Result<(), RadioError>>;

    /// Start connectable advertising with the given payload
    fn start_advertising(
        &mut self,
        interval_ms: u64,
        adv_data: &[u8],
    ) -> impl Future<Output = Result<(), RadioError>>;

    /// Wait for the next event
    fn next_event(&mut self) -> impl Future<Output = Result<BleEvent, RadioError>>;
}

#[cfg(test)]
pub mod mock {
    //! Mock radio stack for testing

    use super::*;
    use crate::config::advertising::MAX_PAYLOAD;
    use crate::config::nus::{MAX_PACKET_SIZE, MAX_REPLY_SIZE};
    use core::cell::RefCell;
    use heapless::Vec;

    /// Handles the mock assigns at registration
    pub const MOCK_HANDLES: NusHandles = NusHandles { rx: 0x0010, tx: 0x000C };

    /// Event queued on the mock
    #[derive(Debug, Clone)]
    pub enum MockEvent {
        Connected(u16),
        Disconnected,
        /// Value stored into the attribute when the event is delivered
        Write {
            handle: AttributeHandle,
            data: Vec<u8, MAX_PACKET_SIZE>,
        },
        /// Error returned instead of an event
        Error(RadioError),
    }

    /// Advertising start recorded by the mock
    #[derive(Debug, Clone, PartialEq)]
    pub struct AdvertisingRecord {
        pub interval_ms: u64,
        pub data: Vec<u8, MAX_PAYLOAD>,
    }

    /// Notification recorded by the mock
    #[derive(Debug, Clone, PartialEq)]
    pub struct NotifyRecord {
        pub handle: AttributeHandle,
        pub data: Vec<u8, MAX_REPLY_SIZE>,
    }

    /// Mock radio stack for unit testing
    pub struct MockRadioStack {
        /// Events returned by next_event(), FIFO
        events: RefCell<Vec<MockEvent, 16>>,
        /// Current RX attribute value
        rx_value: RefCell<Vec<u8, MAX_PACKET_SIZE>>,
        /// Current TX attribute value
        tx_value: RefCell<Vec<u8, MAX_REPLY_SIZE>>,
        /// Record of advertising starts
        advertising_history: RefCell<Vec<AdvertisingRecord, 8>>,
        /// Record of notifications
        notify_history: RefCell<Vec<NotifyRecord, 8>>,
        /// Error to return on activate
        activate_error: RefCell<Option<RadioError>>,
        /// Error to return on next notify
        next_notify_error: RefCell<Option<RadioError>>,
        /// Number of advertising starts left to fail
        advertising_failures: RefCell<usize>,
        advertising_attempts: RefCell<usize>,
        active: RefCell<bool>,
        registrations: RefCell<usize>,
        connected: RefCell<bool>,
    }

    impl MockRadioStack {
        /// Create a new mock radio stack
        pub fn new() -> Self {
            Self {
                events: RefCell::new(Vec::new()),
                rx_value: RefCell::new(Vec::new()),
                tx_value: RefCell::new(Vec::new()),
                advertising_history: RefCell::new(Vec::new()),
                notify_history: RefCell::new(Vec::new()),
                activate_error: RefCell::new(None),
                next_notify_error: RefCell::new(None),
                advertising_failures: RefCell::new(0),
                advertising_attempts: RefCell::new(0),
                active: RefCell::new(false),
                registrations: RefCell::new(0),
                connected: RefCell::new(false),
            }
        }

        /// Queue a central connection
        pub fn queue_connect(&self, handle: u16) {
            let _ = self.events.borrow_mut().push(MockEvent::Connected(handle));
        }

        /// Queue a central disconnection
        pub fn queue_disconnect(&self) {
            let _ = self.events.borrow_mut().push(MockEvent::Disconnected);
        }

        /// Queue a write of `data` to `handle`
        pub fn queue_write(&self, handle: AttributeHandle, data: &[u8]) {
            let mut value = Vec::new();
            let _ = value.extend_from_slice(data);
            let _ = self
                .events
                .borrow_mut()
                .push(MockEvent::Write { handle, data: value });
        }

        /// Queue an error to be returned by next_event()
        pub fn queue_error(&self, error: RadioError) {
            let _ = self.events.borrow_mut().push(MockEvent::Error(error));
        }

        /// Make activate() fail
        pub fn set_activate_error(&self, error: RadioError) {
            *self.activate_error.borrow_mut() = Some(error);
        }

        /// Set an error to be returned by the next notify() call
        pub fn set_next_notify_error(&self, error: RadioError) {
            *self.next_notify_error.borrow_mut() = Some(error);
        }

        /// Make the next `count` start_advertising() calls fail
        pub fn set_advertising_failures(&self, count: usize) {
            *self.advertising_failures.borrow_mut() = count;
        }

        /// Number of start_advertising() calls, failed ones included
        pub fn advertising_attempts(&self) -> usize {
            *self.advertising_attempts.borrow()
        }

        pub fn is_active(&self) -> bool {
            *self.active.borrow()
        }

        pub fn registrations(&self) -> usize {
            *self.registrations.borrow()
        }

        pub fn pending_events(&self) -> usize {
            self.events.borrow().len()
        }

        pub fn get_advertising_history(&self) -> Vec<AdvertisingRecord, 8> {
            self.advertising_history.borrow().clone()
        }

        pub fn get_notify_history(&self) -> Vec<NotifyRecord, 8> {
            self.notify_history.borrow().clone()
        }

        pub fn get_tx_value(&self) -> Vec<u8, MAX_REPLY_SIZE> {
            self.tx_value.borrow().clone()
        }
    }

    impl Default for MockRadioStack {
        fn default() -> Self {
            Self::new()
        }
    }

    impl RadioStack for MockRadioStack {
        async fn activate(&mut self) -> Result<(), RadioError> {
            if let Some(error) = self.activate_error.borrow_mut().take() {
                return Err(error);
            }
            *self.active.borrow_mut() = true;
            Ok(())
        }

        async fn register_nus(&mut self) -> Result<NusHandles, RadioError> {
            if !self.is_active() {
                return Err(RadioError::RegistrationFailed);
            }
            *self.registrations.borrow_mut() += 1;
            Ok(MOCK_HANDLES)
        }

        fn read_attribute(
            &mut self,
            handle: AttributeHandle,
            buf: &mut [u8],
        ) -> Result<usize, RadioError> {
            let value: core::cell::Ref<'_, [u8]> = if handle == MOCK_HANDLES.rx {
                core::cell::Ref::map(self.rx_value.borrow(), |v| v.as_slice())
            } else if handle == MOCK_HANDLES.tx {
                core::cell::Ref::map(self.tx_value.borrow(), |v| v.as_slice())
            } else {
                return Err(RadioError::UnknownHandle);
            };

            if value.len() > buf.len() {
                return Err(RadioError::ValueTooLong);
            }
            buf[..value.len()].copy_from_slice(&value);
            Ok(value.len())
        }

        async fn notify(&mut self, handle: AttributeHandle, data: &[u8]) -> Result<(), RadioError> {
            if handle != MOCK_HANDLES.tx {
                return Err(RadioError::UnknownHandle);
            }

            let mut value = Vec::new();
            value
                .extend_from_slice(data)
                .map_err(|_| RadioError::ValueTooLong)?;
            *self.tx_value.borrow_mut() = value.clone();

            if let Some(error) = self.next_notify_error.borrow_mut().take() {
                return Err(error);
            }
            if !*self.connected.borrow() {
                return Err(RadioError::NotConnected);
            }

            let _ = self
                .notify_history
                .borrow_mut()
                .push(NotifyRecord { handle, data: value });
            Ok(())
        }

        async fn start_advertising(
            &mut self,
            interval_ms: u64,
            adv_data: &[u8],
        ) -> Result<(), RadioError> {
            *self.advertising_attempts.borrow_mut() += 1;
            {
                let mut failures = self.advertising_failures.borrow_mut();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(RadioError::AdvertisingFailed);
                }
            }

            let mut data = Vec::new();
            data.extend_from_slice(adv_data)
                .map_err(|_| RadioError::AdvertisingFailed)?;
            let _ = self
                .advertising_history
                .borrow_mut()
                .push(AdvertisingRecord { interval_ms, data });
            Ok(())
        }

        async fn next_event(&mut self) -> Result<BleEvent, RadioError> {
            let mut events = self.events.borrow_mut();
            if events.is_empty() {
                return Err(RadioError::Idle);
            }

            // Pop from front (FIFO order)
            match events.remove(0) {
                MockEvent::Connected(handle) => {
                    *self.connected.borrow_mut() = true;
                    Ok(BleEvent::Connected(ConnectionHandle(handle)))
                }
                MockEvent::Disconnected => {
                    *self.connected.borrow_mut() = false;
                    Ok(BleEvent::Disconnected)
                }
                MockEvent::Write { handle, data } => {
                    if handle == MOCK_HANDLES.rx {
                        *self.rx_value.borrow_mut() = data;
                    }
                    Ok(BleEvent::Write { handle })
                }
                MockEvent::Error(error) => Err(error),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_mock_write_updates_attribute() {
            let mut radio = MockRadioStack::new();

            futures::executor::block_on(async {
                radio.queue_write(MOCK_HANDLES.rx, b"abc");

                // Value is only stored once the event is delivered
                let mut buf = [0u8; 8];
                assert_eq!(radio.read_attribute(MOCK_HANDLES.rx, &mut buf), Ok(0));

                let event = radio.next_event().await.unwrap();
                assert_eq!(event, BleEvent::Write { handle: MOCK_HANDLES.rx });

                let len = radio.read_attribute(MOCK_HANDLES.rx, &mut buf).unwrap();
                assert_eq!(&buf[..len], b"abc");
            });
        }

        #[test]
        fn test_mock_events_fifo() {
            let mut radio = MockRadioStack::new();

            futures::executor::block_on(async {
                radio.queue_connect(7);
                radio.queue_disconnect();

                assert_eq!(
                    radio.next_event().await,
                    Ok(BleEvent::Connected(ConnectionHandle(7)))
                );
                assert_eq!(radio.next_event().await, Ok(BleEvent::Disconnected));
                assert_eq!(radio.next_event().await, Err(RadioError::Idle));
            });
        }

        #[test]
        fn test_mock_notify_requires_connection() {
            let mut radio = MockRadioStack::new();

            futures::executor::block_on(async {
                let result = radio.notify(MOCK_HANDLES.tx, b"hi").await;
                assert_eq!(result, Err(RadioError::NotConnected));
                // Attribute value is still written
                assert_eq!(radio.get_tx_value().as_slice(), b"hi");
                assert!(radio.get_notify_history().is_empty());
            });
        }

        #[test]
        fn test_mock_read_buffer_too_small() {
            let mut radio = MockRadioStack::new();

            futures::executor::block_on(async {
                radio.queue_write(MOCK_HANDLES.rx, b"hello");
                radio.next_event().await.unwrap();

                let mut buf = [0u8; 2];
                assert_eq!(
                    radio.read_attribute(MOCK_HANDLES.rx, &mut buf),
                    Err(RadioError::ValueTooLong)
                );
            });
        }
    }
}
