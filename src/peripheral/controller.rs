//! Peripheral controller
//!
//! Owns the radio stack, registers the Nordic UART Service, advertises,
//! and dispatches connect, disconnect and write events.
//!
//! Events are pulled from the radio one at a time and each handler runs to
//! completion before the next event is read, so handlers never overlap.

use crate::ble::advertising::{encode_advertising_data, AdvertisingData, AdvertisingError};
use crate::config::advertising::{INTERVAL_MS, MAX_NAME_LEN};
use crate::config::nus::MAX_PACKET_SIZE;
use crate::protocol::echo::{echo_reply, EchoError};
use crate::radio::traits::{
    AttributeHandle, BleEvent, ConnectionHandle, NusHandles, RadioError, RadioStack,
};
use heapless::String;
use log::{debug, info, warn};

/// Errors that stop the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralError {
    /// Radio stack failure
    Radio(RadioError),
    /// Advertising payload could not be built
    Advertising(AdvertisingError),
}

impl From<RadioError> for PeripheralError {
    fn from(error: RadioError) -> Self {
        Self::Radio(error)
    }
}

impl From<AdvertisingError> for PeripheralError {
    fn from(error: AdvertisingError) -> Self {
        Self::Advertising(error)
    }
}

/// Connection state of the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralState {
    /// Waiting for a central
    Advertising,
    /// A central is connected
    Connected(ConnectionHandle),
}

/// BLE echo peripheral
pub struct EchoPeripheral<R: RadioStack> {
    name: String<MAX_NAME_LEN>,
    radio: R,
    handles: NusHandles,
    adv_data: AdvertisingData,
    state: PeripheralState,
}

impl<R: RadioStack> EchoPeripheral<R> {
    /// Activate the radio, register the service and start advertising.
    pub async fn initialize(mut radio: R, name: &str) -> Result<Self, PeripheralError> {
        let adv_data = encode_advertising_data(name)?;
        let mut device_name = String::new();
        device_name
            .push_str(name)
            .map_err(|_| AdvertisingError::NameTooLong)?;

        radio.activate().await?;
        let handles = radio.register_nus().await?;
        info!(
            "NUS registered (rx handle {}, tx handle {})",
            handles.rx, handles.tx
        );

        let mut peripheral = Self {
            name: device_name,
            radio,
            handles,
            adv_data,
            state: PeripheralState::Advertising,
        };
        peripheral.advertise().await?;

        Ok(peripheral)
    }

    /// Start advertising with the encoded name.
    pub async fn advertise(&mut self) -> Result<(), PeripheralError> {
        self.radio
            .start_advertising(INTERVAL_MS, &self.adv_data)
            .await?;
        self.state = PeripheralState::Advertising;
        info!("Advertising as '{}'", self.name.as_str());
        Ok(())
    }

    /// Record the connection handle of a newly connected central.
    pub fn on_connect(&mut self, handle: ConnectionHandle) {
        if let PeripheralState::Connected(previous) = self.state {
            warn!(
                "Connection {} replaces connection {} without a disconnect",
                handle.0, previous.0
            );
        }
        self.state = PeripheralState::Connected(handle);
        info!("Connected (handle {})", handle.0);
    }

    /// Clear the connection and advertise again.
    ///
    /// Advertising is retried until the stack accepts it.
    pub async fn on_disconnect(&mut self) {
        self.state = PeripheralState::Advertising;
        info!("Disconnected");

        while let Err(e) = self.advertise().await {
            warn!("Failed to restart advertising: {:?}, retrying", e);
        }
    }

    /// Echo the RX attribute value back to the central on TX.
    pub async fn on_write(&mut self, handle: AttributeHandle) -> Result<(), PeripheralError> {
        if handle != self.handles.rx {
            debug!("Ignoring write to handle {}", handle);
            return Ok(());
        }

        let mut buf = [0u8; MAX_PACKET_SIZE];
        let len = self.radio.read_attribute(self.handles.rx, &mut buf)?;

        let reply = match echo_reply(&buf[..len]) {
            Ok(reply) => reply,
            Err(EchoError::InvalidUtf8) => {
                warn!("Dropping {} byte write: not valid UTF-8", len);
                return Ok(());
            }
            Err(EchoError::TooLong) => {
                warn!("Dropping {} byte write: echo exceeds TX capacity", len);
                return Ok(());
            }
        };
        let message = reply.trim_end_matches('\n');
        info!("Received RX: {}", message);

        if !self.is_connected() {
            warn!("No central connected, not sending TX");
            return Ok(());
        }

        // The central may have gone between its write and this reply
        match self.radio.notify(self.handles.tx, reply.as_bytes()).await {
            Ok(()) => info!("Sent TX: {}", message),
            Err(e) => warn!("Failed to send TX: {:?}", e),
        }
        Ok(())
    }

    /// Route one event to its handler.
    pub async fn dispatch(&mut self, event: BleEvent) -> Result<(), PeripheralError> {
        match event {
            BleEvent::Connected(handle) => {
                self.on_connect(handle);
                Ok(())
            }
            BleEvent::Disconnected => {
                self.on_disconnect().await;
                Ok(())
            }
            BleEvent::Write { handle } => self.on_write(handle).await,
        }
    }

    /// Process events until the radio reports an error.
    pub async fn run(&mut self) -> PeripheralError {
        loop {
            let result = match self.radio.next_event().await {
                Ok(event) => self.dispatch(event).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                return e;
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handles(&self) -> NusHandles {
        self.handles
    }

    pub fn state(&self) -> PeripheralState {
        self.state
    }

    /// Handle of the connected central, if any
    pub fn connection(&self) -> Option<ConnectionHandle> {
        match self.state {
            PeripheralState::Connected(handle) => Some(handle),
            PeripheralState::Advertising => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }
}
