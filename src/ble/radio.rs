//! trouble-host implementation of the radio stack trait
//!
//! Wraps the host `Peripheral`, the GATT server and the current connection.
//! While advertising, `next_event` waits for a central to connect; while
//! connected it waits for GATT traffic or the disconnect.

use embassy_time::Duration;
use log::{debug, warn};
use trouble_host::prelude::*;

use crate::ble::service::Server;
use crate::config::nus::MAX_REPLY_SIZE;
use crate::radio::traits::{
    AttributeHandle, BleEvent, ConnectionHandle, NusHandles, RadioError, RadioStack,
};

/// Radio stack backed by trouble-host
pub struct TroubleRadio<'stack, 'server, 'values, C: Controller> {
    peripheral: Peripheral<'stack, C, DefaultPacketPool>,
    server: &'server Server<'values>,
    advertiser: Option<Advertiser<'stack, C, DefaultPacketPool>>,
    conn: Option<GattConnection<'stack, 'server, DefaultPacketPool>>,
}

impl<'stack, 'server, 'values, C: Controller> TroubleRadio<'stack, 'server, 'values, C> {
    /// Create an adapter over a built host and GATT server
    pub fn new(
        peripheral: Peripheral<'stack, C, DefaultPacketPool>,
        server: &'server Server<'values>,
    ) -> Self {
        Self {
            peripheral,
            server,
            advertiser: None,
            conn: None,
        }
    }
}

impl<'stack, 'server, 'values, C: Controller> RadioStack for TroubleRadio<'stack, 'server, 'values, C> {
    async fn activate(&mut self) -> Result<(), RadioError> {
        // The controller is brought up in main and driven by the host runner
        Ok(())
    }

    async fn register_nus(&mut self) -> Result<NusHandles, RadioError> {
        // The attribute table is built with the server
        Ok(NusHandles {
            rx: self.server.nus.rx.handle,
            tx: self.server.nus.tx.handle,
        })
    }

    fn read_attribute(
        &mut self,
        handle: AttributeHandle,
        buf: &mut [u8],
    ) -> Result<usize, RadioError> {
        let nus = &self.server.nus;
        let value = if handle == nus.rx.handle {
            self.server.get(&nus.rx)
        } else if handle == nus.tx.handle {
            self.server.get(&nus.tx)
        } else {
            return Err(RadioError::UnknownHandle);
        }
        .map_err(|_| RadioError::UnknownHandle)?;

        if value.len() > buf.len() {
            return Err(RadioError::ValueTooLong);
        }
        buf[..value.len()].copy_from_slice(&value);
        Ok(value.len())
    }

    async fn notify(&mut self, handle: AttributeHandle, data: &[u8]) -> Result<(), RadioError> {
        if handle != self.server.nus.tx.handle {
            return Err(RadioError::UnknownHandle);
        }
        let conn = self.conn.as_ref().ok_or(RadioError::NotConnected)?;

        let mut value: heapless::Vec<u8, MAX_REPLY_SIZE> = heapless::Vec::new();
        value
            .extend_from_slice(data)
            .map_err(|_| RadioError::ValueTooLong)?;

        self.server
            .nus
            .tx
            .notify(conn, &value)
            .await
            .map_err(|_| RadioError::NotifyFailed)
    }

    async fn start_advertising(
        &mut self,
        interval_ms: u64,
        adv_data: &[u8],
    ) -> Result<(), RadioError> {
        let params = AdvertisementParameters {
            interval_min: Duration::from_millis(interval_ms),
            interval_max: Duration::from_millis(interval_ms),
            ..Default::default()
        };

        let advertiser = self
            .peripheral
            .advertise(
                &params,
                Advertisement::ConnectableScannableUndirected {
                    adv_data,
                    scan_data: &[],
                },
            )
            .await
            .map_err(|_| RadioError::AdvertisingFailed)?;

        self.advertiser = Some(advertiser);
        Ok(())
    }

    async fn next_event(&mut self) -> Result<BleEvent, RadioError> {
        loop {
            if let Some(conn) = self.conn.as_ref() {
                let event = conn.next().await;
                match event {
                    GattConnectionEvent::Disconnected { reason } => {
                        debug!("BLE: link closed ({:?})", reason);
                        self.conn = None;
                        return Ok(BleEvent::Disconnected);
                    }
                    GattConnectionEvent::Gatt { event } => {
                        let written = match &event {
                            GattEvent::Write(write_event) => Some(write_event.handle()),
                            _ => None,
                        };

                        // Accepting processes the request, so a write is stored
                        // before it is reported
                        match event.accept() {
                            Ok(reply) => reply.send().await,
                            Err(_) => warn!("BLE: failed to reply to GATT request"),
                        }

                        if let Some(handle) = written {
                            return Ok(BleEvent::Write { handle });
                        }
                    }
                    _ => {}
                }
            } else if let Some(advertiser) = self.advertiser.take() {
                let conn = advertiser
                    .accept()
                    .await
                    .map_err(|_| RadioError::AdvertisingFailed)?
                    .with_attribute_server(self.server)
                    .map_err(|_| RadioError::RegistrationFailed)?;

                let handle = conn.raw().handle().raw();
                self.conn = Some(conn);
                return Ok(BleEvent::Connected(ConnectionHandle(handle)));
            } else {
                return Err(RadioError::Idle);
            }
        }
    }
}
