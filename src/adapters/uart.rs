//! Wired serial transport (UART2).
//!
//! Same line protocol as the Bluetooth channel, for bench setups where the
//! lock board hangs off a USB-serial adapter. A UART has nothing to
//! advertise, so `open` only records the name for the log.

use esp_idf_svc::hal::delay::{BLOCK, NON_BLOCK};
use esp_idf_svc::hal::uart::UartDriver;
use log::{info, warn};

use crate::channel::Transport;
use crate::error::ChannelError;

pub struct UartTransport<'d> {
    driver: UartDriver<'d>,
}

impl<'d> UartTransport<'d> {
    pub fn new(driver: UartDriver<'d>) -> Self {
        Self { driver }
    }
}

impl Transport for UartTransport<'_> {
    fn open(&mut self, device_name: &str) -> Result<(), ChannelError> {
        info!("UART: command channel '{}' on UART2", device_name);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        self.driver.read(buf, NON_BLOCK).map_err(|e| {
            warn!("UART: read failed ({})", e);
            ChannelError::ReadFailed
        })
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ChannelError> {
        self.driver.write(data).map_err(|e| {
            warn!("UART: write failed ({})", e);
            ChannelError::WriteFailed
        })
    }

    fn flush(&mut self) -> Result<(), ChannelError> {
        self.driver
            .wait_tx_done(BLOCK)
            .map_err(|_| ChannelError::WriteFailed)
    }

    fn available(&self) -> bool {
        self.driver.remaining_read().map(|n| n > 0).unwrap_or(false)
    }
}
