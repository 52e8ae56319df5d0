//! USB transport primitives (component C1): vendor control transfers, and bulk-OUT wrapped
//! in the mandatory INITIALIZE/CHECK_READY envelope, and bulk-IN.
//!
//! The control plane (C2-C8) is generic over [`Transport`] so it can be exercised against a
//! mock in tests without any real hardware. [`RusbTransport`] is the only production
//! implementation, backed by the `rusb` crate with an infinite transfer timeout, matching
//! the blocking semantics the device expects.

use std::time::Duration;

use crate::regs;
use crate::{Error, Result};

/// Blocking USB control/bulk primitives for one claimed device interface.
///
/// All three primitives block for the duration of the underlying transfer; there is no
/// non-blocking mode at this layer (see the concurrency model in the crate's design notes).
pub trait Transport {
    fn control_in(&mut self, request: u8, value: u16, index: u16, buf: &mut [u8]) -> Result<usize>;
    fn control_out(&mut self, request: u8, value: u16, index: u16, buf: &[u8]) -> Result<usize>;
    fn bulk_out_raw(&mut self, buf: &[u8]) -> Result<usize>;
    fn bulk_in_raw(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Probe whether the device has applied the previous bulk-OUT payload and is ready
    /// to accept another one. Named for what it does, not the historical "USB 1 mode"
    /// terminology the vendor SDK used for the same probe.
    fn is_ready_for_bulk_out(&mut self) -> Result<bool> {
        let mut reply = [0u8; regs::CHECK_READY_REPLY_LEN];
        self.control_in(regs::REQUEST_CHECK_READY, 0, 0, &mut reply)?;
        Ok(reply[0] == regs::READY_BYTE)
    }

    /// Send the 10-byte INITIALIZE control-OUT prelude that starts every bulk-OUT
    /// transaction.
    fn send_initialize_prelude(&mut self) -> Result<()> {
        let n = self.control_out(regs::REQUEST_INITIALIZE, 0, 0, &regs::INITIALIZE_PAYLOAD)?;
        if n != regs::INITIALIZE_PAYLOAD.len() {
            return Err(Error::ControlFail);
        }
        Ok(())
    }

    /// The compound bulk-OUT envelope (§4.1): INITIALIZE prelude, CHECK_READY probe,
    /// then the bulk transfer itself. This is the single place where that ordering is
    /// enforced; every higher-level command must go through it.
    fn bulk_out(&mut self, message: &[u8]) -> Result<()> {
        self.send_initialize_prelude()?;
        if !self.is_ready_for_bulk_out()? {
            return Err(Error::ControlFail);
        }
        let n = self.bulk_out_raw(message)?;
        if n != message.len() {
            return Err(Error::NotReady);
        }
        Ok(())
    }

    /// Bulk-IN into a caller-sized buffer; fails if the transfer comes up short.
    fn bulk_in(&mut self, buf: &mut [u8]) -> Result<()> {
        let n = self.bulk_in_raw(buf)?;
        if n != buf.len() {
            return Err(Error::NotReady);
        }
        Ok(())
    }

    /// `GET_INFO` control-IN: identity string (wValue 0x1580) or calibration table
    /// (wValue 0x1600), depending on `value`.
    fn get_info(&mut self, value: u16, buf: &mut [u8]) -> Result<()> {
        let n = self.control_in(regs::REQUEST_GET_INFO, value, 0, buf)?;
        if n != buf.len() {
            return Err(Error::ControlFail);
        }
        Ok(())
    }

    /// One 64-byte chunk of the bitstream flash via `FLASH_ACCESS`.
    fn read_flash_chunk(&mut self, buf: &mut [u8; regs::FLASH_CHUNK_LEN]) -> Result<()> {
        let n = self.control_in(regs::REQUEST_FLASH_ACCESS, regs::VALUE_FLASH_ACCESS, 0, buf)?;
        if n != buf.len() {
            return Err(Error::ControlFail);
        }
        Ok(())
    }
}

#[cfg(feature = "hardware")]
pub struct RusbTransport {
    handle: rusb::DeviceHandle<rusb::GlobalContext>,
}

#[cfg(feature = "hardware")]
impl RusbTransport {
    /// Never returns; all transfers at this layer have an infinite timeout, matching
    /// §4.1 ("higher layers do not assume non-blocking behavior").
    const TIMEOUT: Duration = Duration::from_secs(0);

    pub fn open() -> Result<RusbTransport> {
        let device = rusb::devices()
            .map_err(|err| Error::CantOpen(Box::new(err)))?
            .iter()
            .find(|device| {
                device
                    .device_descriptor()
                    .map(|desc| {
                        desc.vendor_id() == regs::VENDOR_ID && desc.product_id() == regs::PRODUCT_ID
                    })
                    .unwrap_or(false)
            })
            .ok_or(Error::NotFound)?;

        log::debug!("found Hantek 6000-series device at {:?}", device);

        let mut handle = device.open().map_err(|err| Error::CantOpen(Box::new(err)))?;
        handle
            .claim_interface(0)
            .map_err(|err| Error::CantOpen(Box::new(err)))?;

        log::debug!("claimed interface 0");
        Ok(RusbTransport { handle })
    }
}

#[cfg(feature = "hardware")]
impl Drop for RusbTransport {
    fn drop(&mut self) {
        let _ = self.handle.release_interface(0);
    }
}

#[cfg(feature = "hardware")]
impl Transport for RusbTransport {
    fn control_in(&mut self, request: u8, value: u16, index: u16, buf: &mut [u8]) -> Result<usize> {
        self.handle
            .read_control(
                rusb::request_type(rusb::Direction::In, rusb::RequestType::Vendor, rusb::Recipient::Device),
                request,
                value,
                index,
                buf,
                Self::TIMEOUT,
            )
            .map_err(|_| Error::ControlFail)
    }

    fn control_out(&mut self, request: u8, value: u16, index: u16, buf: &[u8]) -> Result<usize> {
        self.handle
            .write_control(
                rusb::request_type(rusb::Direction::Out, rusb::RequestType::Vendor, rusb::Recipient::Device),
                request,
                value,
                index,
                buf,
                Self::TIMEOUT,
            )
            .map_err(|_| Error::ControlFail)
    }

    fn bulk_out_raw(&mut self, buf: &[u8]) -> Result<usize> {
        self.handle
            .write_bulk(regs::EP_OUT, buf, Self::TIMEOUT)
            .map_err(|_| Error::NotReady)
    }

    fn bulk_in_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.handle
            .read_bulk(regs::EP_IN, buf, Self::TIMEOUT)
            .map_err(|_| Error::NotReady)
    }
}
