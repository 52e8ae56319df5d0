//! Bitstream flash readout: the `FLASH_ACCESS` collaborator that reads the entire
//! on-chip bitstream region back to the host, 64 bytes per control transfer (§4.1,
//! §6). Read-only — rewriting the bitstream is out of scope.

use crate::clock::Clock;
use crate::regs;
use crate::session::Session;
use crate::usb::Transport;
use crate::Result;

impl<T: Transport, C: Clock> Session<T, C> {
    /// Read the entire `0x80000`-byte bitstream flash region, `FLASH_CHUNK_LEN` bytes
    /// at a time (S4: exactly `FLASH_SIZE / FLASH_CHUNK_LEN` = 8192 control transfers).
    pub fn read_flash(&mut self) -> Result<Vec<u8>> {
        let chunks = regs::FLASH_SIZE / regs::FLASH_CHUNK_LEN;
        log::debug!("read_flash: {} chunks of {} bytes", chunks, regs::FLASH_CHUNK_LEN);
        let mut flash = Vec::with_capacity(regs::FLASH_SIZE);
        let mut chunk = [0u8; regs::FLASH_CHUNK_LEN];
        for i in 0..chunks {
            self.transport.read_flash_chunk(&mut chunk)?;
            log::trace!("read_flash: chunk {}/{}", i + 1, chunks);
            flash.extend_from_slice(&chunk);
        }
        Ok(flash)
    }
}
