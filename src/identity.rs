//! Identity and calibration readout (component C3): PCB revision + serial parsed out of
//! the raw identity string, and the factory calibration table with its sentinel check.

use crate::regs;
use crate::{Error, Result};

/// `(12 * 12 * 4) + 1` — 144 entries per channel across 4 channels, plus the trailing
/// sentinel word.
pub const CALIBRATION_INFO_ENTRIES: usize = (12 * 12 * 4) + 1;

/// 144 sixteen-bit words per channel's calibration row.
pub const CALIBRATION_ENTRIES_PER_CHANNEL: usize = 144;

/// The calibration table's last word must equal this, or the device is uncalibrated.
pub const CALIBRATION_SENTINEL: u16 = 0xfbcf;

/// The byte window in the identity string that holds the decimal PCB revision.
const PCB_REVISION_WINDOW: std::ops::Range<usize> = 14..19;
/// The byte window in the identity string that holds the 8-byte ASCII serial number.
const SERIAL_WINDOW: std::ops::Range<usize> = 20..28;

#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    pub raw: [u8; regs::INFO_STRING_LEN],
    pub pcb_revision: u32,
    pub serial_number: [u8; 8],
    pub hardware_revision: u32,
    pub calibration: Vec<u16>,
}

impl DeviceIdentity {
    /// Fold the ASCII digits in `raw[14..19)` into a running decimal, skipping
    /// non-digit bytes (§4.2 step 8).
    pub fn parse_pcb_revision(raw: &[u8; regs::INFO_STRING_LEN]) -> u32 {
        let mut revision: u32 = 0;
        for &byte in &raw[PCB_REVISION_WINDOW] {
            if byte.is_ascii_digit() {
                revision = revision * 10 + (byte - b'0') as u32;
            }
        }
        revision
    }

    pub fn parse_serial_number(raw: &[u8; regs::INFO_STRING_LEN]) -> [u8; 8] {
        let mut serial = [0u8; 8];
        serial.copy_from_slice(&raw[SERIAL_WINDOW]);
        serial
    }

    /// Parse a `GET_INFO/0x1600` byte blob into 16-bit little-endian words and check the
    /// trailing sentinel. Fails with `NotReady` if the blob is the wrong length or the
    /// sentinel is wrong, matching property P6.
    pub fn parse_calibration(bytes: &[u8]) -> Result<Vec<u16>> {
        if bytes.len() != CALIBRATION_INFO_ENTRIES * 2 {
            return Err(Error::NotReady);
        }
        let words: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if words[CALIBRATION_INFO_ENTRIES - 1] != CALIBRATION_SENTINEL {
            log::warn!(
                "calibration sentinel mismatch: got {:#06x}, expected {:#06x}",
                words[CALIBRATION_INFO_ENTRIES - 1],
                CALIBRATION_SENTINEL
            );
            return Err(Error::NotReady);
        }
        Ok(words)
    }

    /// The 144-word calibration row belonging to `channel` (0..=3).
    pub fn calibration_row(&self, channel: usize) -> &[u16] {
        let start = channel * CALIBRATION_ENTRIES_PER_CHANNEL;
        &self.calibration[start..start + CALIBRATION_ENTRIES_PER_CHANNEL]
    }
}
