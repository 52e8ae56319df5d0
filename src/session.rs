//! Session & enumeration (component C2): the open/close lifecycle and the cold-start
//! handshake that takes the device from reset to a parsed identity and validated
//! calibration table (§4.2).

use crate::clock::{Clock, RealClock};
use crate::config::{ChannelConfig, TimePerDivision};
use crate::identity::{DeviceIdentity, CALIBRATION_INFO_ENTRIES};
use crate::regs;
use crate::trigger::TriggerConfig;
use crate::usb::Transport;
use crate::{Error, Result};

/// §3: "Capture-buffer length (constructor argument; constrained to 1 ≤ len ≤ 65536)".
pub const MIN_CAPTURE_BUFFER_LEN: usize = 1;
pub const MAX_CAPTURE_BUFFER_LEN: usize = 65536;

/// The five 8-byte `SEND_SPI` payloads that wake the PLL and ADC after reset (§4.2).
/// `spi` is MSB-first as tabulated in the source; `cs` selects the HMCAD1511 or the
/// ADF4360 PLL latch.
const WAKE_SEQUENCE: [([u8; 4], u8); 5] = [
    ([0x00, 0x00, 0x77, 0x47], regs::cs::HMCAD1511),
    ([0x00, 0x00, 0x03, 0x00], regs::cs::HMCAD1511),
    ([0x00, 0x00, 0x65, 0x00], regs::cs::ADF4360),
    ([0x00, 0x00, 0x28, 0xf1], regs::cs::ADF4360),
    ([0x00, 0x00, 0x12, 0x38], regs::cs::ADF4360),
];

/// Device session (§3 "Device session"). Generic over the USB transport so the whole
/// control plane can run against a mock in tests; generic over the clock for the same
/// reason on the settling/latching sleeps C4/C5 issue.
pub struct Session<T: Transport, C: Clock = RealClock> {
    pub(crate) transport: T,
    pub(crate) clock: C,
    pub fpga_version: u16,
    pub identity: DeviceIdentity,
    pub capture_buffer_len: usize,
    pub channels: [ChannelConfig; 4],
    pub trigger: Option<TriggerConfig>,
    pub timebase: TimePerDivision,
}

impl<T: Transport> Session<T, RealClock> {
    /// Open against the real system clock. See [`Session::open_with_clock`] for the
    /// full initialization sequence.
    pub fn open(transport: T, capture_buffer_len: usize) -> Result<Self> {
        Self::open_with_clock(transport, RealClock, capture_buffer_len)
    }
}

impl<T: Transport, C: Clock> Session<T, C> {
    /// Cold-open sequence (§4.2 steps 4-11): reset, FPGA version probe, SPI wake
    /// sequence, ID string + calibration readout with sentinel check, hardware
    /// revision. Enumeration, opening, and interface claim happen one layer down, in
    /// the transport's own constructor (e.g. [`crate::usb::RusbTransport::open`]) —
    /// this is the part of open that is common to every transport.
    ///
    /// On any failure the transport is dropped along with everything built so far,
    /// matching the acquire-then-guarantee-release resource model (§5, §9).
    pub fn open_with_clock(mut transport: T, clock: C, capture_buffer_len: usize) -> Result<Self> {
        if !(MIN_CAPTURE_BUFFER_LEN..=MAX_CAPTURE_BUFFER_LEN).contains(&capture_buffer_len) {
            return Err(Error::BadArgs);
        }

        transport.bulk_out(&[regs::msg::RESET, 0x00])?;

        let mut status_word = [0u8; 64];
        transport.bulk_in(&mut status_word)?;
        let fpga_version = u16::from_le_bytes([status_word[0], status_word[1]]);
        log::debug!("fpga version {:#06x}", fpga_version);

        for &(spi, cs) in &WAKE_SEQUENCE {
            transport.bulk_out(&regs::send_spi_message(spi, cs))?;
        }

        let mut raw = [0u8; regs::INFO_STRING_LEN];
        transport.get_info(regs::VALUE_GET_INFO_STRING, &mut raw)?;
        let pcb_revision = DeviceIdentity::parse_pcb_revision(&raw);
        let serial_number = DeviceIdentity::parse_serial_number(&raw);
        log::debug!("pcb revision {}, serial {:?}", pcb_revision, serial_number);

        let mut cal_bytes = vec![0u8; CALIBRATION_INFO_ENTRIES * 2];
        transport.get_info(regs::VALUE_GET_CALIBRATION_DATA, &mut cal_bytes)?;
        let calibration = DeviceIdentity::parse_calibration(&cal_bytes)?;

        transport.bulk_out(&[regs::msg::GET_HW_VERSION, 0x00])?;
        let mut hw_buf = [0u8; 4];
        transport.bulk_in(&mut hw_buf)?;
        let hardware_revision = u32::from_le_bytes(hw_buf);

        Ok(Session {
            transport,
            clock,
            fpga_version,
            identity: DeviceIdentity {
                raw,
                pcb_revision,
                serial_number,
                hardware_revision,
                calibration,
            },
            capture_buffer_len,
            channels: [ChannelConfig::default(); 4],
            trigger: None,
            timebase: TimePerDivision::default(),
        })
    }

    /// Whether this PCB revision takes the alternate scaling-constant branch (§4.5,
    /// I5). Named after the revision itself rather than "is_alt" so the callers in
    /// C5 read like the spec's own table.
    pub fn is_pcb_revision_105(&self) -> bool {
        self.identity.pcb_revision == 105
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the session. The USB handle is released by `T`'s own `Drop`; this
    /// method exists to make the end of the session's lifetime explicit at the call
    /// site (§4.2 "close(session)").
    pub fn close(self) {
        drop(self)
    }
}
