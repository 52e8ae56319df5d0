//! Timebase (component C6): translate a [`TimePerDivision`] into the 32-bit
//! "spacing minus one" register write (§4.4).

use crate::clock::Clock;
use crate::config::TimePerDivision;
use crate::regs::msg;
use crate::session::Session;
use crate::usb::Transport;
use crate::Result;

/// Build the `SET_TIME_DIVISION` message: `{0x0F, 0x00, s0, s1, s2, s3}` where
/// `s0..s3` is `spacing - 1` little-endian.
pub fn set_sampling_rate_message(tpd: TimePerDivision) -> [u8; 6] {
    let spacing = tpd.spacing() - 1;
    let bytes = spacing.to_le_bytes();
    [msg::SET_TIME_DIVISION, 0x00, bytes[0], bytes[1], bytes[2], bytes[3]]
}

impl<T: Transport, C: Clock> Session<T, C> {
    /// `set_sampling_rate` (§4.4): push the timebase's spacing register and remember
    /// it on the session. Independent of channel/ADC/trigger state, so callers may
    /// issue it at any point in the configuration sequence (S2 issues it after the
    /// frontend and ADC routing, before the trigger).
    pub fn set_timebase(&mut self, tpd: TimePerDivision) -> Result<()> {
        log::debug!("set_timebase({:?}), spacing={}", tpd, tpd.spacing());
        self.transport.bulk_out(&set_sampling_rate_message(tpd))?;
        self.timebase = tpd;
        Ok(())
    }
}
