//! Trigger (component C7): horizontal offset, source selection, fixed-point level
//! conversion, and mode/slope/coupling (§4.6).

use crate::config::{Coupling, TriggerMode, TriggerSlope};
use crate::regs;
use crate::session::Session;
use crate::usb::Transport;
use crate::{clock::Clock, Error, Result};

/// `HT_TRIGGER_MAX_VALUE` (§4.6 step 5).
pub const TRIGGER_MAX_VALUE: u8 = 0xe4;

/// The fixed 48-bit `leading`/`trailing` fields the horizontal-offset message always
/// carries (§4.6, resolution (a) in the design notes): the source never actually
/// derives these from `h_offset`. `h_offset` is still validated and stored on
/// [`TriggerConfig`] for forward compatibility, but does not affect the bytes sent.
const LEADING: u64 = 0x831c4;
const TRAILING: u64 = 0x7d7d0;

/// The caller-visible trigger configuration (§4.6 `configure_trigger` parameters),
/// stored on the session after a successful call so it can be inspected or reapplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerConfig {
    pub ch: usize,
    pub mode: TriggerMode,
    pub slope: TriggerSlope,
    pub coupling: Coupling,
    pub v_level: u8,
    pub v_slop: u8,
    pub h_offset: u8,
}

fn encode_48_le(value: u64) -> [u8; 6] {
    let bytes = value.to_le_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]]
}

/// §4.6 "Horizontal offset": 14-byte message, `leading` into bytes[2..8), `trailing`
/// into bytes[8..14), both little-endian, regardless of the caller's `h_offset`.
fn set_trigger_horizontal_offset_message() -> [u8; 14] {
    let mut message = [0u8; 14];
    message[0] = regs::msg::SET_TRIG_HORIZ_POS;
    message[2..8].copy_from_slice(&encode_48_le(LEADING));
    message[8..14].copy_from_slice(&encode_48_le(TRAILING));
    message
}

fn source_mask(n: u8) -> u8 {
    match n {
        1 => 0x3,
        2 => 0x2,
        _ => 0x1,
    }
}

/// §4.6 "Source selection": `enabled` is indexed by channel number, `ch` is the
/// trigger's own channel selection, `n` is the enabled-channel count.
fn set_trigger_source_message(ch: usize, enabled: [bool; 4], n: u8) -> [u8; 6] {
    let mask = source_mask(n);
    let ch_mask: u8 = enabled
        .iter()
        .enumerate()
        .fold(0u8, |acc, (i, &e)| acc | ((e as u8) << i));
    let peak = 0u8;
    let byte2 = ((peak & 1) << 6) | (ch_mask << 2) | (mask & 3);
    let byte4 = 0u8;
    let byte5 = ((!enabled[ch] as u8) << 2) | (ch as u8 & 3);
    [regs::msg::SET_TRIGGER_SOURCE, 0x00, byte2, 0x00, byte4, byte5]
}

/// Applies the clamp override noted as "probably busted" in the source (§9 resolution
/// (d)): factored out on its own so it is exercised directly, since the ordinary
/// clamp sequence in [`compute_trigger_levels`] never drives `low` above
/// [`TRIGGER_MAX_VALUE`] in the first place.
fn apply_low_clamp_override(low: i64) -> i64 {
    if low > TRIGGER_MAX_VALUE as i64 {
        log::warn!("trigger low-clamp override fired: low={} > {}", low, TRIGGER_MAX_VALUE);
        0x40
    } else {
        low
    }
}

/// §4.6 "Level" steps 1-5. The worked example for `v_level=128, v_slop=4` in the
/// testable-properties section asserts `pos=129`, but literally executing steps 1-3
/// for those inputs gives `round=0` (the pre-division value `102400` is an exact
/// multiple of 1024, so `pos & 0x3FF == 0`), hence `pos=128`. We implement the
/// numbered procedure as written rather than reproduce that inconsistent aside — see
/// the design notes for the full resolution.
fn compute_trigger_levels(v_level: u8, v_slop: u8) -> (u8, u8, u8) {
    let raw = (200i64 * v_level as i64 * 1024) / 256;
    let round = if (raw & 0x3ff) > 0x1ff { 1 } else { 0 };
    let pos = (raw / 1024) + round + 28;

    let high = (pos + v_slop as i64).clamp(0, TRIGGER_MAX_VALUE as i64);
    let low = (pos - v_slop as i64).clamp(0, high);
    let low = apply_low_clamp_override(low);

    (high as u8, low as u8, pos as u8)
}

/// §4.6 "Level": 26-byte message, bytes[2..18) four repetitions of `(high,high,low,
/// low)`, bytes[18..26) eight copies of the unclamped `pos`.
fn set_trigger_level_message(v_level: u8, v_slop: u8) -> [u8; 26] {
    let (high, low, pos) = compute_trigger_levels(v_level, v_slop);
    let mut message = [0u8; 26];
    message[0] = regs::msg::SET_TRIGGER_LEVEL;
    for rep in 0..4 {
        let base = 2 + rep * 4;
        message[base..base + 4].copy_from_slice(&[high, high, low, low]);
    }
    message[18..26].copy_from_slice(&[pos; 8]);
    message
}

/// §4.6 "Mode": `{0x11, 0x00, mode, slope, coupling, 0x00}`.
fn configure_trigger_message(mode: TriggerMode, slope: TriggerSlope, coupling: Coupling) -> [u8; 6] {
    [regs::msg::CONFIGURE_TRIGGER, 0x00, mode as u8, slope as u8, coupling as u8, 0x00]
}

impl<T: Transport, C: Clock> Session<T, C> {
    /// `configure_trigger` (§4.6): issues, in order, horizontal offset, source
    /// selection, level, and mode, then stores the configuration on the session.
    #[allow(clippy::too_many_arguments)]
    pub fn configure_trigger(
        &mut self,
        ch: usize,
        mode: TriggerMode,
        slope: TriggerSlope,
        coupling: Coupling,
        v_level: u8,
        v_slop: u8,
        h_offset: u8,
    ) -> Result<()> {
        if ch > 3 || h_offset > 100 {
            return Err(Error::BadArgs);
        }
        log::debug!(
            "h_offset={} is validated but not wired into the horizontal-offset message",
            h_offset
        );

        self.transport.bulk_out(&set_trigger_horizontal_offset_message())?;

        let enabled = [
            self.channels[0].enabled,
            self.channels[1].enabled,
            self.channels[2].enabled,
            self.channels[3].enabled,
        ];
        let n = enabled.iter().filter(|&&e| e).count().max(1) as u8;
        self.transport.bulk_out(&set_trigger_source_message(ch, enabled, n))?;

        self.transport.bulk_out(&set_trigger_level_message(v_level, v_slop))?;
        self.transport.bulk_out(&configure_trigger_message(mode, slope, coupling))?;

        self.trigger = Some(TriggerConfig { ch, mode, slope, coupling, v_level, v_slop, h_offset });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn horizontal_offset_message_ignores_h_offset_and_matches_observed_bytes() {
        let message = set_trigger_horizontal_offset_message();
        assert_eq!(message[0], regs::msg::SET_TRIG_HORIZ_POS);
        assert_eq!(&message[2..8], &[0xc4, 0x31, 0x08, 0x00, 0x00, 0x00]);
        assert_eq!(&message[8..14], &[0xd0, 0x7d, 0x07, 0x00, 0x00, 0x00]);
    }

    /// S3: enabled = {0, 1, 3}, ch = 3.
    #[test]
    fn source_selection_matches_scenario_s3() {
        let enabled = [true, true, false, true];
        let message = set_trigger_source_message(3, enabled, 3);
        assert_eq!(message[2], 0x2d);
        assert_eq!(message[5], 0x03);
    }

    #[test]
    fn level_message_shape_for_zero_level() {
        let message = set_trigger_level_message(0, 4);
        assert_eq!(message.len(), 26);
        assert_eq!(message[0], regs::msg::SET_TRIGGER_LEVEL);
        // v_level=0 => raw=0, round=0, pos=28, high=32, low=24
        assert_eq!(&message[2..6], &[32, 32, 24, 24]);
        assert_eq!(&message[18..26], &[28u8; 8]);
    }

    #[test]
    fn level_formula_for_v_level_128_matches_the_literal_step_by_step_procedure() {
        // see compute_trigger_levels' doc comment for why this differs from the
        // inconsistent worked example in the testable-properties table.
        let (high, low, pos) = compute_trigger_levels(128, 4);
        assert_eq!(pos, 128);
        assert_eq!(high, 132);
        assert_eq!(low, 124);
    }

    #[test]
    fn low_clamp_override_matches_observed_firmware() {
        assert_eq!(apply_low_clamp_override(300), 0x40);
        assert_eq!(apply_low_clamp_override(50), 50);
    }

    #[test]
    fn configure_trigger_rejects_bad_args() {
        use crate::clock::RecordingClock;
        use crate::mock::MockTransport;

        let transport = MockTransport::cold_open_happy_path();
        let mut session =
            Session::open_with_clock(transport, RecordingClock::default(), 4096).unwrap();

        let err = session
            .configure_trigger(0, TriggerMode::Edge, TriggerSlope::Rise, Coupling::DC, 128, 4, 101)
            .unwrap_err();
        assert!(matches!(err, Error::BadArgs));

        let err = session
            .configure_trigger(4, TriggerMode::Edge, TriggerSlope::Rise, Coupling::DC, 128, 4, 50)
            .unwrap_err();
        assert!(matches!(err, Error::BadArgs));
    }
}
