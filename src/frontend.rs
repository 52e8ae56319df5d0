//! Frontend & channels (component C4): the per-channel configuration byte, the
//! two-stage shift-register commit, and the calibration-driven vertical-offset DAC
//! code (§4.3).

use std::time::Duration;

use crate::clock::Clock;
use crate::config::{ChannelConfig, Coupling, Vpd};
use crate::identity::CALIBRATION_ENTRIES_PER_CHANNEL;
use crate::regs::{self, msg, ChannelConfigBits, CHANNEL_CONFIG_LATCH_MASK};
use crate::session::Session;
use crate::usb::Transport;
use crate::{Error, Result};

/// Per-vpd divisor applied to the calibration spread in the vertical-offset recipe
/// (§4.3, §9 "Calibration table indexing").
const VPD_SCALE: [i32; 12] = [50, 20, 10, 5, 2, 1, 5, 2, 1, 5, 2, 1];

/// Row offset for the high/low calibration pair, selected by vpd tier (§4.3, §9).
fn calibration_offset(vpd: Vpd) -> usize {
    match vpd as u8 {
        0..=5 => 0x3c,
        6..=8 => 0x60,
        _ => 0x84,
    }
}

/// The per-channel configuration byte (§4.3 bit layout table). Bits 6/5 and 4/3 are
/// complementary pairs rather than independent flags — each pair encodes one
/// three-way vpd tier boundary.
fn channel_config_byte(channel: &ChannelConfig) -> u8 {
    let vpd = channel.vpd as u8;
    let mut bits = ChannelConfigBits::Constant;
    if channel.bw_limit {
        bits |= ChannelConfigBits::BwLimit;
    }
    bits |= if vpd > Vpd::V1 as u8 {
        ChannelConfigBits::VpdAboveOneVolt
    } else {
        ChannelConfigBits::VpdAtMostOneVolt
    };
    bits |= if vpd > Vpd::Mv100 as u8 {
        ChannelConfigBits::VpdAboveHundredMv
    } else {
        ChannelConfigBits::VpdAtMostHundredMv
    };
    if channel.coupling == Coupling::DC {
        bits |= ChannelConfigBits::DcCoupling;
    }
    bits.bits()
}

/// 16-bit vertical-offset DAC code for one channel (§4.3 "Vertical offset write").
/// `row` is that channel's 144-word calibration slice.
fn compute_dac_code(vpd: Vpd, level: u8, row: &[u16]) -> u16 {
    let offset = calibration_offset(vpd);
    let hi = row[offset] as f64;
    let lo = row[offset + 1] as f64;
    let v = ((hi + lo) / 2.0).round();
    let scale = VPD_SCALE[vpd as usize] as f64;
    let x = (lo - v) / scale;
    let q = x.round();
    let upper = v + q;
    let lower = v - q;
    let dac = (((upper - lower) / 255.0) * level as f64).round() + lower;
    dac as u16
}

impl<T: Transport, C: Clock> Session<T, C> {
    /// `configure_channel_frontend` (§4.3): update channel `n`'s record, commit all
    /// four channels' configuration bytes to the shift register, then rewrite every
    /// channel's vertical-offset DAC code (the wire message is whole-state, not a
    /// delta, so a single changed channel still requires all four writes).
    pub fn configure_channel_frontend(
        &mut self,
        n: usize,
        vpd: Vpd,
        coupling: Coupling,
        bw_limit: bool,
        enabled: bool,
        level: u8,
    ) -> Result<()> {
        let channel = self.channels.get_mut(n).ok_or(Error::BadArgs)?;
        channel.vpd = vpd;
        channel.coupling = coupling;
        channel.bw_limit = bw_limit;
        channel.enabled = enabled;
        channel.level = level;

        self.commit_frontend()?;
        for ch in 0..4 {
            self.write_vertical_offset(ch)?;
        }
        Ok(())
    }

    /// The two-stage commit (§4.3 steps 1-4), separated by the mandatory 4 ms and
    /// 50 ms settling sleeps (S6).
    fn commit_frontend(&mut self) -> Result<()> {
        let cfg: Vec<u8> = self.channels.iter().map(channel_config_byte).collect();
        let cfg: [u8; 4] = cfg.try_into().unwrap();

        log::trace!("commit_frontend: stage 1 config bytes = {:02x?}", cfg);
        self.transport
            .bulk_out(&regs::send_spi_message(cfg, regs::cs::SHIFT_REGISTER))?;
        self.clock.sleep(Duration::from_millis(4));

        let latched = cfg.map(|byte| byte & CHANNEL_CONFIG_LATCH_MASK.bits());
        log::trace!("commit_frontend: stage 2 latched bytes = {:02x?}", latched);
        self.transport
            .bulk_out(&regs::send_spi_message(latched, regs::cs::SHIFT_REGISTER))?;
        self.clock.sleep(Duration::from_millis(50));
        Ok(())
    }

    fn write_vertical_offset(&mut self, channel: usize) -> Result<()> {
        let start = channel * CALIBRATION_ENTRIES_PER_CHANNEL;
        let row = &self.identity.calibration[start..start + CALIBRATION_ENTRIES_PER_CHANNEL];
        let dac = compute_dac_code(self.channels[channel].vpd, self.channels[channel].level, row);
        log::debug!("write_vertical_offset(channel={}) = {:#06x}", channel, dac);
        let bytes = dac.to_le_bytes();
        self.transport
            .bulk_out(&[msg::position_ch(channel), 0x00, bytes[0], bytes[1]])?;
        self.clock.sleep(Duration::from_millis(10));
        Ok(())
    }
}
