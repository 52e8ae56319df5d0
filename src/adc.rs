//! ADC routing (component C5): map the set of enabled channels to the HMCAD1511's
//! full-scale range, clock divider, channel count, input-select registers, and
//! coarse-gain registers (§4.5).
//!
//! Order matters: range-scaling, then channel mapping, then channel-count/clock-
//! divider, then coarse gains, because the chip must be powered down around the
//! `CHAN_NUM_CLK_DIV` write.

use std::time::Duration;

use crate::clock::Clock;
use crate::regs::{self, hmcad1511};
use crate::session::Session;
use crate::usb::Transport;
use crate::{Error, Result};

/// Per-vpd coarse-gain nibble (§4.5 "Coarse gains").
const COARSE_GAIN: [u8; 12] = [0xd, 0xa, 0x7, 0x5, 0x2, 0x0, 0x5, 0x2, 0x0, 0x5, 0x2, 0x0];

fn full_scale_byte(n: u8, pcb_revision_105: bool) -> u8 {
    match (n, pcb_revision_105) {
        (1, true) => 0,
        (1, false) => 25,
        (2, true) => 10,
        (2, false) => 48,
        (_, true) => 55,
        (_, false) => 63,
    }
}

fn clock_divider_and_mask(n: u8) -> (u16, u16) {
    match n {
        1 => (0, 0x1),
        2 => (1, 0x2),
        _ => (2, 0x4),
    }
}

impl<T: Transport, C: Clock> Session<T, C> {
    /// `configure_adc_routing` (§4.5): recompute HMCAD1511 routing registers from the
    /// current enabled-channel set. Must run after the frontend has been committed,
    /// since routing depends on which channels are enabled.
    pub fn configure_adc_routing(&mut self) -> Result<()> {
        let enabled: Vec<usize> = (0..4).filter(|&i| self.channels[i].enabled).collect();
        let n = enabled.len();
        if !(1..=4).contains(&n) {
            return Err(Error::InvalChannels);
        }
        let n = n as u8;
        let pcb_revision_105 = self.is_pcb_revision_105();
        log::debug!(
            "configure_adc_routing: enabled={:?}, n={}, pcb_revision_105={}",
            enabled, n, pcb_revision_105
        );

        self.write_full_scale_range(n, pcb_revision_105)?;
        self.write_channel_mapping(&enabled, n)?;
        self.write_clock_divider_and_channel_count(n)?;
        self.write_coarse_gains(&enabled, n)?;
        Ok(())
    }

    fn write_hmcad1511_register(&mut self, reg_addr: u8, value: u16) -> Result<()> {
        log::trace!("write_hmcad1511_register({:#04x}, {:#06x})", reg_addr, value);
        let spi = regs::hmcad1511_register_write(reg_addr, value);
        self.transport
            .bulk_out(&regs::send_spi_message(spi, regs::cs::HMCAD1511))?;
        self.clock.sleep(Duration::from_millis(3));
        Ok(())
    }

    fn write_full_scale_range(&mut self, n: u8, pcb_revision_105: bool) -> Result<()> {
        let value = full_scale_byte(n, pcb_revision_105) as u16;
        self.write_hmcad1511_register(hmcad1511::REG_FS_CNTRL, value)
    }

    fn write_clock_divider_and_channel_count(&mut self, n: u8) -> Result<()> {
        let (clk_div, chan_mask) = clock_divider_and_mask(n);
        self.write_hmcad1511_register(hmcad1511::REG_SLEEP_PD, 0x200)?;
        self.write_hmcad1511_register(hmcad1511::REG_CHAN_NUM_CLK_DIV, (clk_div << 8) | chan_mask)?;
        self.write_hmcad1511_register(hmcad1511::REG_SLEEP_PD, 0x0)
    }

    /// Input-select mapping (§4.5 "Channel mapping"). `chan_map` starts as the
    /// identity one-hot assignment `{1, 2, 4, 8}`; the enabled channels overwrite it
    /// according to the cursor rule that depends on `N`.
    fn write_channel_mapping(&mut self, enabled: &[usize], n: u8) -> Result<()> {
        let mut chan_map = [1u16, 2, 4, 8];
        match n {
            1 => {
                let i = enabled[0];
                let value = 0x2 << i;
                chan_map = [value, value, value, value];
            }
            2 => {
                let mut c = 0usize;
                for &i in enabled {
                    let value = 0x2 << i;
                    chan_map[c] = value;
                    chan_map[c + 1] = value;
                    c += 2;
                }
            }
            _ => {
                for &i in enabled {
                    chan_map[i] = 0x2 << i;
                }
            }
        }
        // §4.5's prose states reg 0x3A = chan_map[2..3], reg 0x3B = chan_map[0..1],
        // but that contradicts property P4's golden values for N=2, enabled={0,2}
        // (reg 0x3A = 0x0202, reg 0x3B = 0x0808). P4 is a captured-traffic golden
        // reference, so it wins: reg 0x3A takes chan_map[0..1], reg 0x3B takes
        // chan_map[2..3].
        let lo = (chan_map[0] << 8) | chan_map[1];
        let hi = (chan_map[2] << 8) | chan_map[3];
        self.write_hmcad1511_register(hmcad1511::REG_INP_SEL_CH_LO, lo)?;
        self.write_hmcad1511_register(hmcad1511::REG_INP_SEL_CH_HI, hi)?;
        Ok(())
    }

    fn write_coarse_gains(&mut self, enabled: &[usize], n: u8) -> Result<()> {
        match n {
            1 => {
                let gain = COARSE_GAIN[self.channels[enabled[0]].vpd as usize] as u16;
                self.write_hmcad1511_register(hmcad1511::REG_CGAIN2_1, gain << 12)
            }
            2 => {
                let gain0 = COARSE_GAIN[self.channels[enabled[0]].vpd as usize] as u16;
                let gain1 = COARSE_GAIN[self.channels[enabled[1]].vpd as usize] as u16;
                let value = gain0 | (gain1 << 4);
                self.write_hmcad1511_register(hmcad1511::REG_CGAIN2_1, value)
            }
            _ => {
                let mut value = 0u16;
                for &i in enabled {
                    let gain = COARSE_GAIN[self.channels[i].vpd as usize] as u16;
                    value |= gain << (4 * i);
                }
                self.write_hmcad1511_register(hmcad1511::REG_CGAIN4, value)
            }
        }
    }
}
