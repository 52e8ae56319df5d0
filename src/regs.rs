//! Constants for the Hantek 6000-series USB-on-the-wire protocol: vendor IDs, control
//! request numbers, bulk message IDs, SPI chip-selects and HMCAD1511 register addresses.
//!
//! See `doc/` in the vendor SDK for the (sparse) origin of these values; names and
//! comments here follow the conventions the device's own header uses.

#![allow(dead_code)]

use bitflags::bitflags;

pub const VENDOR_ID: u16 = 0x04b5;
pub const PRODUCT_ID: u16 = 0x6cde;

pub const EP_OUT: u8 = 0x02;
pub const EP_IN: u8 = 0x06 | 0x80;

/// "Start of transaction" prelude sent as a control-OUT before every bulk-OUT command.
pub const REQUEST_INITIALIZE: u8 = 0xb3;
pub const INITIALIZE_PAYLOAD: [u8; 10] = [0x0f, 0x03, 0x03, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Readiness probe; byte 0 of the 10-byte reply is 0x01 when the device has finished
/// applying the previous bulk-OUT payload and will accept another one.
pub const REQUEST_CHECK_READY: u8 = 0xb2;
pub const CHECK_READY_REPLY_LEN: usize = 10;
pub const READY_BYTE: u8 = 0x01;

pub const REQUEST_GET_INFO: u8 = 0xa2;
pub const VALUE_GET_INFO_STRING: u16 = 0x1580;
pub const VALUE_GET_CALIBRATION_DATA: u16 = 0x1600;
pub const INFO_STRING_LEN: usize = 0x47;

pub const REQUEST_FLASH_ACCESS: u8 = 0xf1;
pub const VALUE_FLASH_ACCESS: u16 = 0x1e00;
pub const FLASH_CHUNK_LEN: usize = 0x40;
pub const FLASH_SIZE: usize = 0x80000;

/// Bulk message IDs (first byte of every bulk-OUT payload).
pub mod msg {
    pub const POSITION_CH0: u8 = 0x00;
    pub const POSITION_CH1: u8 = 0x01;
    pub const POSITION_CH2: u8 = 0x02;
    // note the gap: 0x03 is start-capture, not position-ch3
    pub const START_CAPTURE: u8 = 0x03;
    pub const POSITION_CH3: u8 = 0x04;
    pub const READBACK_BUFFER: u8 = 0x05;
    pub const GET_STATUS: u8 = 0x06;
    pub const SET_TRIGGER_LEVEL: u8 = 0x07;
    pub const SEND_SPI: u8 = 0x08;
    pub const GET_HW_VERSION: u8 = 0x09;
    pub const RESET: u8 = 0x0c;
    pub const BUFFER_STATUS: u8 = 0x0d;
    pub const BUFFER_PREPARE_TRANSFER: u8 = 0x0e;
    pub const SET_TIME_DIVISION: u8 = 0x0f;
    pub const SET_TRIG_HORIZ_POS: u8 = 0x10;
    pub const CONFIGURE_TRIGGER: u8 = 0x11;
    pub const SET_TRIGGER_SOURCE: u8 = 0x12;
    pub const SET_SPECIAL_TRIGGER: u8 = 0x13;

    pub fn position_ch(channel: usize) -> u8 {
        [POSITION_CH0, POSITION_CH1, POSITION_CH2, POSITION_CH3][channel]
    }
}

/// SPI chip-select byte (offset 6 of a `SEND_SPI` envelope).
pub mod cs {
    pub const SHIFT_REGISTER: u8 = 0x01;
    pub const ADF4360: u8 = 0x02;
    pub const HMCAD1511: u8 = 0x04;
}

/// HMCAD1511 register addresses, reached only via SPI (CS = [`cs::HMCAD1511`]).
pub mod hmcad1511 {
    pub const REG_SLEEP_PD: u8 = 0x0f;
    pub const REG_LVDS_TERM: u8 = 0x12;
    pub const REG_CGAIN4: u8 = 0x2a;
    pub const REG_CGAIN2_1: u8 = 0x2b;
    pub const REG_CHAN_NUM_CLK_DIV: u8 = 0x31;
    pub const REG_GAIN_CONTROL: u8 = 0x33;
    pub const REG_INP_SEL_CH_LO: u8 = 0x3a;
    pub const REG_INP_SEL_CH_HI: u8 = 0x3b;
    pub const REG_FS_CNTRL: u8 = 0x55;
}

bitflags! {
    /// The front-end shift register's per-channel configuration byte (§4.3 bit-layout
    /// table). Bits 6/5 and 4/3 are complementary pairs that each encode one three-way
    /// vpd-tier boundary rather than independent flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChannelConfigBits: u8 {
        const BwLimit            = 1 << 7;
        const VpdAboveOneVolt    = 1 << 6;
        const VpdAtMostOneVolt   = 1 << 5;
        const VpdAboveHundredMv  = 1 << 4;
        const VpdAtMostHundredMv = 1 << 3;
        const DcCoupling         = 1 << 2;
        const Constant           = 1 << 1;
    }
}

/// Bits that survive the second ("latch") commit write (§4.3 step 3).
pub const CHANNEL_CONFIG_LATCH_MASK: ChannelConfigBits = ChannelConfigBits::BwLimit
    .union(ChannelConfigBits::DcCoupling)
    .union(ChannelConfigBits::Constant);

/// Build the 8-byte `SEND_SPI` envelope (§2, §4.2): message id, a reserved zero byte,
/// the 32-bit SPI payload MSB-first (`spi[0]` is clocked first), the chip-select byte,
/// and a trailing zero.
pub fn send_spi_message(spi: [u8; 4], cs: u8) -> [u8; 8] {
    [msg::SEND_SPI, 0x00, spi[0], spi[1], spi[2], spi[3], cs, 0x00]
}

/// Pack an HMCAD1511 register write into the 32-bit SPI field: a reserved top byte,
/// the register address, then the 16-bit value big-endian (high byte before low byte).
pub fn hmcad1511_register_write(reg_addr: u8, value: u16) -> [u8; 4] {
    [0x00, reg_addr, (value >> 8) as u8, value as u8]
}
