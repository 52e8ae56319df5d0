//! Capture (component C8): start/stop, status polling, and the prepare-transfer +
//! readback sequence that fills per-channel byte buffers (§4.7).

use crate::clock::Clock;
use crate::config::CaptureMode;
use crate::regs;
use crate::session::Session;
use crate::usb::Transport;
use crate::{Error, Result};

/// Bit in both the one-byte `get_status` reply and the 40-bit `BUFFER_STATUS` word
/// that means "data ready" (§4.7).
const DATA_READY_BIT: u64 = 0x02;

/// Safety bound on the status-poll loop in [`Session::retrieve_buffer`]. The source
/// polls unboundedly; a library call that can hang forever on a wedged device is a
/// worse failure mode than a bounded retry, so this caps it and surfaces `NotReady`.
const MAX_STATUS_POLLS: usize = 10_000;

/// Four per-channel byte buffers returned by [`Session::retrieve_buffer`].
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffers {
    pub channels: [Vec<u8>; 4],
}

/// Split a raw capture stream into `n` per-channel byte streams. The HMCAD1511
/// interleaves samples round-robin across its enabled ADC cores in ascending channel
/// order, so de-interleaving is a strided split. The source never implements this
/// step (§9, resolution (b)); this shape is reconstructed from the ADC's documented
/// interleave behavior rather than carried over from the original.
pub fn deinterleave(raw: &[u8], n: usize) -> [Vec<u8>; 4] {
    let mut channels: [Vec<u8>; 4] = Default::default();
    if n == 0 {
        return channels;
    }
    for (i, &byte) in raw.iter().enumerate() {
        channels[i % n].push(byte);
    }
    channels
}

fn status_word_from_bytes(status: [u8; 5]) -> u64 {
    (0..5).fold(0u64, |acc, i| acc | (status[i] as u64) << (8 * i))
}

impl<T: Transport, C: Clock> Session<T, C> {
    /// `start_capture(mode)` (§4.7): `{0x03, 0x00, mode, 0x00}`. Rejects a start with no
    /// enabled channels (I4) rather than letting it run to a poll that can never see
    /// meaningful data.
    pub fn start_capture(&mut self, mode: CaptureMode) -> Result<()> {
        let n = self.channels.iter().filter(|c| c.enabled).count();
        if n == 0 {
            return Err(Error::InvalChannels);
        }
        log::debug!("start_capture(mode={:?}), {} channel(s) enabled", mode, n);
        self.transport
            .bulk_out(&[regs::msg::START_CAPTURE, 0x00, mode as u8, 0x00])
    }

    /// `get_status(&data_ready)` (§4.7): one-byte bulk-IN, bit 1 is data-ready. Other
    /// status bits (triggered, pack state, SDRAM init) are not surfaced by the public
    /// API, matching the source.
    pub fn get_status(&mut self) -> Result<bool> {
        self.transport.bulk_out(&[regs::msg::GET_STATUS, 0x00])?;
        let mut status = [0u8; 1];
        self.transport.bulk_in(&mut status)?;
        let ready = (status[0] as u64 & DATA_READY_BIT) != 0;
        log::trace!("get_status() = {:#04x}, data_ready={}", status[0], ready);
        Ok(ready)
    }

    /// `retrieve_buffer` (§4.7): poll `BUFFER_STATUS` until data is ready, issue
    /// `BUFFER_PREPARE_TRANSFER` then `READBACK_BUFFER` with the capture half-length,
    /// then bulk-IN the whole per-channel volume and de-interleave it by the current
    /// enabled-channel count.
    pub fn retrieve_buffer(&mut self) -> Result<CaptureBuffers> {
        let n = self.channels.iter().filter(|c| c.enabled).count();
        if n == 0 {
            return Err(Error::InvalChannels);
        }

        for _ in 0..MAX_STATUS_POLLS {
            self.transport.bulk_out(&[regs::msg::BUFFER_STATUS, 0x00])?;
            let mut status = [0u8; 5];
            self.transport.bulk_in(&mut status)?;
            let word = status_word_from_bytes(status);
            log::trace!("retrieve_buffer: BUFFER_STATUS = {:#012x}", word);
            if word & DATA_READY_BIT != 0 {
                return self.do_retrieve_buffer(n);
            }
        }
        log::debug!("retrieve_buffer: gave up after {} polls", MAX_STATUS_POLLS);
        Err(Error::NotReady)
    }

    fn do_retrieve_buffer(&mut self, n: usize) -> Result<CaptureBuffers> {
        self.transport
            .bulk_out(&[regs::msg::BUFFER_PREPARE_TRANSFER, 0x00, 0x00, 0x00])?;

        let half_len = (self.capture_buffer_len / 2) as u16;
        let len_bytes = half_len.to_le_bytes();
        log::debug!("retrieve_buffer: reading back half_len={}, n={}", half_len, n);
        self.transport
            .bulk_out(&[regs::msg::READBACK_BUFFER, 0x00, len_bytes[0], len_bytes[1]])?;

        let mut raw = vec![0u8; self.capture_buffer_len * n];
        self.transport.bulk_in(&mut raw)?;
        Ok(CaptureBuffers { channels: deinterleave(&raw, n) })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::RecordingClock;
    use crate::mock::MockTransport;

    #[test]
    fn deinterleave_splits_round_robin() {
        let raw: Vec<u8> = (0..8).collect();
        let channels = deinterleave(&raw, 2);
        assert_eq!(channels[0], vec![0, 2, 4, 6]);
        assert_eq!(channels[1], vec![1, 3, 5, 7]);
        assert!(channels[2].is_empty());
    }

    #[test]
    fn deinterleave_with_one_channel_is_identity() {
        let raw: Vec<u8> = (0..4).collect();
        let channels = deinterleave(&raw, 1);
        assert_eq!(channels[0], raw);
    }

    #[test]
    fn start_capture_message_shape() {
        let transport = MockTransport::cold_open_happy_path();
        let mut session =
            Session::open_with_clock(transport, RecordingClock::default(), 16).unwrap();
        session.channels[0].enabled = true;
        session.start_capture(CaptureMode::Roll).unwrap();
        let last = session.transport_mut().last_bulk_out().unwrap();
        assert_eq!(last, vec![0x03, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn start_capture_rejects_zero_enabled_channels() {
        let transport = MockTransport::cold_open_happy_path();
        let mut session =
            Session::open_with_clock(transport, RecordingClock::default(), 16).unwrap();
        let err = session.start_capture(CaptureMode::Single).unwrap_err();
        assert!(matches!(err, Error::InvalChannels));
    }

    #[test]
    fn get_status_reads_data_ready_bit() {
        let transport = MockTransport::cold_open_happy_path();
        let mut session =
            Session::open_with_clock(transport, RecordingClock::default(), 16).unwrap();
        session.transport_mut().push_bulk_in(vec![0x02]);
        assert!(session.get_status().unwrap());

        session.transport_mut().push_bulk_in(vec![0x00]);
        assert!(!session.get_status().unwrap());
    }

    #[test]
    fn retrieve_buffer_polls_then_reads_back_and_deinterleaves() {
        let transport = MockTransport::cold_open_happy_path();
        let mut session =
            Session::open_with_clock(transport, RecordingClock::default(), 8).unwrap();
        session.channels[0].enabled = true;
        session.channels[1].enabled = true;

        // not-ready status, then ready status
        session.transport_mut().push_bulk_in(vec![0x00; 5]);
        session.transport_mut().push_bulk_in(vec![0x02, 0, 0, 0, 0]);
        session
            .transport_mut()
            .push_bulk_in((0..16).collect::<Vec<u8>>());

        let buffers = session.retrieve_buffer().unwrap();
        assert_eq!(buffers.channels[0].len(), 8);
        assert_eq!(buffers.channels[1].len(), 8);
    }

    #[test]
    fn retrieve_buffer_rejects_zero_enabled_channels() {
        let transport = MockTransport::cold_open_happy_path();
        let mut session =
            Session::open_with_clock(transport, RecordingClock::default(), 8).unwrap();
        let err = session.retrieve_buffer().unwrap_err();
        assert!(matches!(err, Error::InvalChannels));
    }
}
