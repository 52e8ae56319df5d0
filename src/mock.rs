//! A scripted [`Transport`] used only by the test suites in other modules, standing
//! in for a real device so the control plane's message-building and sequencing can be
//! exercised without hardware.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::identity::{CALIBRATION_INFO_ENTRIES, CALIBRATION_SENTINEL};
use crate::regs;
use crate::usb::Transport;
use crate::{Error, Result};

struct Inner {
    ready: bool,
    bulk_in_queue: VecDeque<Vec<u8>>,
    info_responses: HashMap<u16, Vec<u8>>,
    flash: Vec<u8>,
    flash_cursor: usize,
    recorded_bulk_outs: Vec<Vec<u8>>,
}

/// Cheaply cloneable handle sharing one recorded-traffic log, so a test can hand a
/// clone to [`crate::Session::open_with_clock`] and still inspect what was sent
/// afterward through the original handle.
#[derive(Clone)]
pub struct MockTransport(Rc<RefCell<Inner>>);

fn sample_id_string() -> Vec<u8> {
    let mut raw = vec![b'.'; regs::INFO_STRING_LEN];
    raw[14..19].copy_from_slice(b"1X2Y3");
    raw[20..28].copy_from_slice(b"D0349120");
    raw
}

fn sample_calibration(sentinel: u16) -> Vec<u8> {
    let mut words = vec![0u16; CALIBRATION_INFO_ENTRIES];
    for (i, word) in words.iter_mut().enumerate() {
        *word = i as u16;
    }
    words[CALIBRATION_INFO_ENTRIES - 1] = sentinel;
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

impl MockTransport {
    /// Fresh mock with no scripted responses; `control_in`/`bulk_in_raw` calls beyond
    /// what was scripted return zero-filled buffers rather than failing, since most
    /// tests only care about what was *sent*.
    pub fn new() -> Self {
        MockTransport(Rc::new(RefCell::new(Inner {
            ready: true,
            bulk_in_queue: VecDeque::new(),
            info_responses: HashMap::new(),
            flash: vec![0u8; regs::FLASH_SIZE],
            flash_cursor: 0,
            recorded_bulk_outs: Vec::new(),
        })))
    }

    /// A mock scripted to satisfy every step of [`crate::Session::open_with_clock`]'s
    /// cold-open sequence (§4.2), matching property P5 and scenario S1's shape (with a
    /// synthetic identity string; see the identity-parsing test fixture for why).
    pub fn cold_open_happy_path() -> Self {
        let mock = Self::new();
        {
            let mut inner = mock.0.borrow_mut();
            let mut version_word = vec![0u8; 64];
            version_word[0..2].copy_from_slice(&0x0102u16.to_le_bytes());
            inner.bulk_in_queue.push_back(version_word);
            inner.bulk_in_queue.push_back(vec![0x2c, 0x01, 0x18, 0x11]);
            inner
                .info_responses
                .insert(regs::VALUE_GET_INFO_STRING, sample_id_string());
            inner.info_responses.insert(
                regs::VALUE_GET_CALIBRATION_DATA,
                sample_calibration(CALIBRATION_SENTINEL),
            );
        }
        mock
    }

    pub fn set_ready(&self, ready: bool) {
        self.0.borrow_mut().ready = ready;
    }

    pub fn push_bulk_in(&self, bytes: Vec<u8>) {
        self.0.borrow_mut().bulk_in_queue.push_back(bytes);
    }

    pub fn corrupt_calibration_sentinel(&mut self) {
        self.0
            .borrow_mut()
            .info_responses
            .insert(regs::VALUE_GET_CALIBRATION_DATA, sample_calibration(0x0000));
    }

    pub fn recorded_bulk_outs(&self) -> Vec<Vec<u8>> {
        self.0.borrow().recorded_bulk_outs.clone()
    }

    pub fn recorded_spi_writes(&self) -> Vec<Vec<u8>> {
        self.recorded_bulk_outs()
            .into_iter()
            .filter(|msg| msg.first() == Some(&regs::msg::SEND_SPI))
            .collect()
    }

    pub fn last_bulk_out(&self) -> Option<Vec<u8>> {
        self.0.borrow().recorded_bulk_outs.last().cloned()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn control_in(&mut self, request: u8, value: u16, _index: u16, buf: &mut [u8]) -> Result<usize> {
        let inner = self.0.borrow();
        match request {
            regs::REQUEST_CHECK_READY => {
                buf.fill(0);
                buf[0] = if inner.ready { regs::READY_BYTE } else { 0x00 };
                Ok(buf.len())
            }
            regs::REQUEST_GET_INFO => {
                let data = inner.info_responses.get(&value).ok_or(Error::ControlFail)?;
                buf.copy_from_slice(&data[..buf.len()]);
                Ok(buf.len())
            }
            regs::REQUEST_FLASH_ACCESS => {
                drop(inner);
                let mut inner = self.0.borrow_mut();
                let start = inner.flash_cursor;
                let end = start + buf.len();
                buf.copy_from_slice(&inner.flash[start..end]);
                inner.flash_cursor = end;
                Ok(buf.len())
            }
            _ => Err(Error::ControlFail),
        }
    }

    fn control_out(&mut self, request: u8, _value: u16, _index: u16, buf: &[u8]) -> Result<usize> {
        match request {
            regs::REQUEST_INITIALIZE => Ok(buf.len()),
            _ => Err(Error::ControlFail),
        }
    }

    fn bulk_out_raw(&mut self, buf: &[u8]) -> Result<usize> {
        self.0.borrow_mut().recorded_bulk_outs.push(buf.to_vec());
        Ok(buf.len())
    }

    fn bulk_in_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut inner = self.0.borrow_mut();
        let scripted = inner.bulk_in_queue.pop_front().unwrap_or_default();
        buf.fill(0);
        let n = scripted.len().min(buf.len());
        buf[..n].copy_from_slice(&scripted[..n]);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unready_check_ready_blocks_bulk_out() {
        let mut transport = MockTransport::new();
        transport.set_ready(false);
        let err = transport.bulk_out(&[0x0c, 0x00]).unwrap_err();
        assert!(matches!(err, Error::ControlFail));
        assert!(transport.recorded_bulk_outs().is_empty());
    }

    #[test]
    fn clones_share_the_recorded_log() {
        let mut transport = MockTransport::new();
        let clone = transport.clone();
        transport.bulk_out_raw(&[1, 2, 3]).unwrap();
        assert_eq!(clone.recorded_bulk_outs(), vec![vec![1, 2, 3]]);
    }
}
