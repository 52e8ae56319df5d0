//! The explicit settling/latching delays the SDK interposes between bulk-OUT commands
//! (3 ms, 4 ms, 10 ms, 50 ms) are routed through this trait instead of calling
//! `std::thread::sleep` directly, so a conformance test can assert the driver *requested*
//! at least the right delay without the test suite actually blocking for it.

use std::time::Duration;

pub trait Clock {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealClock;

impl Clock for RealClock {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct RecordingClock {
    pub requested: Vec<Duration>,
}

#[cfg(test)]
impl Clock for RecordingClock {
    fn sleep(&mut self, duration: Duration) {
        self.requested.push(duration);
    }
}
