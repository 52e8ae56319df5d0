mod usb;
mod clock;
mod regs;
mod config;
mod identity;
mod session;
mod frontend;
mod adc;
mod timebase;
mod trigger;
mod capture;
mod flash;
mod hexdump;

#[cfg(test)]
mod mock;

/// Errors surfaced by the driver. Device-protocol failures are opaque kinds with no string
/// payload; `CantOpen` is the one boundary variant that keeps the underlying cause, since
/// discarding *why* the USB layer refused to open or claim the device would make the
/// condition undiagnosable in the field.
#[derive(Debug)]
pub enum Error {
    /// Precondition violation at the API boundary (bad channel index, vpd out of range, ...).
    BadArgs,
    /// No device matching VID 0x04B5 / PID 0x6CDE was found during enumeration.
    NotFound,
    /// The device was found but could not be opened or its interface could not be claimed.
    CantOpen(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// A vendor control transfer failed, returned an unexpected length, or CHECK_READY
    /// reported the device not ready for the next bulk-OUT payload.
    ControlFail,
    /// A bulk transfer failed or transferred fewer bytes than expected.
    NotReady,
    /// Allocation failed while constructing the session.
    NoMem,
    /// The requested time-per-division value has no entry in the sampling-rate table.
    BadSampleRate,
    /// Zero channels enabled where at least one is required, or the enabled-channel count
    /// computed by the ADC routing algorithm fell outside {1,2,3,4}.
    InvalChannels,
    /// `vpd` fell outside 0..=11.
    InvalVoltsPerDiv,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::BadArgs => write!(f, "invalid argument"),
            Self::NotFound => write!(f, "no matching Hantek 6000-series device found"),
            Self::CantOpen(inner) => write!(f, "failed to open device: {}", inner),
            Self::ControlFail => write!(f, "control transfer failed or device not ready"),
            Self::NotReady => write!(f, "bulk transfer failed or was short"),
            Self::NoMem => write!(f, "allocation failed"),
            Self::BadSampleRate => write!(f, "unsupported time-per-division value"),
            Self::InvalChannels => write!(f, "invalid enabled-channel combination"),
            Self::InvalVoltsPerDiv => write!(f, "volts-per-division out of range"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CantOpen(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

pub use config::{
    Coupling,
    Vpd,
    ChannelConfig,
    TimePerDivision,
    TriggerMode,
    TriggerSlope,
    CaptureMode,
};

pub use identity::{DeviceIdentity, CALIBRATION_INFO_ENTRIES};

pub use session::Session;

pub use trigger::TriggerConfig;

pub use capture::CaptureBuffers;

pub use hexdump::dump_hex;

#[cfg(feature = "hardware")]
pub use usb::RusbTransport;

#[cfg(feature = "hardware")]
pub type Device = Session<usb::RusbTransport>;
