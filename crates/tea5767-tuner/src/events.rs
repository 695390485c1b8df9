//! Event stream recorded by the tuner controller
//!
//! Every state change and bus transaction is appended to one buffer so a
//! front end can render a traffic monitor and a status line from the same
//! ordered history.

use tea5767_protocol::{SearchDirection, TRANSACTION_LEN};

/// Observable tuner activity
#[derive(Debug, Clone, PartialEq)]
pub enum TunerEvent {
    // -------------------------------------------------------------------------
    // Traffic
    // -------------------------------------------------------------------------
    /// Control registers written to the device
    BusWrite {
        bytes: [u8; TRANSACTION_LEN],
    },

    /// Status registers read from the device
    BusRead {
        bytes: [u8; TRANSACTION_LEN],
    },

    // -------------------------------------------------------------------------
    // State changes
    // -------------------------------------------------------------------------
    /// Device left standby and reported ready
    PoweredOn {
        frequency_mhz: f64,
    },

    /// Device placed in standby
    PoweredOff,

    /// Station changed by an explicit tune
    Tuned {
        frequency_mhz: f64,
    },

    /// Audio mute toggled
    MuteChanged {
        muted: bool,
    },

    /// Any other configuration change
    Reconfigured,

    // -------------------------------------------------------------------------
    // Search and scan
    // -------------------------------------------------------------------------
    /// Hardware search started
    SearchStarted {
        direction: SearchDirection,
        from_mhz: f64,
    },

    /// Hardware search stopped on a station
    StationFound {
        frequency_mhz: f64,
        signal_level: u8,
        stereo: bool,
    },

    /// Hardware search ran out of band, polls, or was cancelled
    SearchAbandoned {
        reason: &'static str,
    },

    /// Software scan started
    ScanStarted {
        direction: SearchDirection,
    },

    /// Software scan stopped
    ScanFinished {
        stations: usize,
        cancelled: bool,
    },
}

impl TunerEvent {
    /// Whether this is raw bus traffic rather than a state change
    pub fn is_traffic(&self) -> bool {
        matches!(self, TunerEvent::BusWrite { .. } | TunerEvent::BusRead { .. })
    }
}
