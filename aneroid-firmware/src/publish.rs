//! Frame publishing seam
//!
//! The network uplink (Wi-Fi join, UDP socket) is not part of this
//! firmware. Frames end here; a transport plugs in by replacing
//! [`publish_frame`].

use aneroid_protocol::TelemetryFrame;
use defmt::*;

/// Hand one encoded frame to the uplink
pub fn publish_frame(frame: &TelemetryFrame) {
    trace!("frame: {=str}", frame.as_str().trim_end());
}
