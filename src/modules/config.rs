//! ## Config Module
//! Fleet geometry, broadcast ports and timing constants shared by every node.
//!
//! One UDP broadcast port per message topic, numbered consecutively from
//! `PORT_BASE` so a lab machine can run the whole fleet side by side.

use std::time::Duration;

//-----------------------FLEET GEOMETRY-----------------------------------------

/// Floors served by every car, numbered from 0.
pub const NUM_FLOORS: u8 = 4;

/// Cars in the fleet. Car ids are 0..FLEET_SIZE and double as snapshot indices.
pub const FLEET_SIZE: usize = 3;

/// Sentinel for "floor not known yet" (before the first floor sensor hit).
pub const UNKNOWN_FLOOR: i8 = -2;

//-----------------------BROADCAST TOPICS---------------------------------------

pub const PORT_BASE: u16 = 17550;

/// Car identity heartbeats.
pub const PEER_PORT: u16 = PORT_BASE;
/// Raw hall button presses, fleet wide.
pub const HALL_CALL_PORT: u16 = PORT_BASE + 1;
/// Per car state reports to the master.
pub const STATE_PORT: u16 = PORT_BASE + 2;
/// Master's hall order assignments.
pub const ASSIGNMENT_PORT: u16 = PORT_BASE + 3;
/// Completed hall orders, for clearing lamps everywhere.
pub const COMPLETED_PORT: u16 = PORT_BASE + 4;
/// Full active set updates.
pub const ACTIVE_SET_PORT: u16 = PORT_BASE + 5;
/// Fleet snapshots, master to backup.
pub const SNAPSHOT_PORT: u16 = PORT_BASE + 6;
/// A rebooted car asking the master for its stored cab orders.
pub const CAB_REQUEST_PORT: u16 = PORT_BASE + 7;
/// Master's reply with the stored cab orders.
pub const CAB_RECOVERY_PORT: u16 = PORT_BASE + 8;

//-----------------------TIMING-------------------------------------------------

/// Identity heartbeat cadence.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(15);

/// A peer silent this long is gone.
pub const PEER_TIMEOUT: Duration = Duration::from_millis(500);

/// Cars re-report state at least this often, even with nothing new.
pub const STATE_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// A car holding orders but silent on the state topic this long has stalled.
pub const STALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Stall sweep cadence.
pub const STALL_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Door stays open this long at every stop. Re-armed while obstructed.
pub const DOOR_DWELL: Duration = Duration::from_secs(3);

/// Hardware poll period for buttons and sensors.
pub const INPUT_POLL_PERIOD: Duration = Duration::from_millis(25);
