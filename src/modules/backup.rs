//! ## Backup Module
//! The hot standby's half of state replication. The master re-broadcasts its
//! fleet snapshot on every state report; the primary backup keeps the latest
//! one here. On promotion the role manager takes the stored snapshot out and
//! seeds the new dispatcher with it, so no reported order is lost with the
//! old master.
//!
//! Dropping the [BackupHandle] is the cancellation signal: the thread sees
//! the closed channel at its next select and returns.

use std::io;
use std::thread;

use crossbeam_channel as cbc;
use log::{debug, warn};

use crate::modules::config::SNAPSHOT_PORT;
use crate::modules::fleet::state::FleetSnapshot;
use crate::modules::net::bcast;

//-----------------------HANDLE-------------------------------------------------

pub struct BackupHandle {
    handover_tx: cbc::Sender<cbc::Sender<FleetSnapshot>>,
}

impl BackupHandle {
    /// take_snapshot
    /// Fetch the stored snapshot and stop the replica. Consumes the handle;
    /// the replica thread winds down once it is gone.
    ///
    /// # Returns:
    ///
    /// Returns - FleetSnapshot - the latest mirrored snapshot, or the
    /// all-uninitialized fleet if the replica never received one (or died).
    ///
    pub fn take_snapshot(self) -> FleetSnapshot {
        let (reply_tx, reply_rx) = cbc::bounded::<FleetSnapshot>(1);
        if self.handover_tx.send(reply_tx).is_err() {
            warn!("backup replica is gone, starting from an uninitialized fleet");
            return FleetSnapshot::uninitialized();
        }
        match reply_rx.recv() {
            Ok(snapshot) => snapshot,
            Err(_) => {
                warn!("backup replica dropped the handover, starting uninitialized");
                FleetSnapshot::uninitialized()
            }
        }
    }
}

//-----------------------FUNCTIONS----------------------------------------------

/// spawn
/// Start the replica listening on the snapshot topic.
///
/// # Returns:
///
/// Returns - io::Result<BackupHandle> - handle for handover and shutdown.
///
pub fn spawn() -> io::Result<BackupHandle> {
    let snapshot_rx = bcast::receiver::<FleetSnapshot>(SNAPSHOT_PORT)?;
    Ok(spawn_from(snapshot_rx))
}

/// spawn_from
/// Same as [spawn] but with the snapshot feed supplied by the caller.
///
/// # Arguments:
///
/// * `snapshot_rx` - cbc::Receiver<FleetSnapshot> - the snapshot stream.
///
/// # Returns:
///
/// Returns - BackupHandle - handle for handover and shutdown.
///
pub fn spawn_from(snapshot_rx: cbc::Receiver<FleetSnapshot>) -> BackupHandle {
    let (handover_tx, handover_rx) = cbc::unbounded::<cbc::Sender<FleetSnapshot>>();
    thread::spawn(move || run(snapshot_rx, handover_rx));
    BackupHandle { handover_tx }
}

fn run(
    snapshot_rx: cbc::Receiver<FleetSnapshot>,
    handover_rx: cbc::Receiver<cbc::Sender<FleetSnapshot>>,
) {
    let mut latest = FleetSnapshot::uninitialized();
    loop {
        cbc::select! {
            recv(snapshot_rx) -> msg => match msg {
                Ok(snapshot) => latest = snapshot,
                Err(_) => return,
            },
            recv(handover_rx) -> msg => match msg {
                Ok(reply) => {
                    // The promotion continues with or without our answer.
                    let _ = reply.send(latest.clone());
                }
                Err(_) => {
                    debug!("backup replica cancelled");
                    return;
                }
            },
        }
    }
}
