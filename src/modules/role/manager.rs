//! ## Role Manager Module
//! The runtime around [crate::modules::role::transition]: consumes peer
//! updates, applies the transition function, and starts or cancels the
//! dispatcher, stall detector and backup replica to match the new role.
//!
//! Promotion order matters: the backup's snapshot is taken out *before* the
//! new dispatcher starts, so the dispatcher's first fleet view is exactly
//! what the old master last mirrored. Cancellation is dropping a handle;
//! the task notices at its next select.

use std::thread;

use crossbeam_channel as cbc;
use log::{error, info, warn};

use crate::modules::active_set::SetCmd;
use crate::modules::backup::{self, BackupHandle};
use crate::modules::dispatch::dispatcher::{self, DispatchNet, DispatcherHandle};
use crate::modules::fleet::identity::Role;
use crate::modules::fleet::state::FleetSnapshot;
use crate::modules::peer::monitor::PeerUpdate;
use crate::modules::role::transition::{next_role, TopologyEvent};

//-----------------------FUNCTIONS----------------------------------------------

/// spawn
/// Start the role manager thread for this node.
///
/// # Arguments:
///
/// * `own_id` - u8 - this car's id.
/// * `initial_role` - Role - role handed to the process at startup.
/// * `peer_rx` - cbc::Receiver<PeerUpdate> - join/leave stream.
/// * `role_tx` - cbc::Sender<Role> - the heartbeat's role feed.
/// * `set_cmd_tx` - cbc::Sender<SetCmd> - the active set tracker.
/// * `net` - DispatchNet - outbound topics for dispatchers this node starts.
///
pub fn spawn(
    own_id: u8,
    initial_role: Role,
    peer_rx: cbc::Receiver<PeerUpdate>,
    role_tx: cbc::Sender<Role>,
    set_cmd_tx: cbc::Sender<SetCmd>,
    net: DispatchNet,
) {
    thread::spawn(move || run(own_id, initial_role, peer_rx, role_tx, set_cmd_tx, net));
}

fn run(
    own_id: u8,
    initial_role: Role,
    peer_rx: cbc::Receiver<PeerUpdate>,
    role_tx: cbc::Sender<Role>,
    set_cmd_tx: cbc::Sender<SetCmd>,
    net: DispatchNet,
) {
    let mut current = initial_role;
    let mut dispatcher: Option<DispatcherHandle> = None;
    let mut backup: Option<BackupHandle> = None;

    match current {
        Role::Master => {
            // A cold-start master serves at least itself.
            let _ = set_cmd_tx.send(SetCmd::Add(own_id));
            dispatcher =
                start_dispatcher(FleetSnapshot::uninitialized(), vec![own_id], net.clone());
        }
        Role::PrimaryBackup => backup = start_backup(),
        Role::Regular => {}
    }
    info!("car {} starting out as {}", own_id, current);

    for update in peer_rx.iter() {
        if let Some(new) = update.new {
            if current == Role::Master {
                let _ = set_cmd_tx.send(SetCmd::Add(new.id));
            }
        }

        let lost = match update.lost {
            Some(lost) => lost,
            None => continue,
        };
        let isolated = update.peers.is_empty();
        let event = TopologyEvent::Leave { id: lost.id, role: lost.role, isolated };
        let next = next_role(current, event);

        if next != current {
            info!("losing {} ({}) moves this car from {} to {}", lost.id, lost.role, current, next);
            match (current, next) {
                (_, Role::Regular) => {
                    // Isolated: stand down and keep serving the local queue.
                    dispatcher = None;
                    backup = None;
                }
                (Role::Regular, Role::PrimaryBackup) => backup = start_backup(),
                (Role::PrimaryBackup, Role::Master) => {
                    let snapshot = match backup.take() {
                        Some(handle) => handle.take_snapshot(),
                        None => {
                            warn!("promoted without a running replica, starting uninitialized");
                            FleetSnapshot::uninitialized()
                        }
                    };
                    dispatcher = start_dispatcher(snapshot, vec![own_id], net.clone());
                }
                (from, to) => warn!("unexpected role move {} -> {}", from, to),
            }
            current = next;
            if role_tx.send(current).is_err() {
                return;
            }
        }

        if current == Role::Master && !isolated {
            let _ = set_cmd_tx.send(SetCmd::Remove(lost.id));
            if let Some(handle) = &dispatcher {
                handle.reassign_lost(lost.id);
            }
        }
    }
}

fn start_dispatcher(
    fleet: FleetSnapshot,
    active: Vec<u8>,
    net: DispatchNet,
) -> Option<DispatcherHandle> {
    match dispatcher::spawn(fleet, active, net) {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("could not start dispatcher: {}", e);
            None
        }
    }
}

fn start_backup() -> Option<BackupHandle> {
    match backup::spawn() {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("could not start backup replica: {}", e);
            None
        }
    }
}
