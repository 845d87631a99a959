//! ## Active Set Module
//! The replicated list of cars currently eligible for hall order assignment.
//! Every node runs one tracker; full-set broadcasts keep the replicas equal.
//! The master writes it on joins and leaves, the stall detector on stalls,
//! and a car writes itself out and back in around its stop button.
//!
//! The list stays sorted ascending. The dispatcher walks it lowest id first,
//! which is what makes cost ties land on the lowest id on every node alike.

use std::io;
use std::thread;

use crossbeam_channel as cbc;
use log::{debug, info};

use crate::modules::config::ACTIVE_SET_PORT;
use crate::modules::net::bcast;
use crate::modules::net::messages::ActiveSetUpdate;

//-----------------------TYPES--------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetCmd {
    Add(u8),
    Remove(u8),
}

//-----------------------FUNCTIONS----------------------------------------------

/// spawn
/// Start the tracker thread. Local commands come in on the returned channel;
/// each one that changes the set is broadcast to the fleet.
///
/// # Arguments:
///
/// * `set_tx` - cbc::Sender<ActiveSetUpdate> - the active-set broadcast topic.
///
/// # Returns:
///
/// Returns - io::Result<cbc::Sender<SetCmd>> - the local command channel.
///
pub fn spawn(set_tx: cbc::Sender<ActiveSetUpdate>) -> io::Result<cbc::Sender<SetCmd>> {
    let set_rx = bcast::receiver::<ActiveSetUpdate>(ACTIVE_SET_PORT)?;
    let (cmd_tx, cmd_rx) = cbc::unbounded::<SetCmd>();
    thread::spawn(move || run(set_rx, cmd_rx, set_tx));
    Ok(cmd_tx)
}

fn run(
    set_rx: cbc::Receiver<ActiveSetUpdate>,
    cmd_rx: cbc::Receiver<SetCmd>,
    set_tx: cbc::Sender<ActiveSetUpdate>,
) {
    let mut cars: Vec<u8> = Vec::new();
    loop {
        cbc::select! {
            recv(set_rx) -> msg => match msg {
                Ok(mut update) => {
                    update.cars.sort_unstable();
                    if update.cars != cars {
                        debug!("active set is now {:?}", update.cars);
                        cars = update.cars;
                    }
                }
                Err(_) => return,
            },
            recv(cmd_rx) -> msg => match msg {
                Ok(cmd) => {
                    if apply(&mut cars, cmd) {
                        info!("active set changed to {:?} after {:?}", cars, cmd);
                        if set_tx.send(ActiveSetUpdate { cars: cars.clone() }).is_err() {
                            return;
                        }
                    }
                }
                Err(_) => return,
            },
        }
    }
}

/// apply
/// One membership change against the sorted list.
///
/// # Arguments:
///
/// * `cars` - &mut Vec<u8> - the set, kept sorted ascending.
/// * `cmd` - SetCmd - the change.
///
/// # Returns:
///
/// Returns - bool - true if the set actually changed.
///
pub fn apply(cars: &mut Vec<u8>, cmd: SetCmd) -> bool {
    match cmd {
        SetCmd::Add(id) => {
            if cars.contains(&id) {
                return false;
            }
            cars.push(id);
            cars.sort_unstable();
            true
        }
        SetCmd::Remove(id) => {
            let before = cars.len();
            cars.retain(|&c| c != id);
            cars.len() != before
        }
    }
}

//-----------------------TESTS--------------------------------------------------
