//! ## Dispatcher Module
//! The master's coordination loop. Receives raw hall calls and prices them
//! across the active set, aggregates every car's state reports, detects
//! completed hall orders, answers cab order recovery requests, and mirrors
//! the fleet snapshot to the backup after every report.
//!
//! Runs only while this node is master. The role manager cancels it by
//! dropping its [DispatcherHandle]; the loop observes the closed channel at
//! its next select and returns. Assignments already broadcast are not
//! retracted; the receiving queue treats duplicates as no-ops.

use std::io;
use std::thread;

use crossbeam_channel as cbc;
use log::{info, warn};

use crate::modules::active_set::SetCmd;
use crate::modules::config::{ACTIVE_SET_PORT, CAB_REQUEST_PORT, HALL_CALL_PORT, STATE_PORT};
use crate::modules::dispatch::{cost, stall};
use crate::modules::fleet::order::Order;
use crate::modules::fleet::state::FleetSnapshot;
use crate::modules::net::bcast;
use crate::modules::net::messages::{
    ActiveSetUpdate, Assignment, CabRecovery, CabRequest, Completed, HallCall, StateReport,
};

//-----------------------TYPES--------------------------------------------------

/// The broadcast topics the dispatcher writes, bundled so the role manager
/// can hold one clone per promotion.
#[derive(Clone)]
pub struct DispatchNet {
    pub assignment_tx: cbc::Sender<Assignment>,
    pub completed_tx: cbc::Sender<Completed>,
    pub snapshot_tx: cbc::Sender<FleetSnapshot>,
    pub hall_tx: cbc::Sender<HallCall>,
    pub cab_recovery_tx: cbc::Sender<CabRecovery>,
    pub set_cmd_tx: cbc::Sender<SetCmd>,
}

pub enum DispatcherCmd {
    /// Re-submit the hall orders last recorded for a car that left the fleet.
    ReassignLost(u8),
}

/// Dropping the handle cancels the dispatcher.
pub struct DispatcherHandle {
    cmd_tx: cbc::Sender<DispatcherCmd>,
}

impl DispatcherHandle {
    pub fn reassign_lost(&self, id: u8) {
        let _ = self.cmd_tx.send(DispatcherCmd::ReassignLost(id));
    }
}

//-----------------------FUNCTIONS----------------------------------------------

/// spawn
/// Start the dispatcher with the fleet view it should begin from: the
/// handed-over backup snapshot after a failover, or an uninitialized fleet
/// on a cold start. The stall detector is started alongside and lives
/// exactly as long as the dispatcher.
///
/// # Arguments:
///
/// * `initial_fleet` - FleetSnapshot - starting fleet view.
/// * `initial_active` - Vec<u8> - active set until the first broadcast.
/// * `net` - DispatchNet - outbound topics.
///
/// # Returns:
///
/// Returns - io::Result<DispatcherHandle> - handle for commands and shutdown.
///
pub fn spawn(
    initial_fleet: FleetSnapshot,
    initial_active: Vec<u8>,
    net: DispatchNet,
) -> io::Result<DispatcherHandle> {
    let hall_rx = bcast::receiver::<HallCall>(HALL_CALL_PORT)?;
    let state_rx = bcast::receiver::<StateReport>(STATE_PORT)?;
    let cab_req_rx = bcast::receiver::<CabRequest>(CAB_REQUEST_PORT)?;
    let active_rx = bcast::receiver::<ActiveSetUpdate>(ACTIVE_SET_PORT)?;
    let (cmd_tx, cmd_rx) = cbc::unbounded::<DispatcherCmd>();
    thread::spawn(move || {
        run(initial_fleet, initial_active, net, hall_rx, state_rx, cab_req_rx, active_rx, cmd_rx)
    });
    Ok(DispatcherHandle { cmd_tx })
}

fn run(
    mut fleet: FleetSnapshot,
    mut active: Vec<u8>,
    net: DispatchNet,
    hall_rx: cbc::Receiver<HallCall>,
    state_rx: cbc::Receiver<StateReport>,
    cab_req_rx: cbc::Receiver<CabRequest>,
    active_rx: cbc::Receiver<ActiveSetUpdate>,
    cmd_rx: cbc::Receiver<DispatcherCmd>,
) {
    let activity_tx = stall::spawn(net.hall_tx.clone(), net.set_cmd_tx.clone());
    info!("dispatcher up, active set {:?}", active);

    loop {
        cbc::select! {
            recv(hall_rx) -> msg => match msg {
                Ok(call) => assign_hall_call(&fleet, &active, call, &net),
                Err(_) => return,
            },
            recv(state_rx) -> msg => match msg {
                Ok(report) => on_state_report(&mut fleet, report, &activity_tx, &net),
                Err(_) => return,
            },
            recv(cab_req_rx) -> msg => match msg {
                Ok(req) => on_cab_request(&fleet, req, &net),
                Err(_) => return,
            },
            recv(active_rx) -> msg => match msg {
                Ok(mut update) => {
                    update.cars.sort_unstable();
                    active = update.cars;
                }
                Err(_) => return,
            },
            recv(cmd_rx) -> msg => match msg {
                Ok(DispatcherCmd::ReassignLost(id)) => reassign_lost(&fleet, id, &net),
                Err(_) => {
                    info!("dispatcher cancelled");
                    return;
                }
            },
        }
    }
}

/// assign_hall_call
/// Price the call across the active set and broadcast the winner. With no
/// eligible car the call is dropped; somebody will press the button again.
pub fn assign_hall_call(fleet: &FleetSnapshot, active: &[u8], call: HallCall, net: &DispatchNet) {
    match cost::select_car(fleet, active, &call) {
        Some((car, price)) => {
            info!(
                "hall {:?} at floor {} goes to car {} (cost {:.2})",
                call.dir, call.floor, car, price
            );
            let _ = net.assignment_tx.send(Assignment { car, order: call.order() });
        }
        None => warn!("no active car for hall call at floor {}, dropping it", call.floor),
    }
}

/// on_state_report
/// Fold one car's report into the fleet view: feed the stall detector, turn
/// vanished hall orders into a completion notice, store the state, and
/// mirror the whole snapshot to the backup.
pub fn on_state_report(
    fleet: &mut FleetSnapshot,
    report: StateReport,
    activity_tx: &cbc::Sender<(u8, Vec<Order>)>,
    net: &DispatchNet,
) {
    let StateReport { id, state } = report;
    let old_halls = match fleet.get(id) {
        Some(previous) => previous.hall_orders(),
        None => {
            warn!("state report from unknown car {}", id);
            return;
        }
    };

    let _ = activity_tx.send((id, state.pending.clone()));

    let new_halls = state.hall_orders();
    if new_halls.len() < old_halls.len() {
        let done = completed_halls(&old_halls, &new_halls);
        if !done.is_empty() {
            info!("car {} completed {:?}", id, done);
            let _ = net.completed_tx.send(Completed { orders: done });
        }
    }

    fleet.set(id, state);
    let _ = net.snapshot_tx.send(fleet.clone());
}

/// on_cab_request
/// Hand a rebooted car the cab orders it was last seen holding.
pub fn on_cab_request(fleet: &FleetSnapshot, req: CabRequest, net: &DispatchNet) {
    if let Some(state) = fleet.get(req.id) {
        let orders = state.cab_orders();
        info!("returning {} stored cab orders to car {}", orders.len(), req.id);
        let _ = net.cab_recovery_tx.send(CabRecovery { id: req.id, orders });
    }
}

/// reassign_lost
/// Feed a departed car's hall orders back through the raw hall call topic,
/// where they are priced like fresh presses.
pub fn reassign_lost(fleet: &FleetSnapshot, id: u8, net: &DispatchNet) {
    if let Some(state) = fleet.get(id) {
        let halls = state.hall_orders();
        if !halls.is_empty() {
            info!("re-submitting {} hall orders from lost car {}", halls.len(), id);
        }
        for order in &halls {
            if let Some(call) = HallCall::from_order(order) {
                let _ = net.hall_tx.send(call);
            }
        }
    }
}

/// completed_halls
/// Hall orders present before a report but gone after it.
pub fn completed_halls(old: &[Order], new: &[Order]) -> Vec<Order> {
    old.iter().filter(|o| !new.contains(o)).cloned().collect()
}

//-----------------------TESTS--------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::fleet::order::OrderDir;
    use crate::modules::fleet::state::{Behaviour, CarState, Dirn};

    fn test_net() -> (
        DispatchNet,
        cbc::Receiver<Assignment>,
        cbc::Receiver<Completed>,
        cbc::Receiver<FleetSnapshot>,
        cbc::Receiver<HallCall>,
        cbc::Receiver<CabRecovery>,
    ) {
        let (assignment_tx, assignment_rx) = cbc::unbounded();
        let (completed_tx, completed_rx) = cbc::unbounded();
        let (snapshot_tx, snapshot_rx) = cbc::unbounded();
        let (hall_tx, hall_rx) = cbc::unbounded();
        let (cab_recovery_tx, cab_recovery_rx) = cbc::unbounded();
        let (set_cmd_tx, _set_cmd_rx) = cbc::unbounded();
        let net = DispatchNet {
            assignment_tx,
            completed_tx,
            snapshot_tx,
            hall_tx,
            cab_recovery_tx,
            set_cmd_tx,
        };
        (net, assignment_rx, completed_rx, snapshot_rx, hall_rx, cab_recovery_rx)
    }

    fn reported(floor: i8, pending: Vec<Order>) -> CarState {
        CarState { behaviour: Behaviour::Idle, floor, direction: Dirn::Stop, pending }
    }

    #[test]
    fn removed_hall_orders_count_as_completed() {
        let old = vec![Order::hall(3, OrderDir::Up)];
        let new: Vec<Order> = Vec::new();
        assert_eq!(completed_halls(&old, &new), vec![Order::hall(3, OrderDir::Up)]);
    }

    #[test]
    fn surviving_hall_orders_are_not_completed() {
        let old = vec![Order::hall(3, OrderDir::Up), Order::hall(1, OrderDir::Down)];
        let new = vec![Order::hall(3, OrderDir::Up)];
        assert_eq!(completed_halls(&old, &new), vec![Order::hall(1, OrderDir::Down)]);
    }

    #[test]
    fn report_with_fewer_halls_broadcasts_the_difference() {
        let (net, _a, completed_rx, snapshot_rx, _h, _c) = test_net();
        let (activity_tx, activity_rx) = cbc::unbounded();
        let mut fleet = FleetSnapshot::uninitialized();
        fleet.set(1, reported(3, vec![Order::hall(3, OrderDir::Up)]));

        on_state_report(
            &mut fleet,
            StateReport { id: 1, state: reported(3, Vec::new()) },
            &activity_tx,
            &net,
        );

        let notice = completed_rx.try_recv().unwrap();
        assert_eq!(notice.orders, vec![Order::hall(3, OrderDir::Up)]);
        // The stall detector saw the report, and the backup got the new view.
        assert_eq!(activity_rx.try_recv().unwrap(), (1, Vec::new()));
        let mirrored = snapshot_rx.try_recv().unwrap();
        assert!(mirrored.get(1).unwrap().pending.is_empty());
    }

    #[test]
    fn growing_queues_do_not_complete_anything() {
        let (net, _a, completed_rx, _s, _h, _c) = test_net();
        let (activity_tx, _activity_rx) = cbc::unbounded();
        let mut fleet = FleetSnapshot::uninitialized();
        fleet.set(0, reported(0, Vec::new()));

        on_state_report(
            &mut fleet,
            StateReport { id: 0, state: reported(0, vec![Order::hall(2, OrderDir::Up)]) },
            &activity_tx,
            &net,
        );

        assert!(completed_rx.try_recv().is_err());
    }

    #[test]
    fn hall_call_is_assigned_to_the_only_active_car() {
        let (net, assignment_rx, _c, _s, _h, _r) = test_net();
        let mut fleet = FleetSnapshot::uninitialized();
        fleet.set(0, reported(0, Vec::new()));

        assign_hall_call(&fleet, &[0], HallCall { floor: 2, dir: OrderDir::Up }, &net);

        let assignment = assignment_rx.try_recv().unwrap();
        assert_eq!(assignment.car, 0);
        assert_eq!(assignment.order, Order::hall(2, OrderDir::Up));
    }

    #[test]
    fn unassignable_hall_call_is_dropped() {
        let (net, assignment_rx, _c, _s, _h, _r) = test_net();
        let fleet = FleetSnapshot::uninitialized();

        assign_hall_call(&fleet, &[], HallCall { floor: 2, dir: OrderDir::Up }, &net);

        assert!(assignment_rx.try_recv().is_err());
    }

    #[test]
    fn cab_request_returns_only_cab_orders() {
        let (net, _a, _c, _s, _h, cab_recovery_rx) = test_net();
        let mut fleet = FleetSnapshot::uninitialized();
        fleet.set(2, reported(1, vec![Order::cab(3), Order::hall(0, OrderDir::Up)]));

        on_cab_request(&fleet, CabRequest { id: 2 }, &net);

        let recovery = cab_recovery_rx.try_recv().unwrap();
        assert_eq!(recovery.id, 2);
        assert_eq!(recovery.orders, vec![Order::cab(3)]);
    }

    #[test]
    fn lost_car_hall_orders_reenter_the_hall_topic() {
        let (net, _a, _c, _s, hall_rx, _r) = test_net();
        let mut fleet = FleetSnapshot::uninitialized();
        fleet.set(1, reported(2, vec![Order::hall(1, OrderDir::Down), Order::cab(0)]));

        reassign_lost(&fleet, 1, &net);

        assert_eq!(hall_rx.try_recv().unwrap(), HallCall { floor: 1, dir: OrderDir::Down });
        assert!(hall_rx.try_recv().is_err());
    }
}
