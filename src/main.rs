//-----------------------IMPORTS------------------------------------------------

use std::thread;

use anyhow::Context;
use crossbeam_channel as cbc;

use liftnet::modules::active_set;
use liftnet::modules::car::runner::{self, CarIo, CarNet};
use liftnet::modules::car::lights;
use liftnet::modules::config::{
    ACTIVE_SET_PORT, ASSIGNMENT_PORT, CAB_RECOVERY_PORT, CAB_REQUEST_PORT, COMPLETED_PORT,
    HALL_CALL_PORT, INPUT_POLL_PERIOD, NUM_FLOORS, SNAPSHOT_PORT, STATE_PORT,
};
use liftnet::modules::dispatch::dispatcher::DispatchNet;
use liftnet::modules::elevio::elev::Elevator;
use liftnet::modules::elevio::poll;
use liftnet::modules::net::bcast;
use liftnet::modules::peer::monitor;
use liftnet::modules::role::manager;
use liftnet::modules::system_init;

fn main() -> anyhow::Result<()> {
    //--------------BOOT--------------------------------------------------------
    let boot = system_init::boot()?;

    //--------------HARDWARE----------------------------------------------------
    let elevator = Elevator::init(&boot.addr, NUM_FLOORS)
        .with_context(|| format!("no elevator hardware answering at {}", boot.addr))?;

    let (buttons_tx, buttons_rx) = cbc::unbounded();
    {
        let elevator = elevator.clone();
        thread::spawn(move || poll::call_buttons(elevator, buttons_tx, INPUT_POLL_PERIOD));
    }
    let (floor_tx, floor_rx) = cbc::unbounded();
    {
        let elevator = elevator.clone();
        thread::spawn(move || poll::floor_passings(elevator, floor_tx, INPUT_POLL_PERIOD));
    }
    let (stop_tx, stop_rx) = cbc::unbounded();
    {
        let elevator = elevator.clone();
        thread::spawn(move || poll::stop_button(elevator, stop_tx, INPUT_POLL_PERIOD));
    }
    let (obstruction_tx, obstruction_rx) = cbc::unbounded();
    {
        let elevator = elevator.clone();
        thread::spawn(move || poll::obstruction(elevator, obstruction_tx, INPUT_POLL_PERIOD));
    }

    //--------------NETWORK-----------------------------------------------------
    let hall_tx = bcast::transmitter(HALL_CALL_PORT).context("hall call topic")?;
    let state_tx = bcast::transmitter(STATE_PORT).context("state report topic")?;
    let cab_request_tx = bcast::transmitter(CAB_REQUEST_PORT).context("cab request topic")?;
    let assignment_rx = bcast::receiver(ASSIGNMENT_PORT).context("assignment topic")?;
    let cab_recovery_rx = bcast::receiver(CAB_RECOVERY_PORT).context("cab recovery topic")?;

    //--------------COORDINATION------------------------------------------------
    let set_update_tx = bcast::transmitter(ACTIVE_SET_PORT).context("active set topic")?;
    let set_cmd_tx = active_set::spawn(set_update_tx).context("active set tracker")?;

    let role_tx = monitor::spawn_transmitter(boot.id, boot.role).context("identity heartbeat")?;
    let peer_rx = monitor::spawn_receiver(boot.id).context("peer monitor")?;

    let dispatch_net = DispatchNet {
        assignment_tx: bcast::transmitter(ASSIGNMENT_PORT).context("assignment topic")?,
        completed_tx: bcast::transmitter(COMPLETED_PORT).context("completed topic")?,
        snapshot_tx: bcast::transmitter(SNAPSHOT_PORT).context("snapshot topic")?,
        hall_tx: hall_tx.clone(),
        cab_recovery_tx: bcast::transmitter(CAB_RECOVERY_PORT).context("cab recovery topic")?,
        set_cmd_tx: set_cmd_tx.clone(),
    };
    manager::spawn(boot.id, boot.role, peer_rx, role_tx, set_cmd_tx.clone(), dispatch_net);

    //--------------CAR---------------------------------------------------------
    lights::spawn(elevator.clone()).context("lamp mirror")?;

    let io = CarIo { buttons_rx, floor_rx, stop_rx, obstruction_rx };
    let net = CarNet {
        assignment_rx,
        cab_recovery_rx,
        hall_tx,
        state_tx,
        cab_request_tx,
        set_cmd_tx,
    };
    runner::run(boot.id, elevator, io, net);
    Ok(())
}
