//! ## Lights Module
//! Keeps the hall button lamps in step with the fleet. Every node lights a
//! hall lamp when the master assigns the call to some car, and clears it
//! when the completion notice comes back, so all panels in the building
//! agree regardless of which car serves the call.
//!
//! Cab lamps are local business and handled by the runner.

//-----------------------IMPORTS------------------------------------------------

use std::io;
use std::thread;

use crossbeam_channel as cbc;
use log::debug;

use crate::modules::config::{ASSIGNMENT_PORT, COMPLETED_PORT};
use crate::modules::elevio::elev::{self, Elevator};
use crate::modules::fleet::order::{Order, OrderDir};
use crate::modules::net::bcast;
use crate::modules::net::messages::{Assignment, Completed};

//-----------------------FUNCTIONS----------------------------------------------

/// Spawns the lamp mirror for this node's panel.
pub fn spawn(elevator: Elevator) -> io::Result<()> {
    let assignment_rx = bcast::receiver::<Assignment>(ASSIGNMENT_PORT)?;
    let completed_rx = bcast::receiver::<Completed>(COMPLETED_PORT)?;
    thread::spawn(move || run(elevator, assignment_rx, completed_rx));
    Ok(())
}

fn run(
    elevator: Elevator,
    assignment_rx: cbc::Receiver<Assignment>,
    completed_rx: cbc::Receiver<Completed>,
) {
    loop {
        cbc::select! {
            recv(assignment_rx) -> msg => match msg {
                Ok(assignment) => set_hall_lamp(&elevator, &assignment.order, true),
                Err(_) => return,
            },
            recv(completed_rx) -> msg => match msg {
                Ok(completed) => {
                    debug!("clearing lamps for {:?}", completed.orders);
                    for order in &completed.orders {
                        set_hall_lamp(&elevator, order, false);
                    }
                }
                Err(_) => return,
            },
        }
    }
}

fn set_hall_lamp(elevator: &Elevator, order: &Order, on: bool) {
    let button = match order.dir {
        Some(OrderDir::Up) => elev::HALL_UP,
        Some(OrderDir::Down) => elev::HALL_DOWN,
        None => return,
    };
    elevator.call_button_light(order.floor, button, on);
}
