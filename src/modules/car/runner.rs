//! ## Car Runner Module
//! The local scheduler. Owns the cab's order queue, position and travel
//! direction, and is the only place that commands the motor and door. Runs
//! on the main thread and reacts to hardware events from the pollers and to
//! assignments arriving over the network.
//!
//! contains:
//! `run` drives one car until the process dies.
//!
//! Hall presses are forwarded to the master and only queued once an
//! assignment names this car. Cab presses are queued directly. Every change
//! to the queue or the motion state goes out as a fresh state report, plus a
//! periodic report so the master can tell a quiet car from a dead one.

//-----------------------IMPORTS------------------------------------------------

use crossbeam_channel as cbc;
use log::{debug, info, warn};

use crate::modules::active_set::SetCmd;
use crate::modules::car::position::PositionVector;
use crate::modules::car::queue::{self, OrderQueue};
use crate::modules::config::{DOOR_DWELL, STATE_REPORT_INTERVAL, UNKNOWN_FLOOR};
use crate::modules::elevio::elev::{self, Elevator};
use crate::modules::elevio::poll::CallButton;
use crate::modules::fleet::order::{Order, OrderDir, OrderKind};
use crate::modules::fleet::state::{Behaviour, CarState, Dirn};
use crate::modules::net::messages::{Assignment, CabRecovery, CabRequest, HallCall, StateReport};

//-----------------------STRUCTS------------------------------------------------

/// Hardware event feeds from the pollers.
pub struct CarIo {
    pub buttons_rx: cbc::Receiver<CallButton>,
    pub floor_rx: cbc::Receiver<Option<u8>>,
    pub stop_rx: cbc::Receiver<bool>,
    pub obstruction_rx: cbc::Receiver<bool>,
}

/// Network endpoints the runner talks through.
pub struct CarNet {
    pub assignment_rx: cbc::Receiver<Assignment>,
    pub cab_recovery_rx: cbc::Receiver<CabRecovery>,
    pub hall_tx: cbc::Sender<HallCall>,
    pub state_tx: cbc::Sender<StateReport>,
    pub cab_request_tx: cbc::Sender<CabRequest>,
    pub set_cmd_tx: cbc::Sender<SetCmd>,
}

struct Runner {
    id: u8,
    elevator: Elevator,
    queue: OrderQueue,
    dirn: Dirn,
    pos: PositionVector,
    last_floor: i8,
    stopped: bool,
    obstructed: bool,
    initialized: bool,
    hall_tx: cbc::Sender<HallCall>,
    state_tx: cbc::Sender<StateReport>,
    cab_request_tx: cbc::Sender<CabRequest>,
    set_cmd_tx: cbc::Sender<SetCmd>,
}

//-----------------------FUNCTIONS----------------------------------------------

/// Runs the car. Finds a known floor first, then serves the queue until a
/// channel to the rest of the system dies.
///
/// # Arguments:
/// * `id` - this car's fleet id
/// * `elevator` - hardware driver handle
/// * `io` - poller event feeds
/// * `net` - broadcast endpoints
pub fn run(id: u8, elevator: Elevator, io: CarIo, net: CarNet) {
    let CarIo { buttons_rx, floor_rx, stop_rx, obstruction_rx } = io;
    let CarNet { assignment_rx, cab_recovery_rx, hall_tx, state_tx, cab_request_tx, set_cmd_tx } =
        net;

    let mut car = Runner {
        id,
        elevator,
        queue: OrderQueue::new(),
        dirn: Dirn::Stop,
        pos: PositionVector::new(),
        last_floor: UNKNOWN_FLOOR,
        stopped: false,
        obstructed: false,
        initialized: false,
        hall_tx,
        state_tx,
        cab_request_tx,
        set_cmd_tx,
    };
    if !car.initialize(&floor_rx) {
        return;
    }

    let report_tick = cbc::tick(STATE_REPORT_INTERVAL);
    loop {
        cbc::select! {
            recv(buttons_rx) -> msg => match msg {
                Ok(button) => car.on_button(button, &obstruction_rx),
                Err(_) => return,
            },
            recv(floor_rx) -> msg => match msg {
                Ok(event) => car.on_floor(event, &obstruction_rx),
                Err(_) => return,
            },
            recv(stop_rx) -> msg => match msg {
                Ok(pressed) => car.on_stop(pressed, &obstruction_rx),
                Err(_) => return,
            },
            recv(obstruction_rx) -> msg => match msg {
                Ok(blocked) => car.obstructed = blocked,
                Err(_) => return,
            },
            recv(assignment_rx) -> msg => match msg {
                Ok(assignment) => car.on_assignment(assignment, &obstruction_rx),
                Err(_) => return,
            },
            recv(cab_recovery_rx) -> msg => match msg {
                Ok(recovery) => car.on_cab_recovery(recovery, &obstruction_rx),
                Err(_) => return,
            },
            recv(report_tick) -> _ => car.report(),
        }
    }
}

impl Runner {
    /// Gets the cab onto a known floor. If it wakes up between floors it
    /// drives down until the sensor fires. Reports ready and asks the master
    /// for any cab orders stored from before a restart.
    fn initialize(&mut self, floor_rx: &cbc::Receiver<Option<u8>>) -> bool {
        match self.elevator.floor_sensor() {
            Some(floor) => self.arrive_at(floor),
            None => {
                self.elevator.motor_direction(elev::DIRN_DOWN);
                loop {
                    match floor_rx.recv() {
                        Ok(Some(floor)) => {
                            self.elevator.motor_direction(elev::DIRN_STOP);
                            self.arrive_at(floor);
                            break;
                        }
                        Ok(None) => {}
                        Err(_) => return false,
                    }
                }
            }
        }
        self.initialized = true;
        self.report();
        let _ = self.cab_request_tx.send(CabRequest { id: self.id });
        info!("car {} ready at floor {}", self.id, self.last_floor);
        true
    }

    fn arrive_at(&mut self, floor: u8) {
        self.pos.arrive(floor);
        self.last_floor = floor as i8;
        self.elevator.floor_indicator(floor);
    }

    fn on_button(&mut self, button: CallButton, obstruction_rx: &cbc::Receiver<bool>) {
        match button.call {
            elev::CAB => {
                if self.queue.add(Order::cab(button.floor)) {
                    self.elevator.call_button_light(button.floor, elev::CAB, true);
                    debug!("car {} queued cab order for floor {}", self.id, button.floor);
                    self.rework(obstruction_rx);
                }
            }
            elev::HALL_UP => self.submit_hall(button.floor, OrderDir::Up),
            elev::HALL_DOWN => self.submit_hall(button.floor, OrderDir::Down),
            _ => {}
        }
    }

    fn submit_hall(&self, floor: u8, dir: OrderDir) {
        debug!("car {} forwarding {:?} hall call at floor {}", self.id, dir, floor);
        let _ = self.hall_tx.send(HallCall { floor, dir });
    }

    fn on_assignment(&mut self, assignment: Assignment, obstruction_rx: &cbc::Receiver<bool>) {
        if assignment.car != self.id {
            return;
        }
        if self.queue.add(assignment.order) {
            info!("car {} accepted {:?}", self.id, assignment.order);
            self.rework(obstruction_rx);
        }
    }

    fn on_cab_recovery(&mut self, recovery: CabRecovery, obstruction_rx: &cbc::Receiver<bool>) {
        if recovery.id != self.id {
            return;
        }
        let mut restored = 0;
        for order in recovery.orders {
            if order.is_cab() && self.queue.add(order) {
                self.elevator.call_button_light(order.floor, elev::CAB, true);
                restored += 1;
            }
        }
        if restored > 0 {
            info!("car {} restored {} stored cab orders", self.id, restored);
            self.rework(obstruction_rx);
        }
    }

    fn on_floor(&mut self, event: Option<u8>, obstruction_rx: &cbc::Receiver<bool>) {
        match event {
            Some(floor) => {
                self.arrive_at(floor);
                if matches!(self.queue.head(), Some(order) if order.floor == floor) {
                    self.elevator.motor_direction(elev::DIRN_STOP);
                    self.dirn = Dirn::Stop;
                    self.settle(obstruction_rx);
                    self.report();
                }
            }
            None => self.pos.leave(self.dirn),
        }
    }

    /// Stop button. Pressed: halt, leave the active set and hand the queued
    /// hall orders back for redistribution, keeping only cab orders.
    /// Released: rejoin and resume from the queue.
    fn on_stop(&mut self, pressed: bool, obstruction_rx: &cbc::Receiver<bool>) {
        self.elevator.stop_button_light(pressed);
        if pressed {
            warn!("car {} stop button pressed, leaving service", self.id);
            self.stopped = true;
            self.dirn = Dirn::Stop;
            self.elevator.motor_direction(elev::DIRN_STOP);
            let _ = self.set_cmd_tx.send(SetCmd::Remove(self.id));
            for order in self.queue.snapshot() {
                if let Some(call) = HallCall::from_order(&order) {
                    let _ = self.hall_tx.send(call);
                    let button = match call.dir {
                        OrderDir::Up => elev::HALL_UP,
                        OrderDir::Down => elev::HALL_DOWN,
                    };
                    self.elevator.call_button_light(call.floor, button, false);
                }
            }
            self.queue.drop_halls();
        } else {
            info!("car {} stop button released, back in service", self.id);
            self.stopped = false;
            let _ = self.set_cmd_tx.send(SetCmd::Add(self.id));
            self.settle(obstruction_rx);
        }
        self.report();
    }

    /// Common tail for every queue change: re-sort, move if allowed, report.
    fn rework(&mut self, obstruction_rx: &cbc::Receiver<bool>) {
        self.queue.sort(self.dirn, &self.pos);
        if !self.stopped {
            self.settle(obstruction_rx);
        }
        self.report();
    }

    /// Brings motor and queue back in agreement: serves whatever the head
    /// order wants at the current floor, then aims at the next one, until
    /// the cab is either moving toward an order or idle with none left.
    fn settle(&mut self, obstruction_rx: &cbc::Receiver<bool>) {
        loop {
            let head = match self.queue.head() {
                Some(order) => *order,
                None => {
                    if self.dirn != Dirn::Stop {
                        self.elevator.motor_direction(elev::DIRN_STOP);
                        self.dirn = Dirn::Stop;
                    }
                    return;
                }
            };
            if self.dirn == Dirn::Stop && self.pos.at_floor() == Some(head.floor) {
                self.serve_here(head.floor, obstruction_rx);
                continue;
            }
            match queue::dirn_toward(self.pos.cell(), head.floor) {
                Dirn::Stop => {
                    // on the head's floor but still rolling: halt, then serve
                    self.elevator.motor_direction(elev::DIRN_STOP);
                    self.dirn = Dirn::Stop;
                }
                aim if aim != self.dirn => {
                    self.dirn = aim;
                    self.elevator.motor_direction(aim.as_motor());
                    return;
                }
                _ => return,
            }
        }
    }

    /// Opens for the orders at this floor: pops them, clears their lamps,
    /// reports the shrunk queue so the master can announce the completions,
    /// and holds the door.
    fn serve_here(&mut self, floor: u8, obstruction_rx: &cbc::Receiver<bool>) {
        let served = self.queue.pop_arrived(floor);
        if served.is_empty() {
            return;
        }
        info!("car {} serving floor {}: {:?}", self.id, floor, served);
        for order in &served {
            match order.kind {
                OrderKind::Cab => self.elevator.call_button_light(floor, elev::CAB, false),
                OrderKind::Hall => {
                    let button = match order.dir {
                        Some(OrderDir::Up) => elev::HALL_UP,
                        _ => elev::HALL_DOWN,
                    };
                    self.elevator.call_button_light(floor, button, false);
                }
            }
        }
        self.report();
        self.door_cycle(obstruction_rx);
    }

    /// Door open for a full dwell of unobstructed time. Every obstruction
    /// restarts the dwell once it clears.
    fn door_cycle(&mut self, obstruction_rx: &cbc::Receiver<bool>) {
        self.elevator.door_light(true);
        'dwell: loop {
            while self.obstructed {
                match obstruction_rx.recv() {
                    Ok(blocked) => self.obstructed = blocked,
                    Err(_) => break 'dwell,
                }
            }
            let deadline = cbc::after(DOOR_DWELL);
            loop {
                cbc::select! {
                    recv(deadline) -> _ => break 'dwell,
                    recv(obstruction_rx) -> msg => match msg {
                        Ok(blocked) => {
                            self.obstructed = blocked;
                            if blocked {
                                continue 'dwell;
                            }
                        }
                        Err(_) => break 'dwell,
                    },
                }
            }
        }
        self.elevator.door_light(false);
    }

    fn report(&self) {
        let state = CarState {
            behaviour: self.behaviour(),
            floor: self.last_floor,
            direction: self.dirn,
            pending: self.queue.snapshot(),
        };
        let _ = self.state_tx.send(StateReport { id: self.id, state });
    }

    fn behaviour(&self) -> Behaviour {
        if !self.initialized {
            Behaviour::Uninitialized
        } else if self.dirn == Dirn::Stop {
            Behaviour::Idle
        } else {
            Behaviour::Moving
        }
    }
}
