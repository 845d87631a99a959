//! ## State Module
//! Per-car state and the fleet wide aggregate the master keeps.
//!
//! ## The structs include:
//! - `Dirn` - travel direction, maps onto the driver's motor values
//! - `Behaviour` - what the car is doing right now
//! - `CarState` - one car as last reported
//! - `FleetSnapshot` - every car, indexed by car id

use serde::{Deserialize, Serialize};

use crate::modules::config::{FLEET_SIZE, UNKNOWN_FLOOR};
use crate::modules::elevio::elev;
use crate::modules::fleet::order::Order;

//-----------------------TYPES--------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dirn {
    Up,
    Down,
    Stop,
}

impl Dirn {
    /// Driver motor value for this direction.
    pub fn as_motor(self) -> u8 {
        match self {
            Dirn::Up => elev::DIRN_UP,
            Dirn::Down => elev::DIRN_DOWN,
            Dirn::Stop => elev::DIRN_STOP,
        }
    }

    pub fn reversed(self) -> Dirn {
        match self {
            Dirn::Up => Dirn::Down,
            Dirn::Down => Dirn::Up,
            Dirn::Stop => Dirn::Stop,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behaviour {
    Idle,
    Moving,
    Uninitialized,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarState {
    pub behaviour: Behaviour,
    /// Last floor the sensor reported, or [UNKNOWN_FLOOR] before the first hit.
    pub floor: i8,
    pub direction: Dirn,
    pub pending: Vec<Order>,
}

impl CarState {
    pub fn uninitialized() -> CarState {
        CarState {
            behaviour: Behaviour::Uninitialized,
            floor: UNKNOWN_FLOOR,
            direction: Dirn::Stop,
            pending: Vec::new(),
        }
    }

    pub fn hall_orders(&self) -> Vec<Order> {
        self.pending.iter().filter(|o| o.is_hall()).cloned().collect()
    }

    pub fn cab_orders(&self) -> Vec<Order> {
        self.pending.iter().filter(|o| o.is_cab()).cloned().collect()
    }
}

/// The master's view of the whole fleet, mirrored to the backup on every
/// state report. Index = car id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub cars: [CarState; FLEET_SIZE],
}

impl FleetSnapshot {
    pub fn uninitialized() -> FleetSnapshot {
        FleetSnapshot {
            cars: std::array::from_fn(|_| CarState::uninitialized()),
        }
    }

    /// None for ids outside the fleet, so wire input can never panic us.
    pub fn get(&self, id: u8) -> Option<&CarState> {
        self.cars.get(usize::from(id))
    }

    pub fn set(&mut self, id: u8, state: CarState) -> bool {
        match self.cars.get_mut(usize::from(id)) {
            Some(slot) => {
                *slot = state;
                true
            }
            None => false,
        }
    }
}

//-----------------------TESTS--------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::fleet::order::OrderDir;

    #[test]
    fn uninitialized_fleet_has_no_orders() {
        let fleet = FleetSnapshot::uninitialized();
        assert_eq!(fleet.cars.len(), FLEET_SIZE);
        for car in &fleet.cars {
            assert_eq!(car.behaviour, Behaviour::Uninitialized);
            assert_eq!(car.floor, UNKNOWN_FLOOR);
            assert!(car.pending.is_empty());
        }
    }

    #[test]
    fn hall_and_cab_filters_split_the_queue() {
        let mut state = CarState::uninitialized();
        state.pending = vec![
            Order::hall(3, OrderDir::Up),
            Order::cab(1),
            Order::hall(0, OrderDir::Down),
        ];
        assert_eq!(state.hall_orders().len(), 2);
        assert_eq!(state.cab_orders(), vec![Order::cab(1)]);
    }

    #[test]
    fn out_of_range_id_is_rejected() {
        let mut fleet = FleetSnapshot::uninitialized();
        assert!(fleet.get(FLEET_SIZE as u8).is_none());
        assert!(!fleet.set(FLEET_SIZE as u8, CarState::uninitialized()));
    }
}
