//! ## Messages Module
//! One record type per broadcast topic port. Everything here is serde
//! serializable and goes on the wire through [crate::modules::net::bcast].
//!
//! ## The structs include:
//! - `HallCall` - a raw hall button press, before assignment
//! - `StateReport` - one car telling the master how it is doing
//! - `Assignment` - the master's pick for a hall call
//! - `Completed` - hall orders a car has finished, for lamp clearing
//! - `ActiveSetUpdate` - the full serviceable-car list
//! - `CabRequest` / `CabRecovery` - cab order hand-back after a reboot

use serde::{Deserialize, Serialize};

use crate::modules::fleet::order::{Order, OrderDir};
use crate::modules::fleet::state::CarState;

//-----------------------STRUCTS------------------------------------------------

/// A hall button press as broadcast by the car that saw it (or re-submitted
/// on behalf of a lost one). Not yet bound to any car.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallCall {
    pub floor: u8,
    pub dir: OrderDir,
}

impl HallCall {
    pub fn order(&self) -> Order {
        Order::hall(self.floor, self.dir)
    }

    /// A hall call back out of a queued order. None for cab orders, which
    /// never travel this topic.
    pub fn from_order(order: &Order) -> Option<HallCall> {
        match order.dir {
            Some(dir) if order.is_hall() => Some(HallCall { floor: order.floor, dir }),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateReport {
    pub id: u8,
    pub state: CarState,
}

/// Logically unicast: every car hears it, only `car` acts on it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub car: u8,
    pub order: Order,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Completed {
    pub orders: Vec<Order>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveSetUpdate {
    pub cars: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CabRequest {
    pub id: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CabRecovery {
    pub id: u8,
    pub orders: Vec<Order>,
}
