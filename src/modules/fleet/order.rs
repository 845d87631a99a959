//! ## Order Module
//! The `Order` value type shared by the queue, the dispatcher and the wire.
//!
//! Equality is structural and doubles as the dedup rule everywhere: a cab
//! order is identified by (floor, kind), a hall order by (floor, kind,
//! direction). Hall orders always carry `Some(direction)`, cab orders `None`.

use serde::{Deserialize, Serialize};

//-----------------------TYPES--------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Hall,
    Cab,
}

/// Direction a hall call was placed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDir {
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub floor: u8,
    pub kind: OrderKind,
    pub dir: Option<OrderDir>,
}

//-----------------------FUNCTIONS----------------------------------------------

impl Order {
    pub fn hall(floor: u8, dir: OrderDir) -> Order {
        Order {
            floor,
            kind: OrderKind::Hall,
            dir: Some(dir),
        }
    }

    pub fn cab(floor: u8) -> Order {
        Order {
            floor,
            kind: OrderKind::Cab,
            dir: None,
        }
    }

    pub fn is_hall(&self) -> bool {
        self.kind == OrderKind::Hall
    }

    pub fn is_cab(&self) -> bool {
        self.kind == OrderKind::Cab
    }
}

//-----------------------TESTS--------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hall_orders_differ_by_direction() {
        assert_ne!(Order::hall(2, OrderDir::Up), Order::hall(2, OrderDir::Down));
        assert_eq!(Order::hall(2, OrderDir::Up), Order::hall(2, OrderDir::Up));
    }

    #[test]
    fn cab_and_hall_at_same_floor_are_distinct() {
        assert_ne!(Order::cab(2), Order::hall(2, OrderDir::Up));
    }
}
