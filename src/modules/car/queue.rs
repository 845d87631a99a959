//! ## Order Queue Module
//! The cab's private order list, kept in service order. Sorting sweeps the
//! shaft like an elevator does: first everything servable ahead in the
//! current direction, then the opposite sweep, then back again for whatever
//! needs a second pass. Hall orders pointing against the sweep are deferred
//! to the sweep that matches them, except at the extreme floor of the sweep
//! where the cab turns anyway.
//!
//! contains:
//! `OrderQueue::add` adds an order if it is not already queued.
//! `OrderQueue::sort` re-sorts the queue for a direction and position.
//! `OrderQueue::pop_arrived` takes the orders served by stopping at a floor.
//! `dirn_toward` picks the travel direction toward a target floor.

use crate::modules::car::position::PositionVector;
use crate::modules::fleet::order::{Order, OrderDir, OrderKind};
use crate::modules::fleet::state::Dirn;

//-----------------------STRUCTS------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct OrderQueue {
    orders: Vec<Order>,
}

impl OrderQueue {
    pub fn new() -> OrderQueue {
        OrderQueue { orders: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn head(&self) -> Option<&Order> {
        self.orders.first()
    }

    pub fn snapshot(&self) -> Vec<Order> {
        self.orders.clone()
    }

    /// Queues the order unless an identical one is already there.
    ///
    /// # Returns:
    /// `true` if the queue changed.
    pub fn add(&mut self, order: Order) -> bool {
        if self.orders.contains(&order) {
            return false;
        }
        self.orders.push(order);
        true
    }

    /// Drops every hall order, keeping the cab orders. Used when the car
    /// takes itself out of service and hands its hall orders back.
    pub fn drop_halls(&mut self) {
        self.orders.retain(|o| o.is_cab());
    }

    /// Removes and returns the leading run of orders at `floor`. Orders for
    /// the same floor scheduled for a later sweep are left alone.
    pub fn pop_arrived(&mut self, floor: u8) -> Vec<Order> {
        let mut served = Vec::new();
        while let Some(head) = self.orders.first() {
            if head.floor != floor {
                break;
            }
            served.push(self.orders.remove(0));
        }
        served
    }

    /// Re-sorts the whole queue into sweep order, seen from `pos` heading in
    /// `dirn`. With no set direction the side holding the majority of the
    /// orders is swept first, nearest order deciding a tie.
    pub fn sort(&mut self, dirn: Dirn, pos: &PositionVector) {
        if self.orders.len() <= 1 {
            return;
        }
        let (first, rest, d1) = sort_in_direction(&self.orders, dirn, pos);

        let d2 = d1.reversed();
        let (second, rest, _) = sort_in_direction(&rest, d2, &PositionVector::extreme_for(d2));

        let d3 = d2.reversed();
        let (third, rest, _) = sort_in_direction(&rest, d3, &PositionVector::extreme_for(d3));

        self.orders = first;
        self.orders.extend(second);
        self.orders.extend(third);
        self.orders.extend(rest);
    }
}

//-----------------------FUNCTIONS----------------------------------------------

/// Travel direction from the cell `current` toward `target`.
pub fn dirn_toward(current: usize, target: u8) -> Dirn {
    let goal = 2 * usize::from(target);
    if goal > current {
        Dirn::Up
    } else if goal < current {
        Dirn::Down
    } else {
        Dirn::Stop
    }
}

/// One sweep partition: splits `orders` into those servable while moving in
/// `dirn` from `pos`, in stop order, and the rest for later sweeps.
///
/// # Returns:
/// (servable sorted by stop order, deferred, the direction actually swept)
fn sort_in_direction(
    orders: &[Order],
    dirn: Dirn,
    pos: &PositionVector,
) -> (Vec<Order>, Vec<Order>, Dirn) {
    if orders.is_empty() {
        return (Vec::new(), Vec::new(), dirn);
    }
    let cell = pos.cell();
    let d = match dirn {
        Dirn::Stop => decide_direction(orders, cell),
        moving => moving,
    };
    let highest = orders.iter().map(|o| o.floor).max().unwrap_or(0);
    let lowest = orders.iter().map(|o| o.floor).min().unwrap_or(0);

    let mut relevant = Vec::new();
    let mut deferred = Vec::new();
    for order in orders {
        if serves_in_sweep(order, d, cell, highest, lowest) {
            relevant.push(*order);
        } else {
            deferred.push(*order);
        }
    }
    match d {
        Dirn::Down => relevant.sort_by_key(|o| std::cmp::Reverse(o.floor)),
        _ => relevant.sort_by_key(|o| o.floor),
    }
    (relevant, deferred, d)
}

/// Whether a sweep in `d` from `cell` stops for `order`. Cab orders and hall
/// orders matching the sweep are taken if they lie ahead. A hall order
/// against the sweep is only taken at the extreme floor, where the cab
/// reverses anyway.
fn serves_in_sweep(order: &Order, d: Dirn, cell: usize, highest: u8, lowest: u8) -> bool {
    let order_cell = 2 * usize::from(order.floor);
    match d {
        Dirn::Up => {
            order_cell >= cell
                && (order.floor == highest
                    || order.kind == OrderKind::Cab
                    || order.dir == Some(OrderDir::Up))
        }
        Dirn::Down => {
            order_cell <= cell
                && (order.floor == lowest
                    || order.kind == OrderKind::Cab
                    || order.dir == Some(OrderDir::Down))
        }
        Dirn::Stop => false,
    }
}

/// Direction choice for an idle cab: toward the majority of the orders, or
/// toward the nearest order when the sides are even. Equally near orders on
/// both sides resolve downward.
fn decide_direction(orders: &[Order], cell: usize) -> Dirn {
    let above = orders.iter().filter(|o| 2 * usize::from(o.floor) > cell).count();
    let below = orders.iter().filter(|o| 2 * usize::from(o.floor) < cell).count();
    if above > below {
        return Dirn::Up;
    }
    if below > above {
        return Dirn::Down;
    }
    let nearest = orders
        .iter()
        .map(|o| {
            let order_cell = 2 * usize::from(o.floor);
            (order_cell.abs_diff(cell), o.floor)
        })
        .min();
    match nearest {
        Some((_, floor)) if 2 * usize::from(floor) > cell => Dirn::Up,
        _ => Dirn::Down,
    }
}

//-----------------------TESTS--------------------------------------------------
