//! ## Cost Module
//! The hall call pricing the master uses to pick a car. Greedy and local,
//! biased toward idle cars and cars already heading the right way. The
//! multipliers are part of the fleet's behaviour and stay as they are.

use crate::modules::fleet::order::OrderDir;
use crate::modules::fleet::state::{Behaviour, CarState, Dirn, FleetSnapshot};
use crate::modules::net::messages::HallCall;

//-----------------------FUNCTIONS----------------------------------------------

/// cost
/// Price one hall call for one car. Lower is better.
///
/// Base is 1 plus the floor distance. Idle halves it. A car moving past the
/// call's own floor doubles it, since it cannot reliably stop there any more.
/// Heading the same way with the call ahead halves it, heading the opposite
/// way adds half again.
///
/// # Arguments:
///
/// * `car` - &CarState - the candidate, as last reported.
/// * `call` - &HallCall - the unassigned hall call.
///
/// # Returns:
///
/// Returns - f64 - the price.
///
pub fn cost(car: &CarState, call: &HallCall) -> f64 {
    let call_floor = i16::from(call.floor);
    let car_floor = i16::from(car.floor);

    let mut cost = 1.0 + f64::from((call_floor - car_floor).abs());

    if car.behaviour == Behaviour::Idle {
        cost *= 0.5;
    }
    if car.behaviour == Behaviour::Moving && call_floor == car_floor {
        cost *= 2.0;
    }
    match (car.direction, call.dir) {
        (Dirn::Up, OrderDir::Up) if call_floor >= car_floor => cost *= 0.5,
        (Dirn::Down, OrderDir::Down) if call_floor <= car_floor => cost *= 0.5,
        (Dirn::Up, OrderDir::Down) | (Dirn::Down, OrderDir::Up) => cost *= 1.5,
        _ => {}
    }
    cost
}

/// select_car
/// Cheapest active car for a hall call. Walks the active set in its sorted
/// order and only replaces on a strictly lower price, so ties go to the
/// lowest id on every node that runs this.
///
/// # Arguments:
///
/// * `fleet` - &FleetSnapshot - the master's fleet view.
/// * `active` - &[u8] - serviceable car ids, sorted ascending.
/// * `call` - &HallCall - the unassigned hall call.
///
/// # Returns:
///
/// Returns - Option<(u8, f64)> - winning car and its price, or None when no
/// car is eligible (empty set, or everyone still uninitialized).
///
pub fn select_car(fleet: &FleetSnapshot, active: &[u8], call: &HallCall) -> Option<(u8, f64)> {
    let mut best: Option<(u8, f64)> = None;
    for &id in active {
        if let Some(car) = fleet.get(id) {
            if car.behaviour == Behaviour::Uninitialized {
                continue;
            }
            let price = cost(car, call);
            if best.map_or(true, |(_, b)| price < b) {
                best = Some((id, price));
            }
        }
    }
    best
}

//-----------------------TESTS--------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn car(behaviour: Behaviour, floor: i8, direction: Dirn) -> CarState {
        CarState { behaviour, floor, direction, pending: Vec::new() }
    }

    fn call(floor: u8, dir: OrderDir) -> HallCall {
        HallCall { floor, dir }
    }

    #[test]
    fn idle_car_two_floors_away_costs_one_point_five() {
        let c = cost(&car(Behaviour::Idle, 0, Dirn::Stop), &call(2, OrderDir::Up));
        assert_eq!(c, 1.5);
    }

    #[test]
    fn idle_never_costs_more_than_moving() {
        for floor in 0..4i8 {
            for call_floor in 0..4u8 {
                for dir in [OrderDir::Up, OrderDir::Down] {
                    let idle = cost(&car(Behaviour::Idle, floor, Dirn::Stop), &call(call_floor, dir));
                    let moving = cost(&car(Behaviour::Moving, floor, Dirn::Stop), &call(call_floor, dir));
                    assert!(idle <= moving, "idle {} > moving {} for floor {} call {}", idle, moving, floor, call_floor);
                }
            }
        }
    }

    #[test]
    fn aligned_call_ahead_is_half_price() {
        let c = cost(&car(Behaviour::Moving, 1, Dirn::Up), &call(3, OrderDir::Up));
        assert_eq!(c, 1.5); // (1 + 2) * 0.5
    }

    #[test]
    fn opposing_call_costs_half_again() {
        let c = cost(&car(Behaviour::Moving, 1, Dirn::Up), &call(0, OrderDir::Down));
        assert_eq!(c, 3.0); // (1 + 1) * 1.5
    }

    #[test]
    fn passing_through_the_call_floor_is_penalized() {
        let c = cost(&car(Behaviour::Moving, 2, Dirn::Up), &call(2, OrderDir::Down));
        assert_eq!(c, 3.0); // 1 * 2 * 1.5
    }

    #[test]
    fn lone_idle_car_wins_the_basic_dispatch() {
        let mut fleet = FleetSnapshot::uninitialized();
        let mut state = car(Behaviour::Idle, 0, Dirn::Stop);
        state.floor = 0;
        fleet.set(0, state);
        let picked = select_car(&fleet, &[0], &call(2, OrderDir::Up));
        assert_eq!(picked, Some((0, 1.5)));
    }

    #[test]
    fn ties_go_to_the_lowest_id() {
        let mut fleet = FleetSnapshot::uninitialized();
        fleet.set(1, car(Behaviour::Idle, 1, Dirn::Stop));
        fleet.set(2, car(Behaviour::Idle, 1, Dirn::Stop));
        let picked = select_car(&fleet, &[1, 2], &call(3, OrderDir::Up));
        assert_eq!(picked.map(|(id, _)| id), Some(1));
    }

    #[test]
    fn uninitialized_cars_are_never_picked() {
        let fleet = FleetSnapshot::uninitialized();
        assert_eq!(select_car(&fleet, &[0, 1, 2], &call(1, OrderDir::Up)), None);
    }
}
