//! ## Stall Module
//! Watches the state-report feed for cars that went quiet while still holding
//! orders. The identity heartbeat can keep beating from a frozen process, so
//! liveness is judged on the state topic, where real work shows up.
//!
//! A stalled car is pulled from the active set and its hall orders go back
//! on the raw hall call topic as if freshly pressed. One episode at a time:
//! the tracker declares a given stall once, and the car's next report puts
//! it back in rotation.

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel as cbc;
use log::{info, warn};

use crate::modules::active_set::SetCmd;
use crate::modules::config::{STALL_POLL_INTERVAL, STALL_TIMEOUT};
use crate::modules::fleet::order::Order;
use crate::modules::net::messages::HallCall;

//-----------------------TRACKER------------------------------------------------

struct Record {
    last_seen: Instant,
    pending: Vec<Order>,
}

pub struct StallEvent {
    pub id: u8,
    /// Hall orders the car was last known to hold. Cab orders stay with it.
    pub halls: Vec<Order>,
}

/// Per-car report bookkeeping, kept free of channels and clocks so the
/// timeout logic can be tested directly.
pub struct StallTracker {
    records: HashMap<u8, Record>,
    stalled: Option<u8>,
    timeout: Duration,
}

impl StallTracker {
    pub fn new(timeout: Duration) -> StallTracker {
        StallTracker {
            records: HashMap::new(),
            stalled: None,
            timeout,
        }
    }

    /// A state report from `id`. Returns true when it ends a stall episode
    /// and the car should rejoin the active set.
    pub fn record_report(&mut self, id: u8, pending: Vec<Order>, now: Instant) -> bool {
        let recovered = self.stalled == Some(id);
        if recovered {
            self.stalled = None;
        }
        self.records.insert(id, Record { last_seen: now, pending });
        recovered
    }

    /// One pass over the records. At most one stall is declared, and none
    /// while an earlier episode is still open.
    pub fn sweep(&mut self, now: Instant) -> Option<StallEvent> {
        if self.stalled.is_some() {
            return None;
        }
        let id = self
            .records
            .iter()
            .filter(|(_, r)| {
                now.duration_since(r.last_seen) > self.timeout && !r.pending.is_empty()
            })
            .map(|(&id, _)| id)
            .min()?;

        let record = self.records.remove(&id)?;
        self.stalled = Some(id);
        Some(StallEvent {
            id,
            halls: record.pending.iter().filter(|o| o.is_hall()).cloned().collect(),
        })
    }
}

//-----------------------THREAD-------------------------------------------------

/// spawn
/// Start the detector. It lives as long as the dispatcher holds the returned
/// activity channel; dropping it (demotion) ends the thread at its next pass.
///
/// # Arguments:
///
/// * `hall_tx` - cbc::Sender<HallCall> - the raw hall call topic, for
///   re-submitting a stalled car's hall orders.
/// * `set_cmd_tx` - cbc::Sender<SetCmd> - the active set tracker.
///
/// # Returns:
///
/// Returns - cbc::Sender<(u8, Vec<Order>)> - feed of (id, pending) per report.
///
pub fn spawn(
    hall_tx: cbc::Sender<HallCall>,
    set_cmd_tx: cbc::Sender<SetCmd>,
) -> cbc::Sender<(u8, Vec<Order>)> {
    let (activity_tx, activity_rx) = cbc::unbounded::<(u8, Vec<Order>)>();
    thread::spawn(move || run(activity_rx, hall_tx, set_cmd_tx));
    activity_tx
}

fn run(
    activity_rx: cbc::Receiver<(u8, Vec<Order>)>,
    hall_tx: cbc::Sender<HallCall>,
    set_cmd_tx: cbc::Sender<SetCmd>,
) {
    let mut tracker = StallTracker::new(STALL_TIMEOUT);
    let ticker = cbc::tick(STALL_POLL_INTERVAL);
    loop {
        cbc::select! {
            recv(activity_rx) -> msg => match msg {
                Ok((id, pending)) => {
                    if tracker.record_report(id, pending, Instant::now()) {
                        info!("car {} is reporting again, back in rotation", id);
                        if set_cmd_tx.send(SetCmd::Add(id)).is_err() {
                            return;
                        }
                    }
                }
                Err(_) => return,
            },
            recv(ticker) -> _ => {
                if let Some(stall) = tracker.sweep(Instant::now()) {
                    warn!(
                        "car {} went quiet holding {} hall orders, redistributing",
                        stall.id,
                        stall.halls.len()
                    );
                    if set_cmd_tx.send(SetCmd::Remove(stall.id)).is_err() {
                        return;
                    }
                    for order in &stall.halls {
                        if let Some(call) = HallCall::from_order(order) {
                            if hall_tx.send(call).is_err() {
                                return;
                            }
                        }
                    }
                }
            },
        }
    }
}

//-----------------------TESTS--------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::fleet::order::OrderDir;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn stall_is_declared_exactly_once_per_episode() {
        let t0 = Instant::now();
        let mut tracker = StallTracker::new(TIMEOUT);
        tracker.record_report(1, vec![Order::hall(1, OrderDir::Down)], t0);

        assert!(tracker.sweep(t0 + Duration::from_secs(5)).is_none());

        let stall = tracker.sweep(t0 + Duration::from_secs(11)).unwrap();
        assert_eq!(stall.id, 1);
        assert_eq!(stall.halls, vec![Order::hall(1, OrderDir::Down)]);

        // Still quiet much later: the episode has already been handled.
        assert!(tracker.sweep(t0 + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn a_car_with_nothing_to_do_is_allowed_to_be_quiet() {
        let t0 = Instant::now();
        let mut tracker = StallTracker::new(TIMEOUT);
        tracker.record_report(0, Vec::new(), t0);
        assert!(tracker.sweep(t0 + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn recovery_opens_the_door_for_a_new_episode() {
        let t0 = Instant::now();
        let mut tracker = StallTracker::new(TIMEOUT);
        tracker.record_report(2, vec![Order::cab(3)], t0);
        assert!(tracker.sweep(t0 + Duration::from_secs(11)).is_some());

        let t1 = t0 + Duration::from_secs(20);
        assert!(tracker.record_report(2, vec![Order::cab(3)], t1));

        assert!(tracker.sweep(t1 + Duration::from_secs(5)).is_none());
        let again = tracker.sweep(t1 + Duration::from_secs(11)).unwrap();
        assert_eq!(again.id, 2);
    }

    #[test]
    fn only_hall_orders_are_redistributed() {
        let t0 = Instant::now();
        let mut tracker = StallTracker::new(TIMEOUT);
        tracker.record_report(0, vec![Order::cab(2), Order::hall(3, OrderDir::Up)], t0);
        let stall = tracker.sweep(t0 + Duration::from_secs(11)).unwrap();
        assert_eq!(stall.halls, vec![Order::hall(3, OrderDir::Up)]);
    }

    #[test]
    fn second_stall_waits_for_the_first_to_clear() {
        let t0 = Instant::now();
        let mut tracker = StallTracker::new(TIMEOUT);
        tracker.record_report(0, vec![Order::cab(1)], t0);
        tracker.record_report(1, vec![Order::cab(2)], t0);

        let first = tracker.sweep(t0 + Duration::from_secs(11)).unwrap();
        assert_eq!(first.id, 0);
        // Car 1 is just as quiet, but the open episode blocks it.
        assert!(tracker.sweep(t0 + Duration::from_secs(12)).is_none());

        tracker.record_report(0, Vec::new(), t0 + Duration::from_secs(13));
        let second = tracker.sweep(t0 + Duration::from_secs(14)).unwrap();
        assert_eq!(second.id, 1);
    }
}
