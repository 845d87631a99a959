// Polling threads turning the driver's request/response calls into
// edge-triggered channel events.

use crossbeam_channel as cbc;
use std::thread;
use std::time;

use super::elev;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallButton {
    pub floor: u8,
    pub call: u8,
}

/// Goes through all (up, down, cab) buttons and checks status. A change from
/// negative to positive is sent through the channel in the parameter list.
pub fn call_buttons(elev: elev::Elevator, ch: cbc::Sender<CallButton>, period: time::Duration) {
    let mut prev = vec![[false; 3]; elev.num_floors.into()];
    loop {
        for f in 0..elev.num_floors {
            for c in 0..3 {
                let v = elev.call_button(f, c);
                if v && prev[f as usize][c as usize] != v {
                    ch.send(CallButton { floor: f, call: c }).unwrap();
                }
                prev[f as usize][c as usize] = v;
            }
        }
        thread::sleep(period)
    }
}

/// Reports `Some(floor)` when the cab arrives at a floor and `None` when it
/// leaves one, so the receiver can track half-floor positions in between.
pub fn floor_passings(elev: elev::Elevator, ch: cbc::Sender<Option<u8>>, period: time::Duration) {
    let mut prev = elev.floor_sensor();
    loop {
        let v = elev.floor_sensor();
        if v != prev {
            ch.send(v).unwrap();
            prev = v;
        }
        thread::sleep(period)
    }
}

/// Checks stop-button status. Changes from the previous iteration are sent on
/// the channel in the parameter list.
pub fn stop_button(elev: elev::Elevator, ch: cbc::Sender<bool>, period: time::Duration) {
    let mut prev = false;
    loop {
        let v = elev.stop_button();
        if prev != v {
            ch.send(v).unwrap();
            prev = v;
        }
        thread::sleep(period)
    }
}

/// Checks obstruction-switch status. Changes from the previous iteration are
/// sent on the channel in the parameter list.
pub fn obstruction(elev: elev::Elevator, ch: cbc::Sender<bool>, period: time::Duration) {
    let mut prev = false;
    loop {
        let v = elev.obstruction();
        if prev != v {
            ch.send(v).unwrap();
            prev = v;
        }
        thread::sleep(period)
    }
}
