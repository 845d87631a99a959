//! Master failover: the hot standby must hand the promoted node exactly the
//! fleet picture the old master last replicated.

use std::thread;
use std::time::Duration;

use crossbeam_channel as cbc;

use liftnet::modules::backup;
use liftnet::modules::fleet::identity::Role;
use liftnet::modules::fleet::order::{Order, OrderDir};
use liftnet::modules::fleet::state::{Behaviour, CarState, Dirn, FleetSnapshot};
use liftnet::modules::role::transition::{next_role, TopologyEvent};

fn sample_fleet() -> FleetSnapshot {
    let mut fleet = FleetSnapshot::uninitialized();
    fleet.set(
        0,
        CarState {
            behaviour: Behaviour::Idle,
            floor: 2,
            direction: Dirn::Stop,
            pending: vec![Order::hall(3, OrderDir::Down)],
        },
    );
    fleet.set(
        1,
        CarState {
            behaviour: Behaviour::Moving,
            floor: 1,
            direction: Dirn::Up,
            pending: vec![Order::cab(3), Order::hall(0, OrderDir::Up)],
        },
    );
    fleet
}

#[test]
fn replica_hands_over_the_last_snapshot() {
    let (snapshot_tx, snapshot_rx) = cbc::unbounded();
    let replica = backup::spawn_from(snapshot_rx);

    snapshot_tx.send(FleetSnapshot::uninitialized()).unwrap();
    let fleet = sample_fleet();
    snapshot_tx.send(fleet.clone()).unwrap();

    // let the replica drain the feed before asking
    thread::sleep(Duration::from_millis(50));
    assert_eq!(replica.take_snapshot(), fleet);
}

#[test]
fn replica_without_any_feed_hands_over_an_uninitialized_fleet() {
    let (_snapshot_tx, snapshot_rx) = cbc::unbounded::<FleetSnapshot>();
    let replica = backup::spawn_from(snapshot_rx);
    assert_eq!(replica.take_snapshot(), FleetSnapshot::uninitialized());
}

#[test]
fn promoted_backup_starts_from_what_the_master_last_sent() {
    let (snapshot_tx, snapshot_rx) = cbc::unbounded();
    let replica = backup::spawn_from(snapshot_rx);

    let fleet = sample_fleet();
    snapshot_tx.send(fleet.clone()).unwrap();
    thread::sleep(Duration::from_millis(50));

    // the master drops off the net, the backup takes over
    let promoted = next_role(
        Role::PrimaryBackup,
        TopologyEvent::Leave { id: 0, role: Role::Master, isolated: false },
    );
    assert_eq!(promoted, Role::Master);

    // the new dispatcher is seeded with the replicated picture, not a blank one
    assert_eq!(replica.take_snapshot(), fleet);
}
