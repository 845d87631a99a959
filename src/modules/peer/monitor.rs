//! ## Peer Monitor Module
//! Keeps track of which cars are alive. Every node broadcasts its identity
//! every [HEARTBEAT_INTERVAL]; every node listens and times the others out
//! after [PEER_TIMEOUT]. Join and leave events go to the role manager as
//! [PeerUpdate]s.
//!
//! ## The functions include:
//! - 'spawn_transmitter' - heartbeat sender, role changes carried immediately
//! - 'spawn_receiver' - listener plus timeout sweep
//!
//! At most one lost car is reported per sweep pass. Losing two peers in the
//! same instant is outside the fault model, and reporting them one sweep
//! apart keeps every role transition single-stepped.

use std::collections::HashMap;
use std::io;
use std::net::UdpSocket;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel as cbc;
use log::{error, info, warn};

use crate::modules::config::{HEARTBEAT_INTERVAL, PEER_PORT, PEER_TIMEOUT};
use crate::modules::fleet::identity::{CarIdentity, Role};
use crate::modules::net::bcast;

//-----------------------STRUCTS------------------------------------------------

/// Sent to the role manager whenever the peer picture changes.
#[derive(Clone, Debug, PartialEq)]
pub struct PeerUpdate {
    /// Everyone currently alive (not counting this node), sorted by id.
    pub peers: Vec<CarIdentity>,
    pub new: Option<CarIdentity>,
    pub lost: Option<CarIdentity>,
}

//-----------------------FUNCTIONS----------------------------------------------

/// spawn_transmitter
/// Start the heartbeat thread. The returned channel updates the role the
/// beats carry; an update is broadcast at once instead of waiting out the
/// current interval.
///
/// # Arguments:
///
/// * `id` - u8 - this car's id.
/// * `initial_role` - Role - role to carry until the first update.
///
/// # Returns:
///
/// Returns - io::Result<cbc::Sender<Role>> - channel for role changes.
///
pub fn spawn_transmitter(id: u8, initial_role: Role) -> io::Result<cbc::Sender<Role>> {
    let socket = bcast::bind_broadcast(0)?;
    let (role_tx, role_rx) = cbc::unbounded::<Role>();
    thread::spawn(move || transmit_loop(socket, id, initial_role, role_rx));
    Ok(role_tx)
}

fn transmit_loop(socket: UdpSocket, id: u8, initial_role: Role, role_rx: cbc::Receiver<Role>) {
    let mut identity = CarIdentity { id, role: initial_role };
    loop {
        cbc::select! {
            recv(role_rx) -> msg => match msg {
                Ok(role) => identity.role = role,
                Err(_) => return,
            },
            default(HEARTBEAT_INTERVAL) => {}
        }
        match bcast::seal(&identity) {
            Ok(buf) => {
                if let Err(e) = socket.send_to(&buf, (std::net::Ipv4Addr::BROADCAST, PEER_PORT)) {
                    error!("heartbeat broadcast failed: {}", e);
                }
            }
            Err(e) => error!("failed to encode heartbeat: {}", e),
        }
    }
}

/// spawn_receiver
/// Start the listener thread. Joins are reported on first sight of an id,
/// leaves when an id has been quiet for [PEER_TIMEOUT].
///
/// # Arguments:
///
/// * `own_id` - u8 - this car's id; its own beats are ignored.
///
/// # Returns:
///
/// Returns - io::Result<cbc::Receiver<PeerUpdate>> - the update stream.
///
pub fn spawn_receiver(own_id: u8) -> io::Result<cbc::Receiver<PeerUpdate>> {
    let socket = bcast::bind_broadcast(PEER_PORT)?;
    socket.set_read_timeout(Some(HEARTBEAT_INTERVAL))?;
    let (update_tx, update_rx) = cbc::unbounded::<PeerUpdate>();
    thread::spawn(move || receive_loop(socket, own_id, update_tx));
    Ok(update_rx)
}

fn receive_loop(socket: UdpSocket, own_id: u8, update_tx: cbc::Sender<PeerUpdate>) {
    let mut last_seen: HashMap<u8, Instant> = HashMap::new();
    let mut roles: HashMap<u8, Role> = HashMap::new();
    let mut buf = [0u8; 512];

    loop {
        let mut new: Option<CarIdentity> = None;

        match socket.recv_from(&mut buf) {
            Ok((n, _)) => {
                if let Some(identity) = bcast::open::<CarIdentity>(&buf[..n]) {
                    if identity.id != own_id {
                        if !last_seen.contains_key(&identity.id) {
                            info!("peer {} joined as {}", identity.id, identity.role);
                            new = Some(identity);
                        }
                        last_seen.insert(identity.id, Instant::now());
                        roles.insert(identity.id, identity.role);
                    }
                }
            }
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => error!("heartbeat receive failed: {}", e),
        }

        let lost = first_expired(&last_seen, Instant::now(), PEER_TIMEOUT).map(|id| {
            let role = roles.remove(&id).unwrap_or(Role::Regular);
            last_seen.remove(&id);
            warn!("peer {} ({}) timed out", id, role);
            CarIdentity { id, role }
        });

        if new.is_some() || lost.is_some() {
            let mut peers: Vec<CarIdentity> = last_seen
                .keys()
                .map(|&id| CarIdentity {
                    id,
                    role: roles.get(&id).copied().unwrap_or(Role::Regular),
                })
                .collect();
            peers.sort_by_key(|p| p.id);
            if update_tx.send(PeerUpdate { peers, new, lost }).is_err() {
                return;
            }
        }
    }
}

/// Lowest expired id, or None. One per pass keeps leaves single-stepped.
fn first_expired(last_seen: &HashMap<u8, Instant>, now: Instant, timeout: Duration) -> Option<u8> {
    last_seen
        .iter()
        .filter(|(_, &seen)| now.duration_since(seen) > timeout)
        .map(|(&id, _)| id)
        .min()
}

//-----------------------TESTS--------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_reports_at_most_one_lost_peer() {
        let now = Instant::now();
        let stale = now - Duration::from_secs(2);
        let mut last_seen = HashMap::new();
        last_seen.insert(2u8, stale);
        last_seen.insert(1u8, stale);
        last_seen.insert(0u8, now);

        // Both 1 and 2 have expired, the sweep picks only the lowest.
        assert_eq!(first_expired(&last_seen, now, Duration::from_millis(500)), Some(1));
    }

    #[test]
    fn fresh_peers_do_not_expire() {
        let now = Instant::now();
        let mut last_seen = HashMap::new();
        last_seen.insert(0u8, now);
        assert_eq!(first_expired(&last_seen, now, Duration::from_millis(500)), None);
    }
}
