//! ## Broadcast Module
//! Typed UDP broadcast plumbing: one socket per topic port, one thread per
//! direction, crossbeam channels as the in-process ends.
//!
//! ## The functions include:
//! - 'bind_broadcast' - reusable broadcast socket on a topic port
//! - 'transmitter' - spawn a sender thread, returns the channel to feed it
//! - 'receiver' - spawn a listener thread, returns the channel it fills
//! - 'seal' / 'open' - bincode encoding wrapped in a CRC32 envelope
//!
//! Every datagram is the bincode encoding of [Envelope]: a CRC32 checksum
//! over the payload bytes, then the payload itself. A datagram that fails
//! the checksum or does not decode is dropped and logged, never an error.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::thread;

use crc32fast::Hasher;
use crossbeam_channel as cbc;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use socket2::{Domain, Socket, Type};

const MAX_DATAGRAM: usize = 2048;

//-----------------------ENVELOPE-----------------------------------------------

#[derive(Serialize, Deserialize)]
struct Envelope {
    checksum: u32,
    payload: Vec<u8>,
}

fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

/// seal
/// Encode a message and wrap it in a checksummed envelope.
///
/// # Arguments:
///
/// * `msg` - &T - the record to put on the wire.
///
/// # Returns:
///
/// Returns - Result<Vec<u8>, bincode::Error> - the datagram bytes.
///
pub fn seal<T: Serialize>(msg: &T) -> Result<Vec<u8>, bincode::Error> {
    let payload = bincode::serialize(msg)?;
    let envelope = Envelope {
        checksum: checksum(&payload),
        payload,
    };
    bincode::serialize(&envelope)
}

/// open
/// Unwrap and decode a datagram. Anything that does not check out is a None,
/// the caller just drops it.
///
/// # Arguments:
///
/// * `buf` - &[u8] - the raw datagram bytes.
///
/// # Returns:
///
/// Returns - Option<T> - the decoded record, or None for garbage.
///
pub fn open<T: DeserializeOwned>(buf: &[u8]) -> Option<T> {
    let envelope = match bincode::deserialize::<Envelope>(buf) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!("dropping undecodable datagram: {}", e);
            return None;
        }
    };
    if checksum(&envelope.payload) != envelope.checksum {
        warn!("dropping datagram with bad checksum");
        return None;
    }
    match bincode::deserialize::<T>(&envelope.payload) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("dropping datagram with undecodable payload: {}", e);
            None
        }
    }
}

//-----------------------SOCKETS------------------------------------------------

/// bind_broadcast
/// Broadcast socket on a topic port that several processes on one machine
/// can share, so a whole fleet can run side by side in the lab.
///
/// # Arguments:
///
/// * `port` - u16 - topic port to bind.
///
/// # Returns:
///
/// Returns - io::Result<UdpSocket> - the bound socket.
///
pub fn bind_broadcast(port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_broadcast(true)?;
    let addr: SocketAddr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into();
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

fn broadcast_addr(port: u16) -> SocketAddr {
    SocketAddrV4::new(Ipv4Addr::BROADCAST, port).into()
}

//-----------------------THREADS------------------------------------------------

/// transmitter
/// Spawn the sender thread for a topic. Everything sent on the returned
/// channel is sealed and broadcast on the port. The thread ends when every
/// sender clone is dropped.
///
/// # Arguments:
///
/// * `port` - u16 - topic port to broadcast on.
///
/// # Returns:
///
/// Returns - io::Result<cbc::Sender<T>> - the channel feeding the topic.
///
pub fn transmitter<T>(port: u16) -> io::Result<cbc::Sender<T>>
where
    T: Serialize + Send + 'static,
{
    let socket = bind_broadcast(0)?;
    let target = broadcast_addr(port);
    let (tx, rx) = cbc::unbounded::<T>();
    thread::spawn(move || {
        for msg in rx.iter() {
            let buf = match seal(&msg) {
                Ok(buf) => buf,
                Err(e) => {
                    error!("failed to encode message for port {}: {}", port, e);
                    continue;
                }
            };
            if let Err(e) = socket.send_to(&buf, target) {
                error!("broadcast on port {} failed: {}", port, e);
            }
        }
    });
    Ok(tx)
}

/// receiver
/// Spawn the listener thread for a topic. Valid datagrams come out on the
/// returned channel; the thread ends once the receiver is dropped.
///
/// # Arguments:
///
/// * `port` - u16 - topic port to listen on.
///
/// # Returns:
///
/// Returns - io::Result<cbc::Receiver<T>> - the channel the topic fills.
///
pub fn receiver<T>(port: u16) -> io::Result<cbc::Receiver<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    let socket = bind_broadcast(port)?;
    let (tx, rx) = cbc::unbounded::<T>();
    thread::spawn(move || {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let n = match socket.recv_from(&mut buf) {
                Ok((n, _)) => n,
                Err(e) => {
                    error!("receive on port {} failed: {}", port, e);
                    continue;
                }
            };
            if let Some(msg) = open::<T>(&buf[..n]) {
                if tx.send(msg).is_err() {
                    // Consumer gone, topic no longer wanted on this node.
                    return;
                }
            }
        }
    });
    Ok(rx)
}

//-----------------------TESTS--------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::fleet::order::OrderDir;
    use crate::modules::net::messages::HallCall;

    #[test]
    fn sealed_message_opens_to_the_same_value() {
        let call = HallCall { floor: 2, dir: OrderDir::Up };
        let buf = seal(&call).unwrap();
        assert_eq!(open::<HallCall>(&buf), Some(call));
    }

    #[test]
    fn corrupted_payload_is_dropped() {
        let call = HallCall { floor: 2, dir: OrderDir::Up };
        let mut buf = seal(&call).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xff;
        assert_eq!(open::<HallCall>(&buf), None);
    }

    #[test]
    fn truncated_datagram_is_dropped() {
        let call = HallCall { floor: 1, dir: OrderDir::Down };
        let buf = seal(&call).unwrap();
        assert_eq!(open::<HallCall>(&buf[..buf.len() / 2]), None);
    }
}
