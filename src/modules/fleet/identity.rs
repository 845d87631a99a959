//! ## Identity Module
//! Who a node is on the wire: car id plus its current role.

use std::fmt;

use serde::{Deserialize, Serialize};

//-----------------------TYPES--------------------------------------------------

/// The three coordination roles. Exactly one Master and one PrimaryBackup
/// are supposed to exist fleet wide; the role manager keeps it that way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Regular,
    PrimaryBackup,
    Master,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Regular => write!(f, "regular"),
            Role::PrimaryBackup => write!(f, "primarybackup"),
            Role::Master => write!(f, "master"),
        }
    }
}

/// Broadcast in every heartbeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarIdentity {
    pub id: u8,
    pub role: Role,
}
