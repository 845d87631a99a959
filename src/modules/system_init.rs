//! ## System Init Module
//! Once per process boot: logging, command line parsing and sanity checks.
//!
//! contains:
//! `boot` parses the command line and returns the node's boot configuration.
//! `parse_role` maps a role name from the command line onto a Role.

//-----------------------IMPORTS------------------------------------------------

use anyhow::{bail, Result};
use clap::Parser;
use local_ip_address::local_ip;
use log::info;

use crate::modules::config::FLEET_SIZE;
use crate::modules::fleet::identity::Role;

//-----------------------STRUCTS------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "liftnet", about = "One node of the elevator fleet")]
struct BootArgs {
    /// Fleet id of this car, 0 based
    #[arg(long)]
    id: u8,

    /// Starting role: master, primarybackup or regular
    #[arg(long, default_value = "regular")]
    role: String,

    /// Address of the elevator hardware server
    #[arg(long, default_value = "localhost:15657")]
    addr: String,
}

/// Everything main needs to bring the node up.
pub struct BootConfig {
    pub id: u8,
    pub role: Role,
    pub addr: String,
}

//-----------------------FUNCTIONS----------------------------------------------

/// Boots the process: initializes logging, parses the command line and
/// validates it against the fleet geometry.
///
/// # Returns:
/// The boot configuration, or an error describing what was wrong with the
/// command line.
pub fn boot() -> Result<BootConfig> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = BootArgs::parse();
    if usize::from(args.id) >= FLEET_SIZE {
        bail!("car id {} is outside the fleet, ids go from 0 to {}", args.id, FLEET_SIZE - 1);
    }
    let role = parse_role(&args.role)?;

    match local_ip() {
        Ok(ip) => info!("car {} booting as {} on {}", args.id, role, ip),
        Err(e) => info!("car {} booting as {}, local ip unknown ({})", args.id, role, e),
    }

    Ok(BootConfig { id: args.id, role, addr: args.addr })
}

pub fn parse_role(name: &str) -> Result<Role> {
    match name.to_lowercase().as_str() {
        "master" => Ok(Role::Master),
        "primarybackup" | "backup" => Ok(Role::PrimaryBackup),
        "regular" => Ok(Role::Regular),
        other => bail!("unknown role {:?}, expected master, primarybackup or regular", other),
    }
}

//-----------------------TESTS--------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_parse_case_insensitively() {
        assert_eq!(parse_role("master").unwrap(), Role::Master);
        assert_eq!(parse_role("Master").unwrap(), Role::Master);
        assert_eq!(parse_role("primarybackup").unwrap(), Role::PrimaryBackup);
        assert_eq!(parse_role("backup").unwrap(), Role::PrimaryBackup);
        assert_eq!(parse_role("regular").unwrap(), Role::Regular);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(parse_role("admiral").is_err());
    }
}
