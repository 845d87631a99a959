//! ## Role Transition Module
//! The role state machine, as a pure function so it can be tested without a
//! single socket. The runtime that acts on the result lives in
//! [crate::modules::role::manager].

use crate::modules::fleet::identity::Role;

//-----------------------TYPES--------------------------------------------------

/// What the peer monitor saw, reduced to what role logic needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyEvent {
    Join {
        id: u8,
        role: Role,
    },
    Leave {
        id: u8,
        role: Role,
        /// True when the leave emptied the peer list: we are the one cut off,
        /// not them. Demote instead of promoting into a one-node fleet.
        isolated: bool,
    },
}

//-----------------------FUNCTIONS----------------------------------------------

/// next_role
/// The whole election in one match. Joins never change roles, a lost master
/// promotes the backup and backfills the backup seat from a regular, a lost
/// backup backfills the seat, and isolation demotes whoever we were.
///
/// # Arguments:
///
/// * `current` - Role - this node's role before the event.
/// * `event` - TopologyEvent - what just happened to the fleet.
///
/// # Returns:
///
/// Returns - Role - the role this node holds afterwards.
///
pub fn next_role(current: Role, event: TopologyEvent) -> Role {
    match event {
        TopologyEvent::Join { .. } => current,
        TopologyEvent::Leave { isolated: true, .. } => Role::Regular,
        TopologyEvent::Leave { role: Role::Master, .. } => match current {
            Role::Regular => Role::PrimaryBackup,
            Role::PrimaryBackup => Role::Master,
            Role::Master => Role::Master,
        },
        TopologyEvent::Leave { role: Role::PrimaryBackup, .. } => match current {
            Role::Regular => Role::PrimaryBackup,
            other => other,
        },
        TopologyEvent::Leave { role: Role::Regular, .. } => current,
    }
}

//-----------------------TESTS--------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn leave(role: Role) -> TopologyEvent {
        TopologyEvent::Leave { id: 9, role, isolated: false }
    }

    #[test]
    fn lost_master_promotes_backup_and_backfills() {
        assert_eq!(next_role(Role::PrimaryBackup, leave(Role::Master)), Role::Master);
        assert_eq!(next_role(Role::Regular, leave(Role::Master)), Role::PrimaryBackup);
        assert_eq!(next_role(Role::Master, leave(Role::Master)), Role::Master);
    }

    #[test]
    fn lost_backup_backfills_from_regular_only() {
        assert_eq!(next_role(Role::Regular, leave(Role::PrimaryBackup)), Role::PrimaryBackup);
        assert_eq!(next_role(Role::Master, leave(Role::PrimaryBackup)), Role::Master);
        assert_eq!(
            next_role(Role::PrimaryBackup, leave(Role::PrimaryBackup)),
            Role::PrimaryBackup
        );
    }

    #[test]
    fn lost_regular_changes_nothing() {
        assert_eq!(next_role(Role::Master, leave(Role::Regular)), Role::Master);
        assert_eq!(next_role(Role::PrimaryBackup, leave(Role::Regular)), Role::PrimaryBackup);
        assert_eq!(next_role(Role::Regular, leave(Role::Regular)), Role::Regular);
    }

    #[test]
    fn joins_never_change_roles() {
        for current in [Role::Regular, Role::PrimaryBackup, Role::Master] {
            assert_eq!(
                next_role(current, TopologyEvent::Join { id: 1, role: Role::Regular }),
                current
            );
        }
    }

    #[test]
    fn isolation_demotes_regardless_of_roles() {
        for current in [Role::Regular, Role::PrimaryBackup, Role::Master] {
            for lost in [Role::Regular, Role::PrimaryBackup, Role::Master] {
                let event = TopologyEvent::Leave { id: 9, role: lost, isolated: true };
                assert_eq!(next_role(current, event), Role::Regular);
            }
        }
    }

    #[test]
    fn single_failures_keep_at_most_one_master() {
        // Three nodes with the conventional start. Kill one node at a time and
        // replay the leave at every survivor; the survivors must never hold
        // two masterships, and after each step exactly one master remains.
        let mut roles = vec![Some(Role::Master), Some(Role::PrimaryBackup), Some(Role::Regular)];

        for victim in [0usize, 1usize] {
            let lost_role = roles[victim].take().unwrap();
            for slot in roles.iter_mut() {
                if let Some(current) = *slot {
                    *slot = Some(next_role(
                        current,
                        TopologyEvent::Leave { id: victim as u8, role: lost_role, isolated: false },
                    ));
                }
            }
            let masters = roles.iter().flatten().filter(|r| **r == Role::Master).count();
            assert_eq!(masters, 1, "after losing node {}", victim);
        }
    }
}
