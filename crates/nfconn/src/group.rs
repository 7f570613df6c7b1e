//! Multicast groups for NETLINK_NETFILTER.

use std::fmt;
use std::str::FromStr;

use super::error::Error;

/// Netfilter multicast group (NFNLGRP_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// New conntrack entries.
    ConntrackNew,
    /// Updated conntrack entries.
    ConntrackUpdate,
    /// Destroyed conntrack entries.
    ConntrackDestroy,
    /// New conntrack expectations.
    ConntrackExpNew,
    /// Updated conntrack expectations.
    ConntrackExpUpdate,
    /// Destroyed conntrack expectations.
    ConntrackExpDestroy,
    /// nftables ruleset changes.
    NfTables,
    /// nfacct quota notifications.
    AcctQuota,
    /// nftables trace events.
    NfTrace,
    /// Any other group ID.
    Other(u32),
}

impl Group {
    /// All conntrack entry event groups.
    pub const CONNTRACK: [Group; 3] = [
        Group::ConntrackNew,
        Group::ConntrackUpdate,
        Group::ConntrackDestroy,
    ];

    /// Get the kernel group ID.
    pub fn id(&self) -> u32 {
        match self {
            Self::ConntrackNew => 1,
            Self::ConntrackUpdate => 2,
            Self::ConntrackDestroy => 3,
            Self::ConntrackExpNew => 4,
            Self::ConntrackExpUpdate => 5,
            Self::ConntrackExpDestroy => 6,
            Self::NfTables => 7,
            Self::AcctQuota => 8,
            Self::NfTrace => 9,
            Self::Other(id) => *id,
        }
    }

    /// Map a kernel group ID back to a group.
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Self::ConntrackNew,
            2 => Self::ConntrackUpdate,
            3 => Self::ConntrackDestroy,
            4 => Self::ConntrackExpNew,
            5 => Self::ConntrackExpUpdate,
            6 => Self::ConntrackExpDestroy,
            7 => Self::NfTables,
            8 => Self::AcctQuota,
            9 => Self::NfTrace,
            other => Self::Other(other),
        }
    }
}

impl From<Group> for u32 {
    fn from(group: Group) -> u32 {
        group.id()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConntrackNew => write!(f, "ct-new"),
            Self::ConntrackUpdate => write!(f, "ct-update"),
            Self::ConntrackDestroy => write!(f, "ct-destroy"),
            Self::ConntrackExpNew => write!(f, "exp-new"),
            Self::ConntrackExpUpdate => write!(f, "exp-update"),
            Self::ConntrackExpDestroy => write!(f, "exp-destroy"),
            Self::NfTables => write!(f, "nftables"),
            Self::AcctQuota => write!(f, "acct-quota"),
            Self::NfTrace => write!(f, "nftrace"),
            Self::Other(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for Group {
    type Err = Error;

    /// Parse a group name as printed by `Display`, or a numeric ID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ct-new" => Self::ConntrackNew,
            "ct-update" => Self::ConntrackUpdate,
            "ct-destroy" => Self::ConntrackDestroy,
            "exp-new" => Self::ConntrackExpNew,
            "exp-update" => Self::ConntrackExpUpdate,
            "exp-destroy" => Self::ConntrackExpDestroy,
            "nftables" => Self::NfTables,
            "acct-quota" => Self::AcctQuota,
            "nftrace" => Self::NfTrace,
            other => match other.parse::<u32>() {
                Ok(id) if id != 0 => Self::from_id(id),
                _ => return Err(Error::UnknownGroup(other.to_string())),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        assert_eq!(Group::ConntrackNew.id(), 1);
        assert_eq!(Group::NfTrace.id(), 9);
        assert_eq!(u32::from(Group::Other(42)), 42);
        assert_eq!(Group::from_id(3), Group::ConntrackDestroy);
        assert_eq!(Group::from_id(31), Group::Other(31));
    }

    #[test]
    fn test_parse_names() {
        for group in Group::CONNTRACK {
            assert_eq!(group.to_string().parse::<Group>().unwrap(), group);
        }
        assert_eq!("nftables".parse::<Group>().unwrap(), Group::NfTables);
        assert_eq!("5".parse::<Group>().unwrap(), Group::ConntrackExpUpdate);
    }

    #[test]
    fn test_parse_rejects() {
        assert!(matches!(
            "bogus".parse::<Group>(),
            Err(Error::UnknownGroup(name)) if name == "bogus"
        ));
        assert!("0".parse::<Group>().is_err());
    }
}
