//! Netfilter netlink (nfnetlink) request framing.
//!
//! Every nfnetlink message starts with a [`NfGenMsg`] after the netlink
//! header, and its netlink message type packs the subsystem ID into the high
//! byte and the subsystem-specific message type into the low byte.
//! Attribute payloads are left to callers.
//!
//! # Example
//!
//! ```ignore
//! use nfconn::netfilter::{ProtoFamily, Subsystem, request};
//! use nfconn::message::{NLM_F_ACK, NLM_F_DUMP};
//!
//! // IPCTNL_MSG_CT_GET as a dump over all address families
//! let msg = request(Subsystem::Conntrack, 1, ProtoFamily::Unspec, NLM_F_DUMP | NLM_F_ACK, &[]);
//! let replies = conn.query(msg)?;
//! ```

use zerocopy::byteorder::network_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::error::{Error, Result};
use super::message::{Message, NLM_F_REQUEST};

/// nfnetlink protocol version carried in every [`NfGenMsg`].
pub const NFNETLINK_V0: u8 = 0;

/// Size of the nfgenmsg header.
pub const NFGENMSG_LEN: usize = std::mem::size_of::<NfGenMsg>();

/// Netfilter generic message header (mirrors struct nfgenmsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NfGenMsg {
    /// Address family (AF_xxx).
    pub family: u8,
    /// nfnetlink version.
    pub version: u8,
    /// Resource ID, big endian.
    pub res_id: U16,
}

impl NfGenMsg {
    /// Create a header for the given family and resource ID.
    pub fn new(family: ProtoFamily, res_id: u16) -> Self {
        Self {
            family: family as u8,
            version: NFNETLINK_V0,
            res_id: U16::new(res_id),
        }
    }

    /// Address family of this message.
    pub fn family(&self) -> ProtoFamily {
        ProtoFamily::from_u8(self.family)
    }

    /// Parse the header from the front of a message payload.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: NFGENMSG_LEN,
                actual: data.len(),
            })
    }
}

/// Netfilter subsystem IDs (NFNL_SUBSYS_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Subsystem {
    None = 0,
    Conntrack = 1,
    ConntrackExp = 2,
    Queue = 3,
    Ulog = 4,
    Osf = 5,
    IpSet = 6,
    Acct = 7,
    ConntrackTimeout = 8,
    ConntrackHelper = 9,
    NfTables = 10,
    NfTCompat = 11,
    Hook = 12,
}

impl Subsystem {
    /// Look up a subsystem by its ID.
    pub fn from_u8(val: u8) -> Option<Self> {
        Some(match val {
            0 => Self::None,
            1 => Self::Conntrack,
            2 => Self::ConntrackExp,
            3 => Self::Queue,
            4 => Self::Ulog,
            5 => Self::Osf,
            6 => Self::IpSet,
            7 => Self::Acct,
            8 => Self::ConntrackTimeout,
            9 => Self::ConntrackHelper,
            10 => Self::NfTables,
            11 => Self::NfTCompat,
            12 => Self::Hook,
            _ => return None,
        })
    }

    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Conntrack => "conntrack",
            Self::ConntrackExp => "conntrack-exp",
            Self::Queue => "queue",
            Self::Ulog => "ulog",
            Self::Osf => "osf",
            Self::IpSet => "ipset",
            Self::Acct => "acct",
            Self::ConntrackTimeout => "conntrack-timeout",
            Self::ConntrackHelper => "conntrack-helper",
            Self::NfTables => "nftables",
            Self::NfTCompat => "nft-compat",
            Self::Hook => "hook",
        }
    }
}

/// Address families used in [`NfGenMsg::family`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ProtoFamily {
    Unspec = 0,
    /// Dual-stack family used by nftables.
    Inet = 1,
    Ipv4 = 2,
    Arp = 3,
    Netdev = 5,
    Bridge = 7,
    Ipv6 = 10,
    Decnet = 12,
}

impl ProtoFamily {
    fn from_u8(val: u8) -> Self {
        match val {
            1 => Self::Inet,
            2 => Self::Ipv4,
            3 => Self::Arp,
            5 => Self::Netdev,
            7 => Self::Bridge,
            10 => Self::Ipv6,
            12 => Self::Decnet,
            _ => Self::Unspec,
        }
    }
}

/// Pack a subsystem and message type into a netlink message type.
#[inline]
pub const fn message_type(subsystem: Subsystem, msg_type: u8) -> u16 {
    ((subsystem as u16) << 8) | msg_type as u16
}

/// Split a netlink message type into subsystem ID and message type.
#[inline]
pub const fn split_type(kind: u16) -> (u8, u8) {
    ((kind >> 8) as u8, (kind & 0xff) as u8)
}

/// Build an nfnetlink request.
///
/// The payload is the already-encoded attribute data following the
/// nfgenmsg header. `NLM_F_REQUEST` is always set.
pub fn request(
    subsystem: Subsystem,
    msg_type: u8,
    family: ProtoFamily,
    flags: u16,
    attrs: &[u8],
) -> Message {
    let header = NfGenMsg::new(family, 0);
    let mut data = Vec::with_capacity(NFGENMSG_LEN + attrs.len());
    data.extend_from_slice(header.as_bytes());
    data.extend_from_slice(attrs);
    Message::new(
        message_type(subsystem, msg_type),
        flags | NLM_F_REQUEST,
        data,
    )
}
