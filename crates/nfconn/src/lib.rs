//! Blocking netlink connection for the Linux netfilter subsystem.
//!
//! This crate provides [`Conn`], a single NETLINK_NETFILTER socket that either
//! exchanges request/response messages with the kernel or receives multicast
//! events (conntrack, nftables, ...). Message bodies are opaque: the crate
//! frames netlink and nfnetlink headers and surfaces kernel error codes, and
//! leaves attribute encoding to callers.
//!
//! # Features
//!
//! - `testing` - [`testing::FuncTransport`], an in-memory transport
//!
//! # Example
//!
//! ```ignore
//! use nfconn::Conn;
//! use nfconn::message::{NLM_F_ACK, NLM_F_DUMP};
//! use nfconn::netfilter::{ProtoFamily, Subsystem, request};
//!
//! fn main() -> nfconn::Result<()> {
//!     let mut conn = Conn::dial(None)?;
//!
//!     // Dump the conntrack table
//!     let msg = request(Subsystem::Conntrack, 1, ProtoFamily::Unspec, NLM_F_DUMP, &[]);
//!     for reply in conn.query(msg)? {
//!         println!("{:?}", reply.header);
//!     }
//!
//!     conn.close()
//! }
//! ```
//!
//! # Event Monitoring
//!
//! ```ignore
//! use nfconn::{Config, Conn, Group};
//!
//! let mut conn = Conn::dial(Some(&Config::new().groups(&Group::CONNTRACK)))?;
//! loop {
//!     for msg in conn.receive()? {
//!         println!("{:?}", msg.header);
//!     }
//! }
//! ```
//!
//! # Errors
//!
//! Query failures share one prefix but keep their cause:
//!
//! ```ignore
//! use nfconn::ErrorKind;
//!
//! match conn.query(msg) {
//!     Err(e) if e.kind() == ErrorKind::Protocol => eprintln!("kernel said: {e}"),
//!     Err(e) if e.kind() == ErrorKind::Transport => eprintln!("socket failed: {e}"),
//!     Err(e) => return Err(e),
//!     Ok(replies) => { /* ... */ }
//! }
//! ```

pub mod config;
pub mod conn;
mod error;
pub mod group;
pub mod message;
pub mod namespace;
pub mod netfilter;
mod socket;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use config::Config;
pub use conn::Conn;
pub use error::{Error, ErrorKind, NETLINK_EXECUTE, Result};
pub use group::Group;
pub use message::{Header, Message, MessageIter, NLMSG_HDRLEN, NlMsgType};
pub use socket::NetlinkSocket;
pub use transport::Transport;
