//! The socket operations a [`Conn`](crate::Conn) is built on.

use super::error::Result;
use super::message::Message;

/// Blocking netlink transport.
///
/// [`NetlinkSocket`](crate::NetlinkSocket) is the kernel-backed
/// implementation. Implementations return kernel replies as they arrive,
/// `NLMSG_ERROR` messages included; interpreting embedded error codes is left
/// to the caller.
pub trait Transport {
    /// Send one request and collect every reply that belongs to it.
    fn execute(&mut self, request: Message) -> Result<Vec<Message>>;

    /// Send one message without waiting for a reply.
    fn send(&mut self, message: Message) -> Result<()>;

    /// Read the messages that are currently pending.
    fn receive(&mut self) -> Result<Vec<Message>>;

    /// Subscribe to a multicast group.
    fn join_group(&mut self, group: u32) -> Result<()>;

    /// Unsubscribe from a multicast group.
    fn leave_group(&mut self, group: u32) -> Result<()>;

    /// Release the underlying socket.
    fn close(&mut self) -> Result<()>;
}
