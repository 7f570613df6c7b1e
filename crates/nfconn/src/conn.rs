//! Netfilter netlink connection.

use tracing::{debug, trace};

use super::config::Config;
use super::error::{Error, Result};
use super::group::Group;
use super::message::Message;
use super::socket::NetlinkSocket;
use super::transport::Transport;

/// A connection to the kernel's netfilter subsystem.
///
/// A connection is either used for request/response exchanges with
/// [`query`](Self::query), or, when dialed with multicast groups, for
/// consuming events with [`receive`](Self::receive). The mode is fixed when
/// the connection is created.
///
/// Methods block on the underlying socket. A `Conn` is not synchronized;
/// share it between threads behind a lock.
pub struct Conn<T: Transport = NetlinkSocket> {
    transport: T,
    multicast: bool,
}

impl Conn<NetlinkSocket> {
    /// Open a netfilter socket.
    ///
    /// With no configuration the socket is created in the current network
    /// namespace and is usable for queries. If the configuration lists
    /// groups, they are joined before returning and the connection is a
    /// multicast connection.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use nfconn::{Config, Conn, Group};
    ///
    /// let mut conn = Conn::dial(None)?;
    /// let replies = conn.query(request)?;
    ///
    /// let mut events = Conn::dial(Some(&Config::new().groups(&Group::CONNTRACK)))?;
    /// loop {
    ///     for msg in events.receive()? {
    ///         println!("{:?}", msg.header);
    ///     }
    /// }
    /// ```
    pub fn dial(config: Option<&Config>) -> Result<Self> {
        let default = Config::default();
        let config = config.unwrap_or(&default);

        let mut transport = NetlinkSocket::open(config)?;
        for group in &config.groups {
            transport.join_group(group.id())?;
        }
        if config.is_multicast() {
            debug!(groups = ?config.groups, "dialed multicast connection");
        }

        Ok(Self::from_transport(transport, config.is_multicast()))
    }
}

impl<T: Transport> Conn<T> {
    /// Wrap an existing transport.
    pub fn from_transport(transport: T, multicast: bool) -> Self {
        Self {
            transport,
            multicast,
        }
    }

    /// Get the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the underlying transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Close the connection and release the socket.
    pub fn close(mut self) -> Result<()> {
        self.transport.close()
    }

    /// Whether this connection was created for multicast traffic.
    pub fn is_multicast(&self) -> bool {
        self.multicast
    }

    /// Send a request and collect its response.
    ///
    /// Fails with [`Error::MulticastQuery`] on a multicast connection without
    /// touching the socket. Any other failure is an [`Error::Execute`] whose
    /// cause is either the transport error or, when the kernel answered with
    /// an `NLMSG_ERROR` carrying a non-zero code, an [`Error::Kernel`].
    /// On success the replies are returned as received, ACKs included.
    pub fn query(&mut self, request: Message) -> Result<Vec<Message>> {
        if self.multicast {
            return Err(Error::MulticastQuery);
        }

        let replies = self.transport.execute(request).map_err(Error::execute)?;
        for reply in &replies {
            reply.check().map_err(Error::execute)?;
        }

        trace!(replies = replies.len(), "query complete");
        Ok(replies)
    }

    /// Read the messages currently pending on the connection.
    ///
    /// Nothing is sent first. Errors are returned as the transport reports
    /// them.
    pub fn receive(&mut self) -> Result<Vec<Message>> {
        self.transport.receive()
    }

    /// Subscribe to multicast groups.
    ///
    /// Groups are joined in order and the first failure is returned. Joining
    /// does not turn a query connection into a multicast one; dial with
    /// [`Config::groups`] for that.
    pub fn join_groups(&mut self, groups: &[Group]) -> Result<()> {
        if groups.is_empty() {
            return Err(Error::NoMulticastGroups);
        }

        for group in groups {
            self.transport.join_group(group.id())?;
            debug!(%group, "joined multicast group");
        }
        Ok(())
    }

    /// Unsubscribe from multicast groups.
    pub fn leave_groups(&mut self, groups: &[Group]) -> Result<()> {
        if groups.is_empty() {
            return Err(Error::NoMulticastGroups);
        }

        for group in groups {
            self.transport.leave_group(group.id())?;
            debug!(%group, "left multicast group");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::error::ErrorKind;
    use crate::message::{NLM_F_ACK, NLM_F_REQUEST, NlMsgType};
    use crate::testing::FuncTransport;

    fn req_ack() -> Message {
        Message::new(0, NLM_F_REQUEST | NLM_F_ACK, Vec::new())
    }

    #[test]
    fn test_query_echo() {
        let mut conn = Conn::from_transport(FuncTransport::echo(), false);
        let replies = conn.query(req_ack()).unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].header.flags, NLM_F_REQUEST | NLM_F_ACK);
    }

    #[test]
    fn test_query_ack_is_not_error() {
        let transport = FuncTransport::new(|_req| {
            Ok(vec![Message::new(NlMsgType::ERROR, 0, vec![0; 20])])
        });
        let mut conn = Conn::from_transport(transport, false);
        let replies = conn.query(req_ack()).unwrap();
        assert!(replies[0].header.is_error());
    }

    #[test]
    fn test_query_truncated_error_payload() {
        let transport =
            FuncTransport::new(|_req| Ok(vec![Message::new(NlMsgType::ERROR, 0, vec![1])]));
        let mut conn = Conn::from_transport(transport, false);
        let err = conn.query(req_ack()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().starts_with("netlink execute: message truncated"));
    }

    #[test]
    fn test_query_transport_error_kind() {
        let transport = FuncTransport::new(|_req| Err(Error::Io(io::Error::other("boom"))));
        let mut conn = Conn::from_transport(transport, false);
        let err = conn.query(req_ack()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(matches!(err.cause(), Some(Error::Io(_))));
    }

    #[test]
    fn test_multicast_skips_transport() {
        let mut conn = Conn::from_transport(FuncTransport::echo(), true);
        assert!(conn.is_multicast());
        assert!(conn.query(req_ack()).unwrap_err().is_multicast_query());
        assert_eq!(conn.transport().sent(), 0);
    }

    #[test]
    fn test_join_groups_keeps_mode() {
        let mut conn = Conn::from_transport(FuncTransport::echo(), false);
        conn.join_groups(&[Group::ConntrackNew, Group::ConntrackDestroy])
            .unwrap();
        assert_eq!(conn.transport().groups(), &[1, 3]);
        assert!(!conn.is_multicast());
        assert!(conn.query(req_ack()).is_ok());
    }

    #[test]
    fn test_leave_groups() {
        let mut conn = Conn::from_transport(FuncTransport::echo(), true);
        conn.join_groups(&Group::CONNTRACK).unwrap();
        conn.leave_groups(&[Group::ConntrackUpdate]).unwrap();
        assert_eq!(conn.transport().groups(), &[1, 3]);
        assert!(matches!(
            conn.leave_groups(&[]),
            Err(Error::NoMulticastGroups)
        ));
    }

    #[test]
    fn test_close() {
        let conn = Conn::from_transport(FuncTransport::echo(), false);
        assert!(conn.close().is_ok());
    }
}
