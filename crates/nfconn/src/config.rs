//! Dial options for [`Conn::dial`](crate::Conn::dial).

use std::os::unix::io::RawFd;

use super::group::Group;

/// Options applied when opening a netfilter socket.
///
/// # Example
///
/// ```ignore
/// use nfconn::{Config, Conn, Group, namespace};
///
/// let ns = namespace::open("myns")?;
/// let config = Config::new()
///     .netns(ns.as_raw_fd())
///     .groups(&Group::CONNTRACK);
/// let mut conn = Conn::dial(Some(&config))?;
/// assert!(conn.is_multicast());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) netns: Option<RawFd>,
    pub(crate) groups: Vec<Group>,
    pub(crate) ext_ack: bool,
    pub(crate) strict: bool,
    pub(crate) recv_buffer_size: Option<usize>,
    pub(crate) send_buffer_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            netns: None,
            groups: Vec::new(),
            ext_ack: true,
            strict: false,
            recv_buffer_size: None,
            send_buffer_size: None,
        }
    }
}

impl Config {
    /// Create a configuration with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the socket inside the network namespace referred to by `fd`.
    ///
    /// The descriptor only needs to stay open until the dial returns. The
    /// dialing thread enters the namespace for the duration of the call; if it
    /// cannot switch back, the dial fails with that error.
    pub fn netns(mut self, fd: RawFd) -> Self {
        self.netns = Some(fd);
        self
    }

    /// Join these multicast groups while dialing.
    ///
    /// A connection dialed with groups is a multicast connection and
    /// rejects queries.
    pub fn groups(mut self, groups: &[Group]) -> Self {
        self.groups = groups.to_vec();
        self
    }

    /// Request extended ACK reporting (on by default, ignored if unsupported).
    pub fn ext_ack(mut self, enabled: bool) -> Self {
        self.ext_ack = enabled;
        self
    }

    /// Enable strict checking of dump requests.
    pub fn strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }

    /// Set the socket receive buffer size (SO_RCVBUF).
    pub fn recv_buffer_size(mut self, bytes: usize) -> Self {
        self.recv_buffer_size = Some(bytes);
        self
    }

    /// Set the socket send buffer size (SO_SNDBUF).
    pub fn send_buffer_size(mut self, bytes: usize) -> Self {
        self.send_buffer_size = Some(bytes);
        self
    }

    /// Whether dialing with this configuration yields a multicast connection.
    pub fn is_multicast(&self) -> bool {
        !self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.netns, None);
        assert!(config.ext_ack);
        assert!(!config.strict);
        assert!(!config.is_multicast());
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .netns(7)
            .groups(&[Group::ConntrackNew, Group::NfTables])
            .strict(true)
            .ext_ack(false)
            .recv_buffer_size(1 << 20)
            .send_buffer_size(4096);
        assert_eq!(config.netns, Some(7));
        assert_eq!(config.groups, vec![Group::ConntrackNew, Group::NfTables]);
        assert!(config.strict);
        assert!(!config.ext_ack);
        assert_eq!(config.recv_buffer_size, Some(1 << 20));
        assert_eq!(config.send_buffer_size, Some(4096));
        assert!(config.is_multicast());
    }
}
