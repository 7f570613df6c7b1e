//! Error types for netfilter netlink connections.

use std::io;

/// Prefix shared by every failure of [`Conn::query`](crate::Conn::query).
pub const NETLINK_EXECUTE: &str = "netlink execute";

/// Result type for netfilter connection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur on a netfilter netlink connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket operations.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Kernel returned an error code embedded in a reply.
    #[error("errno {errno}")]
    Kernel {
        /// The errno value, i.e. the negated code found in the reply.
        errno: i32,
    },

    /// A query failed, either in the transport or in the kernel.
    ///
    /// The cause is kept as the error source so callers can tell the two
    /// apart with [`Error::kind`] or by matching on [`Error::cause`].
    #[error("netlink execute: {0}")]
    Execute(#[source] Box<Error>),

    /// A query was issued on a connection that receives multicast traffic.
    #[error(
        "Conn is attached to one or more multicast groups and can no longer be used for bidirectional traffic"
    )]
    MulticastQuery,

    /// Joining or leaving was requested with an empty group list.
    #[error("need one or more multicast groups to join")]
    NoMulticastGroups,

    /// Message was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Reply carried a sequence number other than the request's.
    #[error("sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch {
        /// Expected sequence number.
        expected: u32,
        /// Actual sequence number received.
        actual: u32,
    },

    /// Reply was addressed to another netlink port.
    #[error("port ID mismatch: expected {expected}, got {actual}")]
    PortMismatch {
        /// Port ID the request was sent from.
        expected: u32,
        /// Port ID found in the reply.
        actual: u32,
    },

    /// Unrecognized multicast group name.
    #[error("unknown multicast group: {0}")]
    UnknownGroup(String),

    /// The socket was already closed.
    #[error("connection is closed")]
    Closed,
}

/// Failure categories a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Query attempted on a multicast connection. No I/O was performed.
    MulticastQuery,
    /// Group join or leave with no groups. No I/O was performed.
    NoMulticastGroups,
    /// The socket layer failed, or a reply could not be framed or matched.
    Transport,
    /// The kernel answered with an explicit error code.
    Protocol,
    /// Invalid input that never reached the socket.
    InvalidInput,
    /// The connection was used after being closed.
    Closed,
}

impl Error {
    /// Create a kernel error from the code found in an `NLMSG_ERROR` payload.
    ///
    /// The kernel stores negative errno values, so the code is negated.
    pub fn from_code(code: i32) -> Self {
        Self::Kernel {
            errno: code.wrapping_neg(),
        }
    }

    /// Wrap a failure with the query prefix.
    pub fn execute(cause: Error) -> Self {
        Self::Execute(Box::new(cause))
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MulticastQuery => ErrorKind::MulticastQuery,
            Self::NoMulticastGroups => ErrorKind::NoMulticastGroups,
            Self::Kernel { .. } => ErrorKind::Protocol,
            Self::Execute(cause) => cause.kind(),
            Self::UnknownGroup(_) => ErrorKind::InvalidInput,
            Self::Closed => ErrorKind::Closed,
            Self::Io(_)
            | Self::Truncated { .. }
            | Self::InvalidMessage(_)
            | Self::SequenceMismatch { .. }
            | Self::PortMismatch { .. } => ErrorKind::Transport,
        }
    }

    /// The wrapped cause of a query failure, if this is one.
    pub fn cause(&self) -> Option<&Error> {
        match self {
            Self::Execute(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }

    /// Get the errno value if the kernel reported an error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno } => Some(*errno),
            Self::Execute(cause) => cause.errno(),
            _ => None,
        }
    }

    /// Get the OS error code of an I/O failure, looking through the query wrapper.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Io(e) => e.raw_os_error(),
            Self::Execute(cause) => cause.raw_os_error(),
            _ => None,
        }
    }

    /// Describe the kernel errno the way `strerror` would.
    pub fn kernel_message(&self) -> Option<String> {
        self.errno()
            .map(|errno| io::Error::from_raw_os_error(errno).to_string())
    }

    /// Check if this is the multicast query rejection.
    pub fn is_multicast_query(&self) -> bool {
        matches!(self, Self::MulticastQuery)
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        let code = self.errno().or_else(|| self.raw_os_error());
        matches!(code, Some(libc::EPERM | libc::EACCES))
    }

    /// Check if this is a "not found" error (ENOENT).
    pub fn is_not_found(&self) -> bool {
        if let Self::Io(e) = self
            && e.kind() == io::ErrorKind::NotFound
        {
            return true;
        }
        let code = self.errno().or_else(|| self.raw_os_error());
        code == Some(libc::ENOENT)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_from_code_negates() {
        assert_eq!(Error::from_code(-2).errno(), Some(2));
        assert_eq!(Error::from_code(1).errno(), Some(-1));
        assert_eq!(Error::from_code(1).to_string(), "errno -1");
    }

    #[test]
    fn test_from_code_min_does_not_overflow() {
        assert_eq!(Error::from_code(i32::MIN).errno(), Some(i32::MIN));
    }

    #[test]
    fn test_execute_prefix() {
        let err = Error::execute(Error::Io(io::Error::other("synthetic test error")));
        assert_eq!(err.to_string(), "netlink execute: synthetic test error");
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err = Error::execute(Error::from_code(1));
        assert_eq!(err.to_string(), "netlink execute: errno -1");
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_execute_source_is_cause() {
        let err = Error::execute(Error::from_code(-13));
        let source = err.source().expect("execute error has a source");
        assert_eq!(source.to_string(), "errno 13");
        assert!(matches!(err.cause(), Some(Error::Kernel { errno: 13 })));
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_kernel_message() {
        let err = Error::from_code(-2);
        assert!(err.is_not_found());
        let msg = err.kernel_message().unwrap();
        assert!(msg.contains("No such file or directory"));
        assert_eq!(Error::MulticastQuery.kernel_message(), None);
    }

    #[test]
    fn test_policy_kinds() {
        assert_eq!(Error::MulticastQuery.kind(), ErrorKind::MulticastQuery);
        assert_eq!(Error::NoMulticastGroups.kind(), ErrorKind::NoMulticastGroups);
        assert!(Error::MulticastQuery.is_multicast_query());
        assert!(!Error::NoMulticastGroups.is_multicast_query());
        assert_eq!(Error::Closed.kind(), ErrorKind::Closed);
    }

    #[test]
    fn test_io_is_transparent() {
        let err = Error::from(io::Error::from_raw_os_error(libc::EBADF));
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
        assert!(err.to_string().contains("Bad file descriptor"));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::NoMulticastGroups.to_string(),
            "need one or more multicast groups to join"
        );
        assert_eq!(
            Error::SequenceMismatch {
                expected: 4,
                actual: 7
            }
            .to_string(),
            "sequence mismatch: expected 4, got 7"
        );
        assert_eq!(
            Error::UnknownGroup("bogus".into()).to_string(),
            "unknown multicast group: bogus"
        );
    }
}
