//! Blocking NETLINK_NETFILTER socket.

use std::fs::File;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tracing::{debug, trace, warn};

use super::config::Config;
use super::error::{Error, Result};
use super::message::{Header, Message, NLM_F_REQUEST, NlMsgType};
use super::transport::Transport;

/// Smallest buffer a datagram is read into.
const RECV_BUFFER_SIZE: usize = 32768;

// linux/netlink.h
const NETLINK_GET_STRICT_CHK: libc::c_int = 12;

/// Netlink socket speaking the netfilter protocol.
pub struct NetlinkSocket {
    /// The underlying socket, `None` once closed.
    socket: Option<Socket>,
    /// Sequence number counter.
    seq: AtomicU32,
    /// Local port ID (assigned by kernel).
    pid: u32,
}

impl NetlinkSocket {
    /// Open a socket with the given options.
    ///
    /// Groups listed in the configuration are not joined here; see
    /// [`Conn::dial`](crate::Conn::dial).
    pub fn open(config: &Config) -> Result<Self> {
        match config.netns {
            Some(ns_fd) => Self::open_in_namespace(config, ns_fd),
            None => Self::create_socket(config),
        }
    }

    /// Create the socket inside the network namespace referred to by `ns_fd`.
    ///
    /// The calling thread temporarily switches to the target namespace, creates
    /// the socket, then switches back. The socket keeps operating in the
    /// target namespace afterwards. If switching back fails the socket is
    /// dropped and the error returned.
    fn open_in_namespace(config: &Config, ns_fd: RawFd) -> Result<Self> {
        // Save the current namespace so we can restore it
        let current_ns = File::open("/proc/self/ns/net")?;

        enter_namespace(ns_fd)?;

        let result = Self::create_socket(config);

        // The thread must not stay in the target namespace
        if let Err(e) = enter_namespace(current_ns.as_raw_fd()) {
            warn!(error = %e, "failed to restore original network namespace");
            return Err(e);
        }

        result
    }

    fn create_socket(config: &Config) -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_NETFILTER)?;

        // Bind to get a port ID
        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let pid = addr.port_number();

        if config.ext_ack {
            socket.set_ext_ack(true).ok(); // Ignore if not supported
        }

        let fd = socket.as_raw_fd();
        if config.strict {
            set_int_option(fd, libc::SOL_NETLINK, NETLINK_GET_STRICT_CHK, 1)?;
        }
        if let Some(bytes) = config.recv_buffer_size {
            set_int_option(fd, libc::SOL_SOCKET, libc::SO_RCVBUF, clamp_size(bytes))?;
        }
        if let Some(bytes) = config.send_buffer_size {
            set_int_option(fd, libc::SOL_SOCKET, libc::SO_SNDBUF, clamp_size(bytes))?;
        }

        debug!(pid, netns = ?config.netns, "opened netfilter socket");

        Ok(Self {
            socket: Some(socket),
            seq: AtomicU32::new(1),
            pid,
        })
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Raw descriptor of the open socket.
    pub fn as_raw_fd(&self) -> Option<RawFd> {
        self.socket.as_ref().map(|s| s.as_raw_fd())
    }

    fn socket(&self) -> Result<&Socket> {
        self.socket.as_ref().ok_or(Error::Closed)
    }

    fn socket_mut(&mut self) -> Result<&mut Socket> {
        self.socket.as_mut().ok_or(Error::Closed)
    }

    /// Fill in sequence and port ID, send, and return the header as sent.
    fn send_message(&mut self, mut msg: Message) -> Result<Header> {
        if msg.header.sequence == 0 {
            msg.header.sequence = self.next_seq();
        }
        if msg.header.pid == 0 {
            msg.header.pid = self.pid;
        }

        let buf = msg.encode();
        self.socket()?.send(&buf, 0)?;

        let mut header = msg.header;
        header.length = msg.encoded_len() as u32;
        Ok(header)
    }

    /// Read one datagram.
    ///
    /// The pending datagram is peeked first so the buffer can hold all of it.
    fn recv_datagram(&self) -> Result<BytesMut> {
        let socket = self.socket()?;

        let mut peek = BytesMut::new();
        let len = socket.recv(&mut peek, libc::MSG_PEEK | libc::MSG_TRUNC)?;

        let mut buf = BytesMut::with_capacity(len.max(RECV_BUFFER_SIZE));
        let n = socket.recv(&mut buf, libc::MSG_TRUNC)?;
        trace!(bytes = n, "received datagram");
        check_truncated(n, buf.len())?;
        Ok(buf)
    }

    /// Read datagrams until a response is complete.
    ///
    /// With a `request`, only replies carrying its sequence number count
    /// towards the response.
    fn recv_response(&self, request: Option<&Header>) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        loop {
            let data = self.recv_datagram()?;
            if collect(&data, request, &mut messages)? {
                return Ok(messages);
            }
        }
    }
}

impl Transport for NetlinkSocket {
    fn execute(&mut self, mut request: Message) -> Result<Vec<Message>> {
        request.header.flags |= NLM_F_REQUEST;
        let sent = self.send_message(request)?;
        trace!(
            kind = sent.kind,
            flags = sent.flags,
            seq = sent.sequence,
            "executing request"
        );

        self.recv_response(Some(&sent))
    }

    fn send(&mut self, message: Message) -> Result<()> {
        self.send_message(message).map(|_| ())
    }

    fn receive(&mut self) -> Result<Vec<Message>> {
        self.recv_response(None)
    }

    fn join_group(&mut self, group: u32) -> Result<()> {
        self.socket_mut()?.add_membership(group)?;
        Ok(())
    }

    fn leave_group(&mut self, group: u32) -> Result<()> {
        self.socket_mut()?.drop_membership(group)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let socket = self.socket.take().ok_or(Error::Closed)?;
        let fd = socket.as_raw_fd();
        // Socket closes on drop and discards the result, so take the fd over.
        std::mem::forget(socket);

        // SAFETY: fd was owned by the forgotten socket and is closed exactly once.
        let ret = unsafe { libc::close(fd) };
        if ret < 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        debug!(pid = self.pid, "closed netfilter socket");
        Ok(())
    }
}

/// Add the messages of one datagram to a response.
///
/// A response ends with a message lacking `NLM_F_MULTI`, or with
/// `NLMSG_DONE`, which is not returned but whose error code is. `NLMSG_NOOP`
/// is skipped. With a `request`, messages carrying another sequence number
/// (multicast events, leftovers of an abandoned exchange) are skipped too.
///
/// Returns whether the response is complete.
fn collect(data: &[u8], request: Option<&Header>, messages: &mut Vec<Message>) -> Result<bool> {
    let mut complete = request.is_none();

    for msg in Message::parse_all(data)? {
        if let Some(request) = request {
            if msg.header.sequence != request.sequence {
                trace!(
                    seq = msg.header.sequence,
                    kind = msg.header.kind,
                    "skipping unrelated message"
                );
                continue;
            }
            validate(request, &msg.header)?;
        }

        if msg.header.is_done() {
            msg.check()?;
            return Ok(true);
        }
        if msg.header.kind == NlMsgType::NOOP {
            continue;
        }
        complete = !msg.header.is_multi();
        messages.push(msg);
    }

    Ok(complete)
}

/// Check that a reply belongs to the request that was sent.
fn validate(request: &Header, reply: &Header) -> Result<()> {
    if reply.sequence != request.sequence {
        return Err(Error::SequenceMismatch {
            expected: request.sequence,
            actual: reply.sequence,
        });
    }
    if request.pid != 0 && reply.pid != 0 && reply.pid != request.pid {
        return Err(Error::PortMismatch {
            expected: request.pid,
            actual: reply.pid,
        });
    }
    Ok(())
}

/// Fail when `recv` reported more bytes than fit the buffer.
fn check_truncated(received: usize, buffered: usize) -> Result<()> {
    if received > buffered {
        return Err(Error::Truncated {
            expected: received,
            actual: buffered,
        });
    }
    Ok(())
}

fn enter_namespace(fd: RawFd) -> Result<()> {
    // SAFETY: setns only reads the descriptor; an invalid one fails with EBADF.
    let ret = unsafe { libc::setns(fd, libc::CLONE_NEWNET) };
    if ret < 0 {
        return Err(Error::Io(io::Error::last_os_error()));
    }
    Ok(())
}

fn clamp_size(bytes: usize) -> libc::c_int {
    libc::c_int::try_from(bytes).unwrap_or(libc::c_int::MAX)
}

fn set_int_option(
    fd: RawFd,
    level: libc::c_int,
    name: libc::c_int,
    value: libc::c_int,
) -> Result<()> {
    // SAFETY: value lives across the call and its exact size is passed.
    let ret = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            &value as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(Error::Io(io::Error::last_os_error()));
    }
    Ok(())
}
