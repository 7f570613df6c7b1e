//! In-memory transport for exercising [`Conn`](crate::Conn) without a kernel.
//!
//! Enabled with the `testing` feature.
//!
//! # Example
//!
//! ```ignore
//! use nfconn::Conn;
//! use nfconn::testing::FuncTransport;
//!
//! // Every request is answered with a copy of itself
//! let mut conn = Conn::from_transport(FuncTransport::echo(), false);
//! let replies = conn.query(request)?;
//! ```

use std::collections::VecDeque;

use super::error::{Error, Result};
use super::message::Message;
use super::transport::Transport;

/// Port ID stamped on messages sent through a [`FuncTransport`].
pub const TEST_PID: u32 = 4242;

/// Handler type used by [`FuncTransport::echo`].
pub type Handler = fn(&Message) -> Result<Vec<Message>>;

/// A transport whose replies come from a closure.
///
/// Each sent message is passed to the handler and the returned messages are
/// queued; [`receive`](Transport::receive) pops one queued batch.
/// [`execute`](Transport::execute) is a send followed by a receive. Sent
/// messages get their length, sequence number and port ID filled in first.
pub struct FuncTransport<F = Handler> {
    handler: F,
    pending: VecDeque<Vec<Message>>,
    groups: Vec<u32>,
    seq: u32,
    sent: usize,
    closed: bool,
}

impl FuncTransport<Handler> {
    /// A transport that answers every message with the message itself.
    pub fn echo() -> Self {
        Self::new(echo_reply as Handler)
    }
}

impl<F> FuncTransport<F>
where
    F: FnMut(&Message) -> Result<Vec<Message>>,
{
    /// Create a transport driven by `handler`.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            pending: VecDeque::new(),
            groups: Vec::new(),
            seq: 1,
            sent: 0,
            closed: false,
        }
    }

    /// Number of messages handed to the handler.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Currently joined group IDs, in join order.
    pub fn groups(&self) -> &[u32] {
        &self.groups
    }

    /// Whether [`close`](Transport::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

impl<F> Transport for FuncTransport<F>
where
    F: FnMut(&Message) -> Result<Vec<Message>>,
{
    fn execute(&mut self, request: Message) -> Result<Vec<Message>> {
        self.send(request)?;
        self.receive()
    }

    fn send(&mut self, mut message: Message) -> Result<()> {
        self.ensure_open()?;

        message.header.length = message.encoded_len() as u32;
        if message.header.sequence == 0 {
            message.header.sequence = self.seq;
            self.seq = self.seq.wrapping_add(1);
        }
        if message.header.pid == 0 {
            message.header.pid = TEST_PID;
        }

        self.sent += 1;
        let replies = (self.handler)(&message)?;
        self.pending.push_back(replies);
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<Message>> {
        self.ensure_open()?;
        Ok(self.pending.pop_front().unwrap_or_default())
    }

    fn join_group(&mut self, group: u32) -> Result<()> {
        self.ensure_open()?;
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
        Ok(())
    }

    fn leave_group(&mut self, group: u32) -> Result<()> {
        self.ensure_open()?;
        self.groups.retain(|&g| g != group);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        Ok(())
    }
}

fn echo_reply(message: &Message) -> Result<Vec<Message>> {
    Ok(vec![message.clone()])
}
