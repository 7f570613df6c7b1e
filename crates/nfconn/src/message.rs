//! Netlink message header and framing.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::error::{Error, Result};

/// Netlink message header alignment.
pub const NLMSG_ALIGNTO: usize = 4;

/// Align a length to NLMSG_ALIGNTO boundary.
#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// Size of the netlink message header.
pub const NLMSG_HDRLEN: usize = nlmsg_align(std::mem::size_of::<Header>());

/// Standard netlink message types.
pub struct NlMsgType;

impl NlMsgType {
    /// No operation, message must be discarded.
    pub const NOOP: u16 = 1;
    /// Error message or ACK.
    pub const ERROR: u16 = 2;
    /// End of multipart message.
    pub const DONE: u16 = 3;
    /// Data lost, request resend.
    pub const OVERRUN: u16 = 4;
}

/// Netlink message flags.
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
pub const NLM_F_ECHO: u16 = 0x08;
pub const NLM_F_DUMP_INTR: u16 = 0x10;

// Modifiers to GET request
pub const NLM_F_ROOT: u16 = 0x100;
pub const NLM_F_MATCH: u16 = 0x200;
pub const NLM_F_DUMP: u16 = NLM_F_ROOT | NLM_F_MATCH;

// Modifiers to NEW request
pub const NLM_F_REPLACE: u16 = 0x100;
pub const NLM_F_EXCL: u16 = 0x200;
pub const NLM_F_CREATE: u16 = 0x400;

/// Netlink message header (mirrors struct nlmsghdr).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct Header {
    /// Length of message including header.
    pub length: u32,
    /// Message type.
    pub kind: u16,
    /// Additional flags.
    pub flags: u16,
    /// Sequence number.
    pub sequence: u32,
    /// Sending process port ID.
    pub pid: u32,
}

impl Header {
    /// Create a header with the given type and flags.
    ///
    /// Length, sequence and port ID are filled in by the transport.
    pub fn new(kind: u16, flags: u16) -> Self {
        Self {
            kind,
            flags,
            ..Self::default()
        }
    }

    /// Check if this is an error message.
    pub fn is_error(&self) -> bool {
        self.kind == NlMsgType::ERROR
    }

    /// Check if this is a done message.
    pub fn is_done(&self) -> bool {
        self.kind == NlMsgType::DONE
    }

    /// Check if this message has the multi flag.
    pub fn is_multi(&self) -> bool {
        self.flags & NLM_F_MULTI != 0
    }

    /// Parse header from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// A netlink message: header plus opaque payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Message header.
    pub header: Header,
    /// Payload following the header, without trailing alignment padding.
    pub data: Vec<u8>,
}

impl Message {
    /// Create a message with the given type, flags and payload.
    pub fn new(kind: u16, flags: u16, data: Vec<u8>) -> Self {
        Self {
            header: Header::new(kind, flags),
            data,
        }
    }

    /// Length of the encoded message, header included.
    pub fn encoded_len(&self) -> usize {
        NLMSG_HDRLEN + self.data.len()
    }

    /// Serialize the message, writing the computed length into the header.
    pub fn encode(&self) -> Vec<u8> {
        let mut header = self.header;
        header.length = self.encoded_len() as u32;

        let mut buf = Vec::with_capacity(nlmsg_align(self.encoded_len()));
        buf.extend_from_slice(header.as_bytes());
        buf.resize(NLMSG_HDRLEN, 0);
        buf.extend_from_slice(&self.data);
        buf.resize(nlmsg_align(buf.len()), 0);
        buf
    }

    /// Parse every message contained in one datagram.
    pub fn parse_all(data: &[u8]) -> Result<Vec<Message>> {
        MessageIter::new(data)
            .map(|res| {
                res.map(|(header, payload)| Message {
                    header: *header,
                    data: payload.to_vec(),
                })
            })
            .collect()
    }

    /// Decode the error code embedded in an `NLMSG_ERROR` message.
    ///
    /// Returns `None` for any other message type. A code of zero is an ACK.
    pub fn error_code(&self) -> Result<Option<i32>> {
        if !self.header.is_error() {
            return Ok(None);
        }
        let code: [u8; 4] = self
            .data
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::Truncated {
                expected: 4,
                actual: self.data.len(),
            })?;
        Ok(Some(i32::from_ne_bytes(code)))
    }

    /// Decode the code a failed dump leaves in its `NLMSG_DONE` payload.
    ///
    /// Returns `None` for other message types and for a payload too short to
    /// hold a code.
    pub fn done_code(&self) -> Option<i32> {
        if !self.header.is_done() {
            return None;
        }
        let code: [u8; 4] = self.data.get(..4)?.try_into().ok()?;
        Some(i32::from_ne_bytes(code))
    }

    /// Turn an embedded kernel error into an [`Error::Kernel`].
    ///
    /// Covers both `NLMSG_ERROR` replies and `NLMSG_DONE` terminators of
    /// interrupted dumps.
    pub fn check(&self) -> Result<()> {
        match self.error_code()?.or(self.done_code()) {
            Some(code) if code != 0 => Err(Error::from_code(code)),
            _ => Ok(()),
        }
    }
}

/// Iterator over netlink messages in a buffer.
pub struct MessageIter<'a> {
    data: &'a [u8],
}

impl<'a> MessageIter<'a> {
    /// Create a new message iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<(&'a Header, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        let header = match Header::from_bytes(self.data) {
            Ok(h) => h,
            Err(e) => {
                self.data = &[];
                return Some(Err(e));
            }
        };

        let msg_len = header.length as usize;
        if msg_len < NLMSG_HDRLEN || msg_len > self.data.len() {
            self.data = &[];
            return Some(Err(Error::InvalidMessage(format!(
                "invalid message length: {}",
                msg_len
            ))));
        }

        let payload = &self.data[NLMSG_HDRLEN..msg_len];
        let aligned_len = nlmsg_align(msg_len);

        // Move to next message
        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some(Ok((header, payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_message(code: i32) -> Message {
        Message::new(NlMsgType::ERROR, 0, code.to_ne_bytes().to_vec())
    }

    #[test]
    fn test_header_size() {
        assert_eq!(NLMSG_HDRLEN, 16);
    }

    #[test]
    fn test_encode_pads_and_sets_length() {
        let mut msg = Message::new(0x0101, NLM_F_REQUEST | NLM_F_ACK, vec![1, 2, 3]);
        msg.header.sequence = 9;
        let buf = msg.encode();

        assert_eq!(buf.len(), 20);
        let header = Header::from_bytes(&buf).unwrap();
        assert_eq!(header.length, 19);
        assert_eq!(header.kind, 0x0101);
        assert_eq!(header.sequence, 9);
        assert_eq!(&buf[16..19], &[1, 2, 3]);
        assert_eq!(buf[19], 0);
    }

    #[test]
    fn test_parse_all_multiple() {
        let first = Message::new(0x0100, NLM_F_MULTI, vec![0xaa; 5]);
        let done = Message::new(NlMsgType::DONE, NLM_F_MULTI, vec![0; 4]);
        let mut buf = first.encode();
        buf.extend_from_slice(&done.encode());

        let parsed = Message::parse_all(&buf).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].data, vec![0xaa; 5]);
        assert!(parsed[0].header.is_multi());
        assert!(parsed[1].header.is_done());
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        let mut buf = Message::new(0x0100, 0, vec![]).encode();
        buf[0] = 64;
        let err = Message::parse_all(&buf).unwrap_err();
        assert!(matches!(err, Error::InvalidMessage(_)));
    }

    #[test]
    fn test_parse_rejects_short_header() {
        let err = Message::parse_all(&[0u8; 6]).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                expected: 16,
                actual: 6
            }
        ));
    }

    #[test]
    fn test_error_code() {
        assert_eq!(error_message(-2).error_code().unwrap(), Some(-2));
        assert_eq!(error_message(0).error_code().unwrap(), Some(0));
        assert_eq!(Message::new(0x0100, 0, vec![]).error_code().unwrap(), None);
    }

    #[test]
    fn test_error_code_truncated() {
        let msg = Message::new(NlMsgType::ERROR, 0, vec![1, 0]);
        assert!(matches!(
            msg.error_code(),
            Err(Error::Truncated {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_check() {
        assert!(error_message(0).check().is_ok());
        let err = Message::new(NlMsgType::ERROR, 0, vec![1, 0, 0, 0])
            .check()
            .unwrap_err();
        assert_eq!(err.to_string(), "errno -1");
    }

    #[test]
    fn test_done_code() {
        let done = Message::new(NlMsgType::DONE, NLM_F_MULTI, (-22i32).to_ne_bytes().to_vec());
        assert_eq!(done.done_code(), Some(-22));
        assert_eq!(done.check().unwrap_err().errno(), Some(22));

        // Older kernels send an empty terminator
        let bare = Message::new(NlMsgType::DONE, NLM_F_MULTI, vec![]);
        assert_eq!(bare.done_code(), None);
        assert!(bare.check().is_ok());

        let clean = Message::new(NlMsgType::DONE, NLM_F_MULTI, vec![0; 4]);
        assert!(clean.check().is_ok());
        assert_eq!(error_message(-22).done_code(), None);
    }
}
