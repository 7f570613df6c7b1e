//! One-line rendering of netfilter messages.

use nfconn::Message;
use nfconn::message::NLM_F_CREATE;
use nfconn::netfilter::{NfGenMsg, ProtoFamily, Subsystem, split_type};

/// Describe a message by subsystem, event and family.
pub fn describe(msg: &Message) -> String {
    let (subsys_id, msg_type) = split_type(msg.header.kind);

    let family = match NfGenMsg::from_bytes(&msg.data) {
        Ok(nfgen) => family_name(nfgen.family()),
        Err(_) => "?",
    };

    match Subsystem::from_u8(subsys_id) {
        Some(subsys @ (Subsystem::Conntrack | Subsystem::ConntrackExp)) => format!(
            "[{}] {} {} seq={} len={}",
            subsys.name(),
            conntrack_event(msg_type, msg.header.flags),
            family,
            msg.header.sequence,
            msg.header.length,
        ),
        Some(subsys) => format!(
            "[{}] type={} {} seq={} len={}",
            subsys.name(),
            msg_type,
            family,
            msg.header.sequence,
            msg.header.length,
        ),
        None => format!(
            "[subsys {}] type={} seq={} len={}",
            subsys_id, msg_type, msg.header.sequence, msg.header.length,
        ),
    }
}

/// Conntrack and expectation messages share NEW/GET/DELETE numbering.
fn conntrack_event(msg_type: u8, flags: u16) -> &'static str {
    match msg_type {
        0 if flags & NLM_F_CREATE != 0 => "NEW",
        0 => "UPDATE",
        1 => "GET",
        2 => "DESTROY",
        _ => "OTHER",
    }
}

fn family_name(family: ProtoFamily) -> &'static str {
    match family {
        ProtoFamily::Ipv4 => "ipv4",
        ProtoFamily::Ipv6 => "ipv6",
        ProtoFamily::Inet => "inet",
        ProtoFamily::Bridge => "bridge",
        ProtoFamily::Arp => "arp",
        ProtoFamily::Netdev => "netdev",
        ProtoFamily::Decnet => "decnet",
        ProtoFamily::Unspec => "unspec",
    }
}
