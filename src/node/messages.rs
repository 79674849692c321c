//! Membership Message Protocol
//!
//! Every message is laid out as `[type tag: u8][sender: 6 bytes][payload]`, all integers
//! little-endian:
//!
//! - `JoinRequest` / `Ping`: one reserved zero byte, then the sender heartbeat (`u64`)
//! - `JoinReply`: zero or more 22-byte entries `{host: u32, port: u16, heartbeat: u64,
//!   timestamp: u64}`. The entry count is implied by the buffer length, so the transport
//!   must deliver each datagram whole.
//!
use bytes::{Buf, BufMut};

use super::membership::MembershipEntry;
use super::node_id::{NodeId, NODE_ID_LEN};
use crate::error::ProtocolError;

/// Tag byte plus sender identity
pub const HEADER_LEN: usize = 1 + NODE_ID_LEN;
/// Encoded size of `JoinRequest` and `Ping`
pub const HEARTBEAT_MESSAGE_LEN: usize = HEADER_LEN + 1 + 8;
/// Encoded size of one `JoinReply` entry
pub const ENTRY_LEN: usize = NODE_ID_LEN + 8 + 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    JoinRequest = 0,
    JoinReply = 1,
    Ping = 2,
}

impl MessageType {
    /// Smallest buffer that can hold a message of this type
    pub fn min_len(&self) -> usize {
        match self {
            MessageType::JoinRequest | MessageType::Ping => HEARTBEAT_MESSAGE_LEN,
            MessageType::JoinReply => HEADER_LEN,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(MessageType::JoinRequest),
            1 => Ok(MessageType::JoinReply),
            2 => Ok(MessageType::Ping),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::JoinRequest => write!(f, "JOIN_REQUEST"),
            MessageType::JoinReply => write!(f, "JOIN_REPLY"),
            MessageType::Ping => write!(f, "PING"),
        }
    }
}

/// Messages exchanged by group members
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipMessage {
    /// Sent once by a joining node to the introducer
    JoinRequest { sender: NodeId, heartbeat: u64 },

    /// The responder's full table, sent back to a joining node
    JoinReply {
        sender: NodeId,
        entries: Vec<MembershipEntry>,
    },

    /// Sent every gossip round to every known peer; carries no table
    Ping { sender: NodeId, heartbeat: u64 },
}

impl MembershipMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            MembershipMessage::JoinRequest { .. } => MessageType::JoinRequest,
            MembershipMessage::JoinReply { .. } => MessageType::JoinReply,
            MembershipMessage::Ping { .. } => MessageType::Ping,
        }
    }

    pub fn sender(&self) -> NodeId {
        match self {
            MembershipMessage::JoinRequest { sender, .. }
            | MembershipMessage::JoinReply { sender, .. }
            | MembershipMessage::Ping { sender, .. } => *sender,
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            MembershipMessage::JoinReply { entries, .. } => HEADER_LEN + entries.len() * ENTRY_LEN,
            _ => HEARTBEAT_MESSAGE_LEN,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.put_u8(self.message_type() as u8);
        self.sender().put(&mut buf);

        match self {
            MembershipMessage::JoinRequest { heartbeat, .. }
            | MembershipMessage::Ping { heartbeat, .. } => {
                buf.put_u8(0); // reserved
                buf.put_u64_le(*heartbeat);
            }
            MembershipMessage::JoinReply { entries, .. } => {
                for entry in entries {
                    entry.node_id.put(&mut buf);
                    buf.put_u64_le(entry.heartbeat);
                    buf.put_u64_le(entry.last_updated);
                }
            }
        }

        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let Some(&tag) = data.first() else {
            return Err(ProtocolError::TruncatedMessage { len: 0, min: 1 });
        };
        let message_type = MessageType::try_from(tag)?;
        let min = message_type.min_len();
        if data.len() < min {
            return Err(ProtocolError::TruncatedMessage {
                len: data.len(),
                min,
            });
        }

        let mut buf = &data[1..];
        let sender = NodeId::read(&mut buf)?;

        let message = match message_type {
            MessageType::JoinRequest => {
                buf.advance(1);
                MembershipMessage::JoinRequest {
                    sender,
                    heartbeat: buf.get_u64_le(),
                }
            }
            MessageType::Ping => {
                buf.advance(1);
                MembershipMessage::Ping {
                    sender,
                    heartbeat: buf.get_u64_le(),
                }
            }
            MessageType::JoinReply => {
                let count = buf.remaining() / ENTRY_LEN;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let node_id = NodeId::read(&mut buf)?;
                    let heartbeat = buf.get_u64_le();
                    let last_updated = buf.get_u64_le();
                    entries.push(MembershipEntry {
                        node_id,
                        heartbeat,
                        last_updated,
                    });
                }
                MembershipMessage::JoinReply { sender, entries }
            }
        };

        Ok(message)
    }
}
