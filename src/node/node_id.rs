use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Encoded width of a node identity: 4-byte host followed by 2-byte port
pub const NODE_ID_LEN: usize = 6;

/// Unique identifier for group members: the endpoint a node listens on.
///
/// Serializes as its `a.b.c.d:port` display form.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, PartialOrd, Ord, Eq, Hash,
)]
#[serde(into = "String", try_from = "String")]
pub struct NodeId {
    host: u32,
    port: u16,
}

impl NodeId {
    /// All-zero sentinel marking an uninitialized identity
    pub const NULL: NodeId = NodeId { host: 0, port: 0 };

    /// Well-known bootstrap endpoint new nodes send their join request to
    pub const INTRODUCER: NodeId = NodeId { host: 1, port: 0 };

    pub const fn new(host: u32, port: u16) -> Self {
        Self { host, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Fixed-width little-endian encoding, used on the wire
    pub fn encode(&self) -> [u8; NODE_ID_LEN] {
        let mut out = [0u8; NODE_ID_LEN];
        let mut buf = &mut out[..];
        self.put(&mut buf);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = bytes;
        Self::read(&mut buf)
    }

    pub(crate) fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.host);
        buf.put_u16_le(self.port);
    }

    pub(crate) fn read<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        if buf.remaining() < NODE_ID_LEN {
            return Err(ProtocolError::MalformedIdentity {
                len: buf.remaining(),
            });
        }
        let host = buf.get_u32_le();
        let port = buf.get_u16_le();
        Ok(Self { host, port })
    }

    /// The UDP endpoint this identity names
    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::from(self.host.to_le_bytes()), self.port)
    }
}

impl From<SocketAddrV4> for NodeId {
    fn from(addr: SocketAddrV4) -> Self {
        Self {
            host: u32::from_le_bytes(addr.ip().octets()),
            port: addr.port(),
        }
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<SocketAddrV4>()
            .map(NodeId::from)
            .map_err(|e| format!("Invalid node address '{}': {}", s, e))
    }
}

impl TryFrom<String> for NodeId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d] = self.host.to_le_bytes();
        write!(f, "{}.{}.{}.{}:{}", a, b, c, d, self.port)
    }
}
