//! Bridge message encoding.
//!
//! A message is committed to the tree by its id, the Keccak-256 hash of its encoding:
//!
//! ```text
//! version (1) ‖ nonce (4, BE) ‖ origin domain (4, BE) ‖ sender (32)
//!     ‖ destination domain (4, BE) ‖ recipient (32) ‖ body
//! ```

use serde::{Deserialize, Serialize};
use strand_hash::{Hash256, HashExt};
use thiserror::Error;

/// Current message format version
pub const MESSAGE_VERSION: u8 = 3;

/// Length of the fixed-size part of an encoded message
pub const MESSAGE_HEADER_LENGTH: usize = 77;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("Message too short: expected at least {MESSAGE_HEADER_LENGTH} bytes, got {length}")]
    TooShort { length: usize },
}

/// Cross-chain message dispatched through the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeMessage {
    pub version: u8,
    pub nonce: u32,
    pub origin_domain: u32,
    pub sender: Hash256,
    pub destination_domain: u32,
    pub recipient: Hash256,
    #[serde(with = "hex::serde")]
    pub body: Vec<u8>,
}

impl BridgeMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MESSAGE_HEADER_LENGTH + self.body.len());
        buf.push(self.version);
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf.extend_from_slice(&self.origin_domain.to_be_bytes());
        buf.extend_from_slice(self.sender.as_bytes());
        buf.extend_from_slice(&self.destination_domain.to_be_bytes());
        buf.extend_from_slice(self.recipient.as_bytes());
        buf.extend_from_slice(&self.body);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, MessageError> {
        if buf.len() < MESSAGE_HEADER_LENGTH {
            return Err(MessageError::TooShort { length: buf.len() });
        }

        Ok(Self {
            version: buf[0],
            nonce: u32::from_be_bytes(read_array(buf, 1)),
            origin_domain: u32::from_be_bytes(read_array(buf, 5)),
            sender: Hash256::from_inner(read_array(buf, 9)),
            destination_domain: u32::from_be_bytes(read_array(buf, 41)),
            recipient: Hash256::from_inner(read_array(buf, 45)),
            body: buf[MESSAGE_HEADER_LENGTH..].to_vec(),
        })
    }

    /// Message id, used as the tree leaf
    pub fn id(&self) -> Hash256 {
        self.encode().keccak256()
    }
}

/// Copy `N` bytes starting at `offset`; the caller has checked the length
fn read_array<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}
