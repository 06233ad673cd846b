//! Snapshot wire format.
//!
//! One snapshot per frame:
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ HEADER (10 bytes)                          │
//! │   magic: [u8; 4]      = b"EMON"            │
//! │   version: u16 (LE)   = 1                  │
//! │   payload_len: u32 (LE)                    │
//! ├────────────────────────────────────────────┤
//! │ PAYLOAD (payload_len bytes)                │
//! │   zstd(bincode(NodeMonitoringData))        │
//! └────────────────────────────────────────────┘
//! ```

use std::io::{self, Read};

use crate::model::NodeMonitoringData;
use crate::monitor::SendError;

const MAGIC: [u8; 4] = *b"EMON";
const VERSION: u16 = 1;
const HEADER_SIZE: usize = 10;

/// zstd level balancing frame size against the agent's CPU share.
const COMPRESSION_LEVEL: i32 = 3;

/// Maximum accepted payload, a sanity bound against corrupt headers.
const MAX_PAYLOAD: u32 = 16 * 1024 * 1024;

/// Encodes one snapshot into a complete frame.
pub fn encode(data: &NodeMonitoringData) -> Result<Vec<u8>, SendError> {
    let payload = bincode::serialize(data).map_err(|e| SendError::Encode(e.to_string()))?;
    let compressed = zstd::encode_all(&payload[..], COMPRESSION_LEVEL)?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + compressed.len());
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&VERSION.to_le_bytes());
    frame.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    frame.extend_from_slice(&compressed);

    Ok(frame)
}

/// Decodes one frame from a reader. Collector-side counterpart of
/// [`encode`].
pub fn decode(reader: &mut impl Read) -> io::Result<NodeMonitoringData> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    if header[0..4] != MAGIC {
        return Err(io::Error::other(format!(
            "invalid magic: expected EMON, got {:?}",
            &header[0..4]
        )));
    }

    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != VERSION {
        return Err(io::Error::other(format!(
            "unsupported version: {}",
            version
        )));
    }

    let payload_len = u32::from_le_bytes(header[6..10].try_into().unwrap());
    if payload_len > MAX_PAYLOAD {
        return Err(io::Error::other(format!(
            "payload length {} exceeds bound",
            payload_len
        )));
    }

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload)?;

    let decompressed = zstd::decode_all(&payload[..])?;
    bincode::deserialize(&decompressed).map_err(io::Error::other)
}
