//! Wire framing (§4.7, §6): `[opcode: u8][payload…]` for everything a
//! client sends, `[opcode: u8][request_id: u32 LE][protobuf payload…]` for
//! everything the server sends back. `PING`/`HANDSHAKE` are the only
//! client opcodes whose payload isn't itself prefixed with a request id —
//! every other client payload starts with one, which the server echoes
//! back verbatim in its response frame.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::opcode::Opcode;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),
    #[error("frame too short for a request id")]
    MissingRequestId,
}

/// A decoded client message: its opcode, the request id it carries (absent
/// only for `PING`/`HANDSHAKE`), and whatever payload bytes follow.
#[derive(Debug, Clone)]
pub struct ClientFrame {
    pub opcode: Opcode,
    pub request_id: Option<u32>,
    pub payload: Bytes,
}

impl ClientFrame {
    pub fn decode(mut bytes: Bytes) -> Result<Self, FrameError> {
        if bytes.is_empty() {
            return Err(FrameError::Empty);
        }
        let opcode_byte = bytes[0];
        bytes.advance(1);
        let opcode = Opcode::try_from(opcode_byte).map_err(FrameError::UnknownOpcode)?;

        if matches!(opcode, Opcode::Ping | Opcode::Handshake) {
            return Ok(Self {
                opcode,
                request_id: None,
                payload: bytes,
            });
        }

        if bytes.len() < 4 {
            return Err(FrameError::MissingRequestId);
        }
        let request_id = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        bytes.advance(4);
        Ok(Self {
            opcode,
            request_id: Some(request_id),
            payload: bytes,
        })
    }
}

/// A server response frame. `request_id` is `0` for unsolicited
/// notifications, which carry no client-originated request to echo.
#[derive(Debug, Clone)]
pub struct ServerFrame {
    pub opcode: Opcode,
    pub request_id: u32,
    pub payload: Bytes,
}

impl ServerFrame {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(5 + self.payload.len());
        buf.put_u8(self.opcode.as_u8());
        buf.put_u32_le(self.request_id);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ping_without_request_id() {
        let frame = ClientFrame::decode(Bytes::from_static(&[0u8])).unwrap();
        assert_eq!(frame.opcode, Opcode::Ping);
        assert!(frame.request_id.is_none());
    }

    #[test]
    fn decodes_request_with_id_and_echoes_it() {
        let mut raw = vec![Opcode::GetBlockNumber.as_u8()];
        raw.extend_from_slice(&7u32.to_le_bytes());
        let frame = ClientFrame::decode(Bytes::from(raw)).unwrap();
        assert_eq!(frame.request_id, Some(7));

        let response = ServerFrame {
            opcode: frame.opcode,
            request_id: frame.request_id.unwrap(),
            payload: Bytes::new(),
        };
        let encoded = response.encode();
        assert_eq!(encoded[0], Opcode::GetBlockNumber.as_u8());
        assert_eq!(u32::from_le_bytes([encoded[1], encoded[2], encoded[3], encoded[4]]), 7);
    }

    #[test]
    fn rejects_empty_frame() {
        assert!(matches!(
            ClientFrame::decode(Bytes::new()),
            Err(FrameError::Empty)
        ));
    }

    #[test]
    fn rejects_unknown_opcode_byte() {
        assert!(matches!(
            ClientFrame::decode(Bytes::from_static(&[250u8])),
            Err(FrameError::UnknownOpcode(250))
        ));
    }
}
