//! Protobuf payload bodies (§4.7). Hand-derived `prost::Message` impls
//! rather than a `.proto`-driven build step, the same way `opnet-chain`
//! hand-writes its binary layouts instead of reaching for a schema
//! compiler — there's no shared schema registry to keep in sync with here.

use prost::Message;

/// `HANDSHAKE` request payload: `(protocol_version, client_name, client_version)`.
#[derive(Clone, PartialEq, Message)]
pub struct HandshakeRequest {
    #[prost(uint32, tag = "1")]
    pub protocol_version: u32,
    #[prost(string, tag = "2")]
    pub client_name: String,
    #[prost(string, tag = "3")]
    pub client_version: String,
}

/// `HANDSHAKE` response payload: `(protocol_version, session_id, server_version, current_block_height, chain_id)`.
#[derive(Clone, PartialEq, Message)]
pub struct HandshakeResponse {
    #[prost(uint32, tag = "1")]
    pub protocol_version: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub session_id: Vec<u8>,
    #[prost(string, tag = "3")]
    pub server_version: String,
    #[prost(uint64, tag = "4")]
    pub current_block_height: u64,
    #[prost(uint32, tag = "5")]
    pub chain_id: u32,
}

/// A short reason string plus a typed code, the shape every user-visible
/// failure takes (§7 "no stack traces leaked unless `dev_mode`").
#[derive(Clone, PartialEq, Message)]
pub struct ErrorPayload {
    #[prost(string, tag = "1")]
    pub code: String,
    #[prost(string, tag = "2")]
    pub reason: String,
}

/// `GET_BLOCK_NUMBER` response.
#[derive(Clone, PartialEq, Message)]
pub struct BlockNumberResponse {
    #[prost(uint64, tag = "1")]
    pub height: u64,
}

/// `SUBSCRIBE_BLOCKS` / `SUBSCRIBE_EPOCHS` request: empty body, the
/// subscription type is implied by the opcode.
#[derive(Clone, PartialEq, Message)]
pub struct SubscribeRequest {}

/// `UNSUBSCRIBE` request: which subscription (by opcode-implied type) to drop.
#[derive(Clone, PartialEq, Message)]
pub struct UnsubscribeRequest {
    #[prost(uint32, tag = "1")]
    pub subscription_type: u32,
}

/// A block/epoch notification body (§4.7 "Notifications"): serialized once
/// per event and replayed per subscriber with a rewritten request id.
#[derive(Clone, PartialEq, Message)]
pub struct BlockNotification {
    #[prost(uint64, tag = "1")]
    pub height: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub hash: Vec<u8>,
}

pub fn decode<M: Message + Default>(bytes: &[u8]) -> Result<M, prost::DecodeError> {
    M::decode(bytes)
}

pub fn encode<M: Message>(message: &M) -> Vec<u8> {
    message.encode_to_vec()
}
