//! Request handler seam. The protocol plumbing in this crate (framing,
//! handshake, back-pressure, subscriptions) is the only part in scope here
//! (§1 "Out of scope: the JSON-RPC / WebSocket API surface" — meaning the
//! handler bodies, not the envelope around them); the actual per-opcode
//! business logic is injected, the same way `opnet-chain::vm::VmFacade`
//! treats contract execution as a black box.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::opcode::Opcode;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Dispatches a decoded, rate-limit-cleared, non-handshake request to
/// whatever owns the indexer/mempool/VM state. `client_id` lets a handler
/// correlate a request with per-connection context if it needs to.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(
        &self,
        opcode: Opcode,
        client_id: [u8; 16],
        payload: Bytes,
    ) -> Result<Bytes, HandlerError>;
}

#[cfg(test)]
pub mod stub {
    use super::*;

    /// Echoes the payload back; good enough to exercise framing/back-pressure
    /// tests without a real indexer behind it.
    pub struct EchoHandler;

    #[async_trait]
    impl RequestHandler for EchoHandler {
        async fn handle(
            &self,
            _opcode: Opcode,
            _client_id: [u8; 16],
            payload: Bytes,
        ) -> Result<Bytes, HandlerError> {
            Ok(payload)
        }
    }
}
