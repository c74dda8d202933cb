//! Notification fan-out (§4.7 "Notifications"): on a block/epoch/mempool
//! event the manager walks registered clients, filters by subscription
//! type, rewrites the per-subscription request id, and sends.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::frame::ServerFrame;
use crate::opcode::{Opcode, SubscriptionType};

/// One registered client: its outbound channel and the request id its
/// `SUBSCRIBE_*` response was keyed to (echoed back on every notification).
struct Subscriber {
    sender: mpsc::UnboundedSender<Bytes>,
    request_id: u32,
}

#[derive(Default)]
pub struct NotificationManager {
    blocks: Mutex<HashMap<[u8; 16], Subscriber>>,
    epochs: Mutex<HashMap<[u8; 16], Subscriber>>,
    mempool: Mutex<HashMap<[u8; 16], Subscriber>>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: SubscriptionType) -> &Mutex<HashMap<[u8; 16], Subscriber>> {
        match kind {
            SubscriptionType::Blocks => &self.blocks,
            SubscriptionType::Epochs => &self.epochs,
            SubscriptionType::Mempool => &self.mempool,
        }
    }

    pub fn register(
        &self,
        kind: SubscriptionType,
        client_id: [u8; 16],
        request_id: u32,
        sender: mpsc::UnboundedSender<Bytes>,
    ) {
        self.table(kind)
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .insert(client_id, Subscriber { sender, request_id });
    }

    pub fn unregister(&self, kind: SubscriptionType, client_id: [u8; 16]) {
        self.table(kind)
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .remove(&client_id);
    }

    pub fn unregister_all(&self, client_id: [u8; 16]) {
        for kind in [
            SubscriptionType::Blocks,
            SubscriptionType::Epochs,
            SubscriptionType::Mempool,
        ] {
            self.unregister(kind, client_id);
        }
    }

    /// Serializes `payload` once, then sends it to every subscriber of
    /// `kind` with their own request id spliced in.
    pub fn notify(&self, kind: SubscriptionType, opcode: Opcode, payload: Bytes) {
        let subscribers = self
            .table(kind)
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());

        for subscriber in subscribers.values() {
            let frame = ServerFrame {
                opcode,
                request_id: subscriber.request_id,
                payload: payload.clone(),
            };
            let _ = subscriber.sender.send(frame.encode());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifies_only_subscribers_of_the_matching_type() {
        let manager = NotificationManager::new();
        let (blocks_tx, mut blocks_rx) = mpsc::unbounded_channel();
        let (epochs_tx, mut epochs_rx) = mpsc::unbounded_channel();
        manager.register(SubscriptionType::Blocks, [1u8; 16], 5, blocks_tx);
        manager.register(SubscriptionType::Epochs, [2u8; 16], 9, epochs_tx);

        manager.notify(SubscriptionType::Blocks, Opcode::GetBlockNumber, Bytes::from_static(b"x"));

        assert!(blocks_rx.try_recv().is_ok());
        assert!(epochs_rx.try_recv().is_err());
    }

    #[test]
    fn unregister_stops_future_notifications() {
        let manager = NotificationManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.register(SubscriptionType::Blocks, [3u8; 16], 1, tx);
        manager.unregister(SubscriptionType::Blocks, [3u8; 16]);

        manager.notify(SubscriptionType::Blocks, Opcode::GetBlockNumber, Bytes::new());
        assert!(rx.try_recv().is_err());
    }
}
