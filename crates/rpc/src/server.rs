//! Axum-based WebSocket server (§4.7): one task per connection, driving
//! the handshake lifecycle, opcode dispatch, and the subscribe/unsubscribe
//! side effects on [`NotificationManager`]. Structured the way
//! `ethrex`'s RPC `server.rs` lays out its HTTP router and graceful
//! shutdown, adapted from request/response to a long-lived socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::connection::{ConnectionError, ConnectionState};
use crate::frame::{ClientFrame, ServerFrame};
use crate::handler::{HandlerError, RequestHandler};
use crate::messages::{self, HandshakeRequest, HandshakeResponse};
use crate::notification::NotificationManager;
use crate::opcode::{CloseCode, Opcode, SubscriptionType};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub protocol_version: u32,
    pub server_version: String,
    pub chain_id: u32,
    pub max_pending_requests: u32,
    pub max_requests_per_second: u32,
    pub max_subscriptions: usize,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol_version: 1,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            chain_id: 0,
            max_pending_requests: 64,
            max_requests_per_second: 50,
            max_subscriptions: 16,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub handler: Arc<dyn RequestHandler>,
    pub notifications: Arc<NotificationManager>,
    pub current_block_height: Arc<dyn Fn() -> u64 + Send + Sync>,
    next_client_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        handler: Arc<dyn RequestHandler>,
        notifications: Arc<NotificationManager>,
        current_block_height: Arc<dyn Fn() -> u64 + Send + Sync>,
    ) -> Self {
        Self {
            config,
            handler,
            notifications,
            current_block_height,
            next_client_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn next_client_id(&self) -> [u8; 16] {
        let n = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let mut id = [0u8; 16];
        id[..8].copy_from_slice(&n.to_le_bytes());
        id
    }
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let router = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state);
    let listener = TcpListener::bind(addr).await?;
    info!("starting OP_NET WebSocket server at {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let client_id = state.next_client_id();
    let mut conn = ConnectionState::new(
        client_id,
        state.config.max_pending_requests,
        state.config.max_requests_per_second,
        state.config.max_subscriptions,
    );

    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<Bytes>();

    loop {
        tokio::select! {
            outbound = notify_rx.recv() => {
                let Some(bytes) = outbound else { break };
                if socket.send(Message::Binary(bytes)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                let Some(incoming) = incoming else { break };
                match incoming {
                    Ok(Message::Binary(bytes)) => {
                        match dispatch(&state, &mut conn, client_id, Bytes::from(bytes), &notify_tx).await {
                            DispatchOutcome::Reply(frame) => {
                                if socket.send(Message::Binary(frame.encode())).await.is_err() {
                                    break;
                                }
                            }
                            DispatchOutcome::Silent => {}
                            DispatchOutcome::Close(code) => {
                                let _ = socket
                                    .send(Message::Close(Some(axum::extract::ws::CloseFrame {
                                        code: code.as_u16(),
                                        reason: "".into(),
                                    })))
                                    .await;
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        }
    }

    state.notifications.unregister_all(client_id);
}

enum DispatchOutcome {
    Reply(ServerFrame),
    Silent,
    Close(CloseCode),
}

async fn dispatch(
    state: &AppState,
    conn: &mut ConnectionState,
    client_id: [u8; 16],
    raw: Bytes,
    notify_tx: &mpsc::UnboundedSender<Bytes>,
) -> DispatchOutcome {
    let frame = match ClientFrame::decode(raw) {
        Ok(frame) => frame,
        Err(error) => {
            warn!(%error, "malformed frame");
            return DispatchOutcome::Close(CloseCode::ProtocolViolation);
        }
    };

    if !conn.handshake_completed() && frame.opcode != Opcode::Handshake {
        return DispatchOutcome::Close(CloseCode::ProtocolViolation);
    }

    match frame.opcode {
        Opcode::Handshake => handle_handshake(state, conn, &frame.payload),
        Opcode::Ping => DispatchOutcome::Reply(ServerFrame {
            opcode: Opcode::Ping,
            request_id: 0,
            payload: Bytes::new(),
        }),
        Opcode::SubscribeBlocks | Opcode::SubscribeEpochs => {
            handle_subscribe(state, conn, client_id, &frame, notify_tx)
        }
        Opcode::Unsubscribe => handle_unsubscribe(state, conn, client_id, &frame),
        opcode => handle_business_request(state, conn, client_id, opcode, frame.request_id, frame.payload).await,
    }
}

fn handle_handshake(state: &AppState, conn: &mut ConnectionState, payload: &Bytes) -> DispatchOutcome {
    let request: HandshakeRequest = match messages::decode(payload) {
        Ok(request) => request,
        Err(_) => return DispatchOutcome::Close(CloseCode::ProtocolViolation),
    };
    if request.client_name.len() > 64 {
        return DispatchOutcome::Close(CloseCode::ProtocolViolation);
    }

    conn.complete_handshake();
    let response = HandshakeResponse {
        protocol_version: state.config.protocol_version,
        session_id: conn.client_id.to_vec(),
        server_version: state.config.server_version.clone(),
        current_block_height: (state.current_block_height)(),
        chain_id: state.config.chain_id,
    };
    DispatchOutcome::Reply(ServerFrame {
        opcode: Opcode::Handshake,
        request_id: 0,
        payload: Bytes::from(messages::encode(&response)),
    })
}

fn handle_subscribe(
    state: &AppState,
    conn: &mut ConnectionState,
    client_id: [u8; 16],
    frame: &ClientFrame,
    notify_tx: &mpsc::UnboundedSender<Bytes>,
) -> DispatchOutcome {
    let kind = match frame.opcode {
        Opcode::SubscribeBlocks => SubscriptionType::Blocks,
        Opcode::SubscribeEpochs => SubscriptionType::Epochs,
        _ => unreachable!("caller only routes subscribe opcodes here"),
    };
    let Some(request_id) = frame.request_id else {
        return DispatchOutcome::Close(CloseCode::ProtocolViolation);
    };

    match conn.subscribe(kind) {
        Ok(()) => {
            state
                .notifications
                .register(kind, client_id, request_id, notify_tx.clone());
            DispatchOutcome::Reply(ServerFrame {
                opcode: frame.opcode,
                request_id,
                payload: Bytes::new(),
            })
        }
        Err(ConnectionError::TooManySubscriptions) => DispatchOutcome::Close(CloseCode::Capacity),
        Err(_) => DispatchOutcome::Reply(error_frame(frame.opcode, request_id, "duplicate subscription")),
    }
}

fn handle_unsubscribe(
    state: &AppState,
    conn: &mut ConnectionState,
    client_id: [u8; 16],
    frame: &ClientFrame,
) -> DispatchOutcome {
    let Some(request_id) = frame.request_id else {
        return DispatchOutcome::Close(CloseCode::ProtocolViolation);
    };
    let request: crate::messages::UnsubscribeRequest = match messages::decode(&frame.payload) {
        Ok(request) => request,
        Err(_) => return DispatchOutcome::Close(CloseCode::ProtocolViolation),
    };
    let kind = match request.subscription_type {
        0 => SubscriptionType::Blocks,
        1 => SubscriptionType::Epochs,
        2 => SubscriptionType::Mempool,
        _ => return DispatchOutcome::Reply(error_frame(frame.opcode, request_id, "unknown subscription type")),
    };
    conn.unsubscribe(kind);
    state.notifications.unregister(kind, client_id);
    DispatchOutcome::Reply(ServerFrame {
        opcode: frame.opcode,
        request_id,
        payload: Bytes::new(),
    })
}

async fn handle_business_request(
    state: &AppState,
    conn: &mut ConnectionState,
    client_id: [u8; 16],
    opcode: Opcode,
    request_id: Option<u32>,
    payload: Bytes,
) -> DispatchOutcome {
    let Some(request_id) = request_id else {
        return DispatchOutcome::Close(CloseCode::ProtocolViolation);
    };

    if conn.begin_request().is_err() {
        return DispatchOutcome::Reply(error_frame(opcode, request_id, "TOO_MANY_PENDING_REQUESTS"));
    }

    let result = tokio::time::timeout(
        state.config.request_timeout,
        state.handler.handle(opcode, client_id, payload),
    )
    .await;
    conn.end_request();

    match result {
        Ok(Ok(bytes)) => DispatchOutcome::Reply(ServerFrame {
            opcode,
            request_id,
            payload: bytes,
        }),
        Ok(Err(HandlerError::BadRequest(reason))) => {
            DispatchOutcome::Reply(error_frame(opcode, request_id, &reason))
        }
        Ok(Err(HandlerError::Internal(reason))) => {
            warn!(%reason, "handler internal error");
            DispatchOutcome::Close(CloseCode::FatalAppError)
        }
        Err(_) => DispatchOutcome::Reply(error_frame(opcode, request_id, "request timed out")),
    }
}

fn error_frame(opcode: Opcode, request_id: u32, reason: &str) -> ServerFrame {
    let payload = messages::encode(&messages::ErrorPayload {
        code: "ERROR".to_string(),
        reason: reason.to_string(),
    });
    ServerFrame {
        opcode,
        request_id,
        payload: Bytes::from(payload),
    }
}
