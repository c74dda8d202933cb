//! Per-connection state (§4.7): in-flight request count, a token-bucket
//! rate limiter, and the client's active subscriptions. One instance lives
//! for the lifetime of a single WebSocket connection.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::opcode::SubscriptionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    TooManyPendingRequests,
    TooManySubscriptions,
    DuplicateSubscription,
}

/// Fixed-window token bucket: `max_requests_per_second` tokens refill once
/// per second. Simpler than a sliding window and matches the spec's
/// wording ("rate_limit (max_requests_per_second)") exactly.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_second: u32,
    remaining: u32,
    window_started: Instant,
}

impl RateLimiter {
    pub fn new(max_per_second: u32) -> Self {
        Self {
            max_per_second,
            remaining: max_per_second,
            window_started: Instant::now(),
        }
    }

    /// Returns `true` if a request may proceed, consuming one token.
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&mut self, now: Instant) -> bool {
        if now.duration_since(self.window_started) >= Duration::from_secs(1) {
            self.remaining = self.max_per_second;
            self.window_started = now;
        }
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Per-connection state the server keeps across the handshake-to-close
/// lifetime of a WebSocket (§4.7 "Per-connection state").
#[derive(Debug)]
pub struct ConnectionState {
    pub client_id: [u8; 16],
    pending_requests: u32,
    max_pending_requests: u32,
    rate_limiter: RateLimiter,
    subscriptions: HashSet<SubscriptionType>,
    max_subscriptions: usize,
    handshake_completed: bool,
}

impl ConnectionState {
    pub fn new(
        client_id: [u8; 16],
        max_pending_requests: u32,
        max_requests_per_second: u32,
        max_subscriptions: usize,
    ) -> Self {
        Self {
            client_id,
            pending_requests: 0,
            max_pending_requests,
            rate_limiter: RateLimiter::new(max_requests_per_second),
            subscriptions: HashSet::new(),
            max_subscriptions,
            handshake_completed: false,
        }
    }

    pub fn handshake_completed(&self) -> bool {
        self.handshake_completed
    }

    pub fn complete_handshake(&mut self) {
        self.handshake_completed = true;
    }

    /// Admits one in-flight request, or rejects with `TooManyPendingRequests`
    /// (§4.7 "Back-pressure": caller responds `TOO_MANY_PENDING_REQUESTS`
    /// and drops the request, it does not close the connection).
    pub fn begin_request(&mut self) -> Result<(), ConnectionError> {
        if self.pending_requests >= self.max_pending_requests {
            return Err(ConnectionError::TooManyPendingRequests);
        }
        if !self.rate_limiter.try_acquire() {
            return Err(ConnectionError::TooManyPendingRequests);
        }
        self.pending_requests += 1;
        Ok(())
    }

    pub fn end_request(&mut self) {
        self.pending_requests = self.pending_requests.saturating_sub(1);
    }

    pub fn subscribe(&mut self, kind: SubscriptionType) -> Result<(), ConnectionError> {
        if self.subscriptions.contains(&kind) {
            return Err(ConnectionError::DuplicateSubscription);
        }
        if self.subscriptions.len() >= self.max_subscriptions {
            return Err(ConnectionError::TooManySubscriptions);
        }
        self.subscriptions.insert(kind);
        Ok(())
    }

    pub fn unsubscribe(&mut self, kind: SubscriptionType) {
        self.subscriptions.remove(&kind);
    }

    pub fn is_subscribed(&self, kind: SubscriptionType) -> bool {
        self.subscriptions.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_requests_past_pending_cap() {
        let mut conn = ConnectionState::new([0u8; 16], 1, 100, 16);
        conn.begin_request().unwrap();
        assert_eq!(
            conn.begin_request(),
            Err(ConnectionError::TooManyPendingRequests)
        );
        conn.end_request();
        assert!(conn.begin_request().is_ok());
    }

    #[test]
    fn rejects_duplicate_subscription_of_same_type() {
        let mut conn = ConnectionState::new([0u8; 16], 10, 100, 16);
        conn.subscribe(SubscriptionType::Blocks).unwrap();
        assert_eq!(
            conn.subscribe(SubscriptionType::Blocks),
            Err(ConnectionError::DuplicateSubscription)
        );
    }

    #[test]
    fn rejects_subscriptions_past_cap() {
        let mut conn = ConnectionState::new([0u8; 16], 10, 100, 1);
        conn.subscribe(SubscriptionType::Blocks).unwrap();
        assert_eq!(
            conn.subscribe(SubscriptionType::Epochs),
            Err(ConnectionError::TooManySubscriptions)
        );
    }

    #[test]
    fn rate_limiter_blocks_after_budget_exhausted() {
        let mut limiter = RateLimiter::new(2);
        let now = Instant::now();
        assert!(limiter.try_acquire_at(now));
        assert!(limiter.try_acquire_at(now));
        assert!(!limiter.try_acquire_at(now));
    }
}
