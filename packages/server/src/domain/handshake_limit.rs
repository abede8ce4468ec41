//! Per-address limit on connection attempts.
//!
//! A fixed window per peer IP: at most `max_per_window` handshakes are let
//! through until the window that started with the first one has elapsed.

use std::{collections::HashMap, net::IpAddr, sync::Mutex};

use super::value_object::Timestamp;

pub const HANDSHAKE_WINDOW_MILLIS: i64 = 15 * 60 * 1000;
pub const MAX_HANDSHAKES_PER_WINDOW: u32 = 100;

/// Entries kept before expired windows are swept.
const SWEEP_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Timestamp,
    count: u32,
}

#[derive(Debug)]
pub struct HandshakeLimiter {
    window_millis: i64,
    max_per_window: u32,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl Default for HandshakeLimiter {
    fn default() -> Self {
        Self::new(HANDSHAKE_WINDOW_MILLIS, MAX_HANDSHAKES_PER_WINDOW)
    }
}

impl HandshakeLimiter {
    pub fn new(window_millis: i64, max_per_window: u32) -> Self {
        Self {
            window_millis,
            max_per_window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one attempt from `peer`. Returns `false` once the peer is over its budget.
    pub fn try_acquire(&self, peer: IpAddr, now: Timestamp) -> bool {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if windows.len() >= SWEEP_THRESHOLD {
            let window_millis = self.window_millis;
            windows.retain(|_, w| now.millis_since(w.started_at) < window_millis);
        }

        let window = windows.entry(peer).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now.millis_since(window.started_at) >= self.window_millis {
            *window = Window {
                started_at: now,
                count: 0,
            };
        }
        if window.count >= self.max_per_window {
            return false;
        }
        window.count += 1;
        true
    }
}
