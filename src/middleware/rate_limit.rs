//! Fixed-window admission control per client key.
//!
//! Algorithm (per request, at `now`):
//! 1. `key = key_generator(request)`
//! 2. if the store holds more than [`SWEEP_THRESHOLD`] keys, drop every expired window
//! 3. open a fresh window when the key has none or its window expired (`reset_at < now`)
//! 4. `count >= max_requests` -> 429 with quota headers and `Retry-After`
//! 5. otherwise `count += 1`, quota headers, continue
//! 6. with `skip_successful_requests`, a 2xx response refunds its slot, but only while
//!    the window it was admitted in is still the key's current window
//!
//! Fixed (not sliding) windows: a burst straddling a boundary can see close to
//! `2 * max_requests` admitted. There is no background cleanup task; the sweep cost is
//! paid by whichever request crosses the threshold.
//!
//! The store is owned by [`RateLimiter`] and nothing else touches it. The mutex is only
//! held for the synchronous decision, never across `.await`.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use crate::error::AppError;

/// Quota header names.
pub mod headers {
    use axum::http::HeaderName;

    /// Requests allowed per window.
    pub const LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    /// Requests left in the current window.
    pub const REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
    /// RFC 3339 instant at which the current window ends.
    pub const RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
}

/// Store size above which expired windows are swept on the next admission.
pub const SWEEP_THRESHOLD: usize = 1000;

/// Key used when neither a forwarded address nor a peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

pub type KeyGenerator = Arc<dyn Fn(&Request) -> String + Send + Sync>;

#[derive(Clone)]
pub struct RateLimitConfig {
    pub window: Duration,
    /// Zero means every request is rejected.
    pub max_requests: u64,
    pub key_generator: KeyGenerator,
    pub skip_successful_requests: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 100,
            key_generator: Arc::new(client_key),
            skip_successful_requests: false,
        }
    }
}

impl fmt::Debug for RateLimitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitConfig")
            .field("window", &self.window)
            .field("max_requests", &self.max_requests)
            .field("key_generator", &"<fn>")
            .field("skip_successful_requests", &self.skip_successful_requests)
            .finish()
    }
}

/// First `x-forwarded-for` hop, else the peer address, else [`UNKNOWN_CLIENT`].
///
/// Clients behind one proxy share a key; that approximation is accepted.
pub fn client_key(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(addr) = forwarded {
        return addr.to_owned();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_owned())
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u64,
    window_start: DateTime<Utc>,
    reset_at: DateTime<Utc>,
}

impl WindowEntry {
    fn open(now: DateTime<Utc>, window: TimeDelta) -> Self {
        Self {
            count: 0,
            window_start: now,
            reset_at: now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.reset_at < now
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quota {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

impl Quota {
    fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(headers::LIMIT, HeaderValue::from(self.limit));
        headers.insert(headers::REMAINING, HeaderValue::from(self.remaining));
        let reset = self.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Ok(value) = HeaderValue::from_str(&reset) {
            headers.insert(headers::RESET, value);
        }
    }
}

/// Identifies the window a request was admitted in, for the success refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionTicket {
    key: String,
    window_start: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted {
        quota: Quota,
        ticket: AdmissionTicket,
    },
    Rejected {
        quota: Quota,
        retry_after_secs: u64,
    },
}

#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    window: TimeDelta,
    store: Arc<Mutex<HashMap<String, WindowEntry>>>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let window = TimeDelta::from_std(config.window).unwrap_or(TimeDelta::MAX);
        Self {
            config: Arc::new(config),
            window,
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn key_for(&self, req: &Request) -> String {
        (self.config.key_generator)(req)
    }

    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    pub fn admit(&self, key: &str) -> Admission {
        self.admit_at(key, Utc::now())
    }

    pub fn admit_at(&self, key: &str, now: DateTime<Utc>) -> Admission {
        let limit = self.config.max_requests;
        let mut store = self.lock();

        if store.len() > SWEEP_THRESHOLD {
            let before = store.len();
            store.retain(|_, entry| !entry.is_expired(now));
            tracing::debug!(removed = before - store.len(), "swept expired rate limit windows");
        }

        let window = self.window;
        let entry = store
            .entry(key.to_owned())
            .and_modify(|entry| {
                if entry.is_expired(now) {
                    *entry = WindowEntry::open(now, window);
                }
            })
            .or_insert_with(|| WindowEntry::open(now, window));

        if entry.count >= limit {
            let remaining_ms = (entry.reset_at - now).num_milliseconds().max(0) as u64;
            return Admission::Rejected {
                quota: Quota {
                    limit,
                    remaining: 0,
                    reset_at: entry.reset_at,
                },
                retry_after_secs: remaining_ms.div_ceil(1000).max(1),
            };
        }

        entry.count += 1;
        Admission::Admitted {
            quota: Quota {
                limit,
                remaining: limit.saturating_sub(entry.count),
                reset_at: entry.reset_at,
            },
            ticket: AdmissionTicket {
                key: key.to_owned(),
                window_start: entry.window_start,
            },
        }
    }

    /// Gives the ticket's slot back. No-op (returns `false`) once the key's window has
    /// rolled over or been swept, so a refund never leaks into a newer window.
    pub fn refund(&self, ticket: &AdmissionTicket) -> bool {
        let mut store = self.lock();
        match store.get_mut(&ticket.key) {
            Some(entry) if entry.window_start == ticket.window_start => {
                entry.count = entry.count.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, WindowEntry>> {
        // Entries stay consistent even if a holder panicked: each update is a single assignment.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub async fn enforce(State(limiter): State<RateLimiter>, req: Request, next: Next) -> Response {
    let key = limiter.key_for(&req);

    match limiter.admit(&key) {
        Admission::Rejected {
            quota,
            retry_after_secs,
        } => {
            tracing::warn!(client = %key, retry_after_secs, "rate limit exceeded");
            let mut res = AppError::too_many_requests().into_response();
            quota.write_headers(res.headers_mut());
            res.headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
            res
        }
        Admission::Admitted { quota, ticket } => {
            let mut res = next.run(req).await;
            quota.write_headers(res.headers_mut());

            if limiter.config.skip_successful_requests && res.status().is_success() {
                let refunded = limiter.refund(&ticket);
                tracing::debug!(client = %key, refunded, "successful request not counted");
            }
            res
        }
    }
}
