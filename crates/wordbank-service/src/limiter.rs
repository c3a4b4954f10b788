//! Per-client request rate limiting.
//!
//! Requests are keyed by client IP, user agent and matched route. The client IP is the
//! socket peer unless the limiter is told to trust `x-forwarded-for` from a fronting proxy.
//! The limiter is owned by
//! [`AppState`](crate::state::AppState); its idle keys are pruned by a janitor task the
//! binary spawns next to the server.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::task::JoinHandle;

use crate::error::ApiError;
use crate::state::AppState;

/// How often idle limiter keys are pruned.
pub const JANITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Identifies one client on one route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    /// Client address, from the socket or a trusted `x-forwarded-for`.
    pub ip: String,
    /// The `user-agent` header, empty if absent.
    pub user_agent: String,
    /// The matched route template, or the raw path.
    pub route: String,
}

impl RequestKey {
    /// Derive the key for `request`.
    ///
    /// The first `x-forwarded-for` entry is used only when `trust_forwarded_for` is set;
    /// otherwise a client could pick a fresh address per request.
    #[must_use]
    pub fn from_request(request: &Request, trust_forwarded_for: bool) -> Self {
        let headers = request.headers();

        let forwarded = trust_forwarded_for
            .then(|| headers.get("x-forwarded-for"))
            .flatten()
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string);
        let peer = || {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };
        let ip = forwarded
            .or_else(peer)
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let route = request.extensions().get::<MatchedPath>().map_or_else(
            || request.uri().path().to_string(),
            |path| path.as_str().to_string(),
        );

        Self {
            ip,
            user_agent,
            route,
        }
    }
}

/// Keyed token-bucket limiter.
pub struct RequestLimiter {
    limiter: DefaultKeyedRateLimiter<RequestKey>,
    trust_forwarded_for: bool,
}

impl RequestLimiter {
    /// A limiter allowing `limit` requests per minute per key. `0` yields `None`.
    #[must_use]
    pub fn per_minute(limit: u32) -> Option<Self> {
        let limit = NonZeroU32::new(limit)?;
        Some(Self {
            limiter: RateLimiter::keyed(Quota::per_minute(limit)),
            trust_forwarded_for: false,
        })
    }

    /// Key clients by the first `x-forwarded-for` entry when present. Only enable behind a
    /// proxy that overwrites the header.
    #[must_use]
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// The key `request` is counted under.
    #[must_use]
    pub fn key_for(&self, request: &Request) -> RequestKey {
        RequestKey::from_request(request, self.trust_forwarded_for)
    }

    /// Admit one request for `key`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::RateLimited` when the key is over its quota.
    pub fn check(&self, key: &RequestKey) -> Result<(), ApiError> {
        self.limiter
            .check_key(key)
            .map_err(|_| ApiError::RateLimited)
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }

    /// Forget keys whose buckets have refilled.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Spawn a task that prunes idle keys every `every`. It exits once the limiter is dropped.
    pub fn spawn_janitor(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                limiter.retain_recent();
                tracing::debug!(keys = limiter.tracked_keys(), "Pruned request limiter");
            }
        })
    }
}

/// Middleware rejecting requests over the per-client rate.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(limiter) = &state.limiter {
        let key = limiter.key_for(&request);
        if let Err(err) = limiter.check(&key) {
            tracing::warn!(ip = %key.ip, route = %key.route, "Request rate limit exceeded");
            return Err(err);
        }
    }
    Ok(next.run(request).await)
}
