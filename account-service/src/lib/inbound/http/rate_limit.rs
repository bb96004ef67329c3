use std::collections::HashMap;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::handlers::ApiError;
use super::router::AppState;
use crate::config::RateLimitConfig;

/// Per-process sliding-window request counter keyed by caller.
///
/// The number of tracked keys is bounded: expired windows are evicted first,
/// then the least recently seen caller.
pub struct SlidingWindowLimiter {
    window: Duration,
    max_requests: usize,
    max_keys: usize,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, max_requests: u32, max_keys: usize) -> Self {
        Self {
            window,
            max_requests: max_requests as usize,
            max_keys: max_keys.max(1),
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request from `key` and report whether it is within the limit.
    ///
    /// Rejected requests are not recorded.
    pub async fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut hits = self.hits.lock().await;

        if !hits.contains_key(key) && hits.len() >= self.max_keys {
            Self::evict_expired(&mut hits, self.window, now);
            if hits.len() >= self.max_keys {
                Self::evict_least_recent(&mut hits);
            }
        }

        let window = hits.entry(key.to_string()).or_default();
        while window
            .front()
            .is_some_and(|first| now.duration_since(*first) >= self.window)
        {
            window.pop_front();
        }

        if window.len() >= self.max_requests {
            return false;
        }

        window.push_back(now);
        true
    }

    /// Drop every key whose window has fully elapsed.
    ///
    /// # Returns
    /// Number of keys removed
    pub async fn cleanup(&self) -> usize {
        let mut hits = self.hits.lock().await;
        let before = hits.len();
        Self::evict_expired(&mut hits, self.window, Instant::now());
        before - hits.len()
    }

    pub async fn tracked_keys(&self) -> usize {
        self.hits.lock().await.len()
    }

    fn evict_expired(
        hits: &mut HashMap<String, VecDeque<Instant>>,
        window: Duration,
        now: Instant,
    ) {
        hits.retain(|_, times| {
            times
                .back()
                .is_some_and(|last| now.duration_since(*last) < window)
        });
    }

    fn evict_least_recent(hits: &mut HashMap<String, VecDeque<Instant>>) {
        let oldest = hits
            .iter()
            .min_by_key(|(_, times)| times.back().copied())
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            hits.remove(&key);
        }
    }
}

/// The two request scopes guarded in front of the API.
pub struct RateLimiters {
    /// Every `/api/` request.
    pub api: SlidingWindowLimiter,
    /// `/api/auth/` requests, keyed separately from `api`.
    pub auth: SlidingWindowLimiter,
    cleanup_interval: Duration,
    trust_forwarded_headers: bool,
}

impl RateLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        let window = Duration::from_secs(config.window_secs);
        Self {
            api: SlidingWindowLimiter::new(
                window,
                config.api_requests_per_window,
                config.max_tracked_keys,
            ),
            auth: SlidingWindowLimiter::new(
                window,
                config.auth_requests_per_window,
                config.max_tracked_keys,
            ),
            cleanup_interval: Duration::from_secs(config.cleanup_interval_secs.max(1)),
            trust_forwarded_headers: config.trust_forwarded_headers,
        }
    }

    /// Periodically evict expired windows from both scopes until `shutdown`
    /// is cancelled.
    pub fn spawn_cleanup(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let limiters = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiters.cleanup_interval);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Rate limiter cleanup task stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed =
                            limiters.api.cleanup().await + limiters.auth.cleanup().await;
                        if removed > 0 {
                            tracing::debug!(
                                removed,
                                "Rate limiter cleanup evicted expired windows"
                            );
                        }
                    }
                }
            }
        })
    }
}

/// Middleware enforcing the API-wide and auth-scoped limits.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path();

    if path.starts_with("/api/") {
        let limiters = &state.rate_limiters;
        let ip = client_ip(&req, limiters.trust_forwarded_headers);

        if !limiters.api.check(&ip).await {
            tracing::warn!(client_ip = %ip, path, scope = "api", "Rate limit exceeded");
            return ApiError::TooManyRequests("Too Many Requests".to_string()).into_response();
        }

        let auth_key = format!("{}-auth", ip);
        if path.starts_with("/api/auth/") && !limiters.auth.check(&auth_key).await {
            tracing::warn!(client_ip = %ip, path, scope = "auth", "Rate limit exceeded");
            return ApiError::TooManyRequests("Too Many Requests".to_string()).into_response();
        }
    }

    next.run(req).await
}

/// Caller address: the socket peer, unless forwarded headers are trusted, in
/// which case the first `x-forwarded-for` hop, then `x-real-ip`, win.
fn client_ip(req: &Request, trust_forwarded_headers: bool) -> String {
    trust_forwarded_headers
        .then(|| forwarded_ip(req.headers()))
        .flatten()
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    header("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(|first| first.trim().to_string())
        .filter(|first| !first.is_empty())
        .or_else(|| header("x-real-ip").map(str::to_string))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[tokio::test]
    async fn test_limit_within_window() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 3, 100);
        let start = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("10.0.0.1", start).await);
        }
        assert!(!limiter.check_at("10.0.0.1", start).await);
        assert!(limiter.check_at("10.0.0.2", start).await);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 2, 100);
        let start = Instant::now();

        assert!(limiter.check_at("k", start).await);
        assert!(limiter.check_at("k", start + Duration::from_secs(30)).await);
        assert!(!limiter.check_at("k", start + Duration::from_secs(59)).await);
        assert!(limiter.check_at("k", start + Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn test_tracked_keys_are_bounded() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60), 5, 2);
        let start = Instant::now();

        assert!(limiter.check_at("a", start).await);
        assert!(limiter.check_at("b", start + Duration::from_secs(1)).await);
        assert!(limiter.check_at("c", start + Duration::from_secs(2)).await);

        assert_eq!(limiter.tracked_keys().await, 2);
        let hits = limiter.hits.lock().await;
        assert!(!hits.contains_key("a"));
        assert!(hits.contains_key("c"));
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired_windows() {
        let limiter = SlidingWindowLimiter::new(Duration::from_millis(10), 5, 100);
        assert!(limiter.check("a").await);

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(limiter.cleanup().await, 1);
        assert_eq!(limiter.tracked_keys().await, 0);
    }

    #[test]
    fn test_forwarded_ip_precedence() {
        let mut headers = HeaderMap::new();
        assert_eq!(forwarded_ip(&headers), None);

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(forwarded_ip(&headers).as_deref(), Some("10.0.0.9"));

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(forwarded_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    fn request_from(peer: &str, forwarded_for: &str) -> Request {
        let mut req = axum::http::Request::builder()
            .uri("/api/auth/login")
            .header("x-forwarded-for", forwarded_for)
            .body(axum::body::Body::empty())
            .unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[test]
    fn test_forwarded_headers_ignored_unless_trusted() {
        let req = request_from("192.0.2.10:5000", "203.0.113.7");

        assert_eq!(client_ip(&req, false), "192.0.2.10");
        assert_eq!(client_ip(&req, true), "203.0.113.7");
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_cancel() {
        let limiters = Arc::new(RateLimiters::new(&RateLimitConfig {
            cleanup_interval_secs: 1,
            ..RateLimitConfig::default()
        }));
        let shutdown = CancellationToken::new();
        let handle = limiters.spawn_cleanup(shutdown.clone());

        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cleanup task did not stop")
            .unwrap();
    }
}
