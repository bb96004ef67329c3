pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod router;
pub mod security_headers;
