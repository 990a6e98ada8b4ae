//! Request admission: API keys and rate limiting

pub mod auth;
pub mod rate_limit;

pub use auth::{check_key, constant_time_compare, require_admin_key, require_api_key, KeyCheck};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
