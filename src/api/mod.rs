//! FOIS remote API access
//!
//! - [`endpoints`] - fixed endpoint registry and zone predicates
//! - [`auth`] - client-credential token acquire/revoke
//! - [`rate`] - fixed-threshold call pacing
//! - [`fetcher`] - one authenticated request per (endpoint, day)

pub mod auth;
pub mod endpoints;
pub mod fetcher;
pub mod rate;

pub use auth::{AuthManager, Credential};
pub use endpoints::{Endpoint, ZoneFilter};
pub use fetcher::RemoteFetcher;
pub use rate::{RateLimiter, RatePolicy};
