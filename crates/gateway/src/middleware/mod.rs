//! Request middleware

pub mod admin_guard;
pub mod metrics;
pub mod rate_limit;
