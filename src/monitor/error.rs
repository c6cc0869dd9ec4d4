//! Error taxonomy for the monitoring core
//!
//! Three failure classes:
//! - Fetch errors: transient, retried by `RetryPolicy`, then recorded as
//!   `last_error` on the subscription (`FetchExhausted`)
//! - `UnsupportedDomain`: fatal for that one subscription at load time,
//!   other subscriptions still load
//! - Persistence errors: fatal to the current tick only - logged, the loop
//!   continues to the next scheduled tick

use super::types::DataDomain;
use std::fmt;

/// Boxed error used at the collaborator boundaries (sources, store)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// No data source is registered for a subscription's domain
#[derive(Debug)]
pub struct UnsupportedDomain(pub DataDomain);

impl fmt::Display for UnsupportedDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no data source registered for domain: {}", self.0)
    }
}

impl std::error::Error for UnsupportedDomain {}

/// All fetch attempts for one tick failed
///
/// Carries the error string of the final attempt; recorded verbatim as the
/// subscription's `last_error`.
#[derive(Debug)]
pub struct FetchExhausted {
    pub attempts: u32,
    pub last_error: String,
}

impl fmt::Display for FetchExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetch failed after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl std::error::Error for FetchExhausted {}
