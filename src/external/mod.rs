//! External collaborators
//!
//! Weather, routing/ETA, and email providers live behind traits so the core
//! never blocks on, or fails because of, a third party:
//!
//! - every outbound call carries a timeout (5 s weather, 10 s routing,
//!   10 s email)
//! - weather responses are cached ~30 minutes, routing ~1 hour
//! - on timeout, rate limiting, or any error, the caller falls back to a
//!   neutral heuristic result marked `api_available: false`
//! - email delivery retries twice with exponential backoff; read-only
//!   lookups never retry
//!
//! Provider degradation never cascades into event-log failures.

mod email;
mod routing;
mod weather;

pub use email::{EmailConfig, EmailDelivery, EmailSender, MockEmailSender, SmtpEmailSender};
pub use routing::{
    HeuristicRoutingProvider, OrsRoutingProvider, RouteEstimate, RoutingProvider,
};
pub use weather::{
    NeutralWeatherProvider, OpenWeatherProvider, WeatherAssessment, WeatherProvider,
};

use thiserror::Error;

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Availability errors from third parties
///
/// These degrade gracefully at the call site; they are never fatal.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider did not answer within its timeout
    #[error("External API timeout after {seconds}s: {provider}")]
    Timeout {
        /// Which provider
        provider: &'static str,
        /// The configured timeout
        seconds: u64,
    },

    /// HTTP 429
    #[error("External API rate limited: {provider}")]
    RateLimited {
        /// Which provider
        provider: &'static str,
    },

    /// Any other provider failure
    #[error("External API error from {provider}: {detail}")]
    Api {
        /// Which provider
        provider: &'static str,
        /// What went wrong
        detail: String,
    },
}
