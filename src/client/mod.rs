//! Typed HTTP client for the timetrack API.
//!
//! Every mutation is validated and gated locally with the same rules the
//! server applies, guarded against duplicate submission, and followed by a
//! refetch of the affected record.

mod api_client;
mod error;
mod inflight;
mod session;

pub use api_client::{ApiClient, week_view};
pub use error::ClientError;
pub use inflight::{InFlight, Ticket};
pub use session::Session;
