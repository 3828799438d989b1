//! Repository trait definitions for the bid store.
//!
//! - [`error`]: Error types for repository operations
//! - [`bids`]: Append and query-by-day operations on bid events

pub mod bids;
pub mod error;

pub use bids::BidRepository;
pub use error::{ErrorContext, RepositoryError, RepositoryResult};
