//! Bid store: repository trait, implementations and factory.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP handlers / daily scheduler                        │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │  Arc<dyn BidRepository>
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Trait (repository/) - Abstract Interface    │
//! └───────────────────┬─────────────────────────────────────┘
//!     ┌───────────────┴────────────────┐
//! ┌───▼──────────────────┐   ┌─────────▼───────────────┐
//! │ Postgres Repository  │   │ Local Repository        │
//! │ (Diesel, r2d2)       │   │ (in-memory)             │
//! └──────────────────────┘   └─────────────────────────┘
//! ```
//!
//! The handle is created once by [`RepositoryFactory`] and passed explicitly
//! to whoever needs it.

// Feature flag priority: postgres > local
#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repositories;
pub mod repository;

#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryFactory, RepositoryType};
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{BidRepository, ErrorContext, RepositoryError, RepositoryResult};
