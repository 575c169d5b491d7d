//! Persistence gateway
//!
//! - [`Repository`]: the CRUD contract every backend implements
//! - [`Predicate`]: conjunctive exact-match filter handed whole to a backend
//! - [`Pagination`]: offset/limit window
//! - [`MemoryRepository`] and [`PgRepository`]: the two backends
//! - [`Gateway`]: runtime choice between them
//!
//! Count and fetch for one listing go through
//! [`Repository::count_and_fetch`], which both backends run against a single
//! snapshot of the data.

mod error;
mod gateway;
mod memory;
mod pagination;
mod postgres;
mod predicate;
mod traits;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use gateway::Gateway;
pub use memory::MemoryRepository;
pub use pagination::Pagination;
pub use postgres::{PgEntity, PgRepository, SqlValue};
pub use predicate::{FilterCondition, FilterValue, Filterable, Predicate};
pub use traits::{Entity, Repository, RepositoryResult, UniqueKey};
