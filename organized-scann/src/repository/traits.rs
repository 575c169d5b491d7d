//! Repository trait definitions
//!
//! Traits use RPITIT (return position `impl Trait` in traits), so backends
//! implement them with plain `async fn` and no boxing.

use std::future::Future;

use super::error::RepositoryError;
use super::pagination::Pagination;
use super::predicate::{Filterable, Predicate};

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Unique key declared by an entity, named after its storage constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    /// Constraint name, e.g. `users_email_key`
    pub constraint: &'static str,
    /// Value that must not repeat across records
    pub value: String,
}

impl UniqueKey {
    /// Create a unique key
    pub fn new(constraint: &'static str, value: impl Into<String>) -> Self {
        Self {
            constraint,
            value: value.into(),
        }
    }
}

/// Record type stored behind a [`Repository`]
pub trait Entity: Filterable + Clone + Send + Sync + 'static {
    /// Entity name used in logs and errors
    const NAME: &'static str;

    /// Identity assigned by the gateway; 0 before insertion
    fn id(&self) -> i64;

    /// Same record with the given identity
    fn with_id(self, id: i64) -> Self;

    /// Keys that must stay unique across the collection
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Carry over fields a replacement must not change (e.g. creation time)
    fn preserve(self, _previous: &Self) -> Self {
        self
    }
}

/// Persistence gateway for one entity type
///
/// Records are always returned ordered by ascending id.
pub trait Repository<E: Entity>: Send + Sync {
    /// Number of records matching `predicate`
    fn count(&self, predicate: &Predicate) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Records matching `predicate`, optionally restricted to a window
    fn fetch(
        &self,
        predicate: &Predicate,
        pagination: Option<Pagination>,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Count and fetch observing the same snapshot of the collection
    fn count_and_fetch(
        &self,
        predicate: &Predicate,
        pagination: Pagination,
    ) -> impl Future<Output = RepositoryResult<(u64, Vec<E>)>> + Send;

    /// Record with the given id, if any
    fn find_by_id(&self, id: i64) -> impl Future<Output = RepositoryResult<Option<E>>> + Send;

    /// Store a new record and return it with its assigned id
    fn insert(&self, record: E) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Replace the record with the given id; `false` when it does not exist
    fn update(&self, id: i64, record: E) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Remove the record with the given id; `false` when it does not exist
    fn delete(&self, id: i64) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Verify the backing store is reachable
    fn ping(&self) -> impl Future<Output = RepositoryResult<()>> + Send;
}
