//! Backend-selecting gateway handle
//!
//! Handlers hold a [`Gateway`] and never know which backend serves them.
//! Cloning is cheap: both variants share their underlying pool or table.

use super::memory::MemoryRepository;
use super::pagination::Pagination;
use super::postgres::{PgEntity, PgRepository};
use super::predicate::Predicate;
use super::traits::{Repository, RepositoryResult};

/// Persistence gateway for one entity type
pub enum Gateway<E> {
    /// Process-local storage
    Memory(MemoryRepository<E>),
    /// PostgreSQL storage
    Postgres(PgRepository<E>),
}

impl<E> Clone for Gateway<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Memory(repo) => Self::Memory(repo.clone()),
            Self::Postgres(repo) => Self::Postgres(repo.clone()),
        }
    }
}

impl<E: PgEntity> Gateway<E> {
    /// Empty in-memory gateway
    pub fn memory() -> Self {
        Self::Memory(MemoryRepository::new())
    }

    /// Gateway over a PostgreSQL pool
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::Postgres(PgRepository::new(pool))
    }

    /// Backend name for health reports
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

impl<E: PgEntity> Repository<E> for Gateway<E> {
    async fn count(&self, predicate: &Predicate) -> RepositoryResult<u64> {
        match self {
            Self::Memory(repo) => repo.count(predicate).await,
            Self::Postgres(repo) => repo.count(predicate).await,
        }
    }

    async fn fetch(
        &self,
        predicate: &Predicate,
        pagination: Option<Pagination>,
    ) -> RepositoryResult<Vec<E>> {
        match self {
            Self::Memory(repo) => repo.fetch(predicate, pagination).await,
            Self::Postgres(repo) => repo.fetch(predicate, pagination).await,
        }
    }

    async fn count_and_fetch(
        &self,
        predicate: &Predicate,
        pagination: Pagination,
    ) -> RepositoryResult<(u64, Vec<E>)> {
        match self {
            Self::Memory(repo) => repo.count_and_fetch(predicate, pagination).await,
            Self::Postgres(repo) => repo.count_and_fetch(predicate, pagination).await,
        }
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<E>> {
        match self {
            Self::Memory(repo) => repo.find_by_id(id).await,
            Self::Postgres(repo) => repo.find_by_id(id).await,
        }
    }

    async fn insert(&self, record: E) -> RepositoryResult<E> {
        match self {
            Self::Memory(repo) => repo.insert(record).await,
            Self::Postgres(repo) => repo.insert(record).await,
        }
    }

    async fn update(&self, id: i64, record: E) -> RepositoryResult<bool> {
        match self {
            Self::Memory(repo) => repo.update(id, record).await,
            Self::Postgres(repo) => repo.update(id, record).await,
        }
    }

    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        match self {
            Self::Memory(repo) => repo.delete(id).await,
            Self::Postgres(repo) => repo.delete(id).await,
        }
    }

    async fn ping(&self) -> RepositoryResult<()> {
        match self {
            Self::Memory(repo) => repo.ping().await,
            Self::Postgres(repo) => repo.ping().await,
        }
    }
}
