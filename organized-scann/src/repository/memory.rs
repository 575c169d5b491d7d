//! In-memory persistence gateway
//!
//! Used when no database is configured and throughout the test suite. Rows
//! live in an id-ordered map behind a single `RwLock`, so reads taken under
//! one guard always see one consistent version of the collection.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::error::{unique_violation_message, RepositoryError, RepositoryOperation};
use super::pagination::Pagination;
use super::predicate::Predicate;
use super::traits::{Entity, Repository, RepositoryResult};

struct Table<E> {
    rows: BTreeMap<i64, E>,
    next_id: i64,
}

impl<E: Entity> Table<E> {
    fn select(&self, predicate: &Predicate, pagination: Option<Pagination>) -> Vec<E> {
        let matching = self.rows.values().filter(|row| predicate.matches(*row));
        match pagination {
            Some(window) => matching
                .skip(window.skip())
                .take(window.take())
                .cloned()
                .collect(),
            None => matching.cloned().collect(),
        }
    }

    fn total(&self, predicate: &Predicate) -> u64 {
        self.rows.values().filter(|row| predicate.matches(*row)).count() as u64
    }

    /// Reject `record` if another row already holds one of its unique keys
    fn check_unique(
        &self,
        record: &E,
        except: Option<i64>,
        operation: RepositoryOperation,
    ) -> RepositoryResult<()> {
        let keys = record.unique_keys();
        if keys.is_empty() {
            return Ok(());
        }

        for (id, existing) in &self.rows {
            if Some(*id) == except {
                continue;
            }
            for taken in existing.unique_keys() {
                if let Some(clash) = keys
                    .iter()
                    .find(|k| k.constraint == taken.constraint && k.value == taken.value)
                {
                    return Err(RepositoryError::constraint_violation(
                        operation,
                        unique_violation_message(clash.constraint),
                    )
                    .with_entity_type(E::NAME));
                }
            }
        }
        Ok(())
    }
}

/// Repository backed by process memory
pub struct MemoryRepository<E> {
    table: Arc<RwLock<Table<E>>>,
}

impl<E> Clone for MemoryRepository<E> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<E: Entity> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryRepository<E> {
    /// Create an empty repository; ids start at 1
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(Table {
                rows: BTreeMap::new(),
                next_id: 1,
            })),
        }
    }
}

impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn count(&self, predicate: &Predicate) -> RepositoryResult<u64> {
        Ok(self.table.read().await.total(predicate))
    }

    async fn fetch(
        &self,
        predicate: &Predicate,
        pagination: Option<Pagination>,
    ) -> RepositoryResult<Vec<E>> {
        Ok(self.table.read().await.select(predicate, pagination))
    }

    async fn count_and_fetch(
        &self,
        predicate: &Predicate,
        pagination: Pagination,
    ) -> RepositoryResult<(u64, Vec<E>)> {
        let table = self.table.read().await;
        Ok((table.total(predicate), table.select(predicate, Some(pagination))))
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<E>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn insert(&self, record: E) -> RepositoryResult<E> {
        let mut table = self.table.write().await;
        table.check_unique(&record, None, RepositoryOperation::Insert)?;

        let id = table.next_id;
        table.next_id += 1;
        let record = record.with_id(id);
        table.rows.insert(id, record.clone());

        tracing::debug!(entity = E::NAME, id, "Inserted record");
        Ok(record)
    }

    async fn update(&self, id: i64, record: E) -> RepositoryResult<bool> {
        let mut table = self.table.write().await;
        let Some(previous) = table.rows.get(&id) else {
            return Ok(false);
        };

        let record = record.preserve(previous).with_id(id);
        table.check_unique(&record, Some(id), RepositoryOperation::Update)?;
        table.rows.insert(id, record);
        Ok(true)
    }

    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        FilterCondition, FilterValue, Filterable, RepositoryErrorKind, UniqueKey,
    };

    #[derive(Debug, Clone, PartialEq)]
    struct Tag {
        id: i64,
        label: String,
        plate: String,
    }

    impl Tag {
        fn new(label: &str, plate: &str) -> Self {
            Self {
                id: 0,
                label: label.to_string(),
                plate: plate.to_string(),
            }
        }
    }

    impl Filterable for Tag {
        fn column_value(&self, column: &str) -> Option<FilterValue> {
            match column {
                "label" => Some(self.label.clone().into()),
                _ => None,
            }
        }
    }

    impl Entity for Tag {
        const NAME: &'static str = "Tag";

        fn id(&self) -> i64 {
            self.id
        }

        fn with_id(mut self, id: i64) -> Self {
            self.id = id;
            self
        }

        fn unique_keys(&self) -> Vec<UniqueKey> {
            vec![UniqueKey::new("motorcycles_license_plate_key", &self.plate)]
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let repo = MemoryRepository::new();
        let a = repo.insert(Tag::new("a", "P1")).await.unwrap();
        let b = repo.insert(Tag::new("b", "P2")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(repo.find_by_id(2).await.unwrap(), Some(b));
        assert_eq!(repo.find_by_id(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unique_key_violation() {
        let repo = MemoryRepository::new();
        repo.insert(Tag::new("a", "P1")).await.unwrap();
        let err = repo.insert(Tag::new("b", "P1")).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
        assert_eq!(err.message, "License plate is already registered");
    }

    #[tokio::test]
    async fn test_update_keeps_own_unique_key() {
        let repo = MemoryRepository::new();
        let a = repo.insert(Tag::new("a", "P1")).await.unwrap();
        repo.insert(Tag::new("b", "P2")).await.unwrap();

        assert!(repo.update(a.id, Tag::new("renamed", "P1")).await.unwrap());
        assert_eq!(repo.find_by_id(a.id).await.unwrap().unwrap().label, "renamed");

        let err = repo.update(a.id, Tag::new("x", "P2")).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);

        assert!(!repo.update(42, Tag::new("ghost", "P9")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = MemoryRepository::new();
        let a = repo.insert(Tag::new("a", "P1")).await.unwrap();
        assert!(repo.delete(a.id).await.unwrap());
        assert!(!repo.delete(a.id).await.unwrap());
        assert_eq!(repo.count(&Predicate::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_and_fetch_window() {
        let repo = MemoryRepository::new();
        for (i, label) in ["x", "y", "x", "x"].iter().enumerate() {
            repo.insert(Tag::new(label, &format!("P{i}"))).await.unwrap();
        }

        let predicate = Predicate::all().and(FilterCondition::eq("label", "x"));
        let (total, items) = repo
            .count_and_fetch(&predicate, Pagination::page(2, 2))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 4);

        let (total, items) = repo
            .count_and_fetch(&predicate, Pagination::page(5, 2))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_is_ordered_and_repeatable() {
        let repo = MemoryRepository::new();
        for i in 0..5 {
            repo.insert(Tag::new("t", &format!("P{i}"))).await.unwrap();
        }
        let first = repo.fetch(&Predicate::all(), None).await.unwrap();
        let second = repo.fetch(&Predicate::all(), None).await.unwrap();
        assert_eq!(first, second);
        let ids: Vec<i64> = first.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }
}
