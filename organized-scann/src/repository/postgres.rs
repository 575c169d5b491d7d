//! PostgreSQL persistence gateway
//!
//! Queries are assembled with `sqlx::QueryBuilder`; every value, including
//! filter values, is sent as a bind parameter. Column names come only from
//! `'static` entity metadata, never from request input.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};

use super::error::{RepositoryError, RepositoryOperation};
use super::pagination::Pagination;
use super::predicate::{FilterValue, Predicate};
use super::traits::{Entity, Repository, RepositoryResult};

/// Column value written on insert and update
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Text column
    Text(Option<String>),
    /// 32-bit integer column
    Int(Option<i32>),
    /// 64-bit integer column
    BigInt(Option<i64>),
    /// Timestamp column
    Timestamp(Option<DateTime<Utc>>),
}

/// Storage mapping for an entity persisted in PostgreSQL
pub trait PgEntity: Entity + for<'r> FromRow<'r, PgRow> + Unpin {
    /// Table name
    const TABLE: &'static str;

    /// Columns the database owns after insert (never rewritten by updates)
    const IMMUTABLE_COLUMNS: &'static [&'static str] = &[];

    /// Writable columns and their values, excluding `id`
    fn column_values(&self) -> Vec<(&'static str, SqlValue)>;
}

/// Repository backed by a PostgreSQL pool
pub struct PgRepository<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for PgRepository<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: PgEntity> PgRepository<E> {
    /// Wrap a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    fn err(operation: RepositoryOperation) -> impl Fn(sqlx::Error) -> RepositoryError {
        move |e| RepositoryError::from_sqlx(operation, e).with_entity_type(E::NAME)
    }

    fn count_query(predicate: &Predicate) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", E::TABLE));
        push_predicate(&mut qb, predicate);
        qb
    }

    fn select_query(
        predicate: &Predicate,
        pagination: Option<Pagination>,
    ) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT * FROM {}", E::TABLE));
        push_predicate(&mut qb, predicate);
        qb.push(" ORDER BY id ASC");
        if let Some(window) = pagination {
            qb.push(" LIMIT ").push_bind(window.sql_limit());
            qb.push(" OFFSET ").push_bind(window.sql_offset());
        }
        qb
    }
}

/// Append `WHERE col = $n AND ...` for every condition
fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) {
    for (i, condition) in predicate.conditions().iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(condition.column).push(" = ");
        match &condition.value {
            FilterValue::Text(s) => {
                qb.push_bind(s.clone());
            }
            FilterValue::Integer(n) => {
                qb.push_bind(*n);
            }
        }
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: SqlValue) {
    match value {
        SqlValue::Text(v) => {
            qb.push_bind(v);
        }
        SqlValue::Int(v) => {
            qb.push_bind(v);
        }
        SqlValue::BigInt(v) => {
            qb.push_bind(v);
        }
        SqlValue::Timestamp(v) => {
            qb.push_bind(v);
        }
    }
}

impl<E: PgEntity> Repository<E> for PgRepository<E> {
    async fn count(&self, predicate: &Predicate) -> RepositoryResult<u64> {
        let mut qb = Self::count_query(predicate);
        let total: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(Self::err(RepositoryOperation::Count))?;
        Ok(total.max(0) as u64)
    }

    async fn fetch(
        &self,
        predicate: &Predicate,
        pagination: Option<Pagination>,
    ) -> RepositoryResult<Vec<E>> {
        let mut qb = Self::select_query(predicate, pagination);
        qb.build_query_as::<E>()
            .fetch_all(&self.pool)
            .await
            .map_err(Self::err(RepositoryOperation::Fetch))
    }

    async fn count_and_fetch(
        &self,
        predicate: &Predicate,
        pagination: Pagination,
    ) -> RepositoryResult<(u64, Vec<E>)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(Self::err(RepositoryOperation::Count))?;

        // Both statements must read the same snapshot
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(Self::err(RepositoryOperation::Count))?;

        let mut count = Self::count_query(predicate);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&mut *tx)
            .await
            .map_err(Self::err(RepositoryOperation::Count))?;

        let mut select = Self::select_query(predicate, Some(pagination));
        let items = select
            .build_query_as::<E>()
            .fetch_all(&mut *tx)
            .await
            .map_err(Self::err(RepositoryOperation::Fetch))?;

        tx.commit()
            .await
            .map_err(Self::err(RepositoryOperation::Fetch))?;

        Ok((total.max(0) as u64, items))
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<E>> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", E::TABLE);
        sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_sqlx(RepositoryOperation::FindById, e)
                    .with_entity(E::NAME, id)
            })
    }

    async fn insert(&self, record: E) -> RepositoryResult<E> {
        let values = record.column_values();

        let mut qb = QueryBuilder::new(format!("INSERT INTO {} (", E::TABLE));
        {
            let mut columns = qb.separated(", ");
            for (column, _) in &values {
                columns.push(*column);
            }
        }
        qb.push(") VALUES (");
        for (i, (_, value)) in values.into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value);
        }
        qb.push(") RETURNING *");

        let created = qb
            .build_query_as::<E>()
            .fetch_one(&self.pool)
            .await
            .map_err(Self::err(RepositoryOperation::Insert))?;

        tracing::debug!(entity = E::NAME, id = created.id(), "Inserted record");
        Ok(created)
    }

    async fn update(&self, id: i64, record: E) -> RepositoryResult<bool> {
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", E::TABLE));
        let mut first = true;
        for (column, value) in record.column_values() {
            if E::IMMUTABLE_COLUMNS.contains(&column) {
                continue;
            }
            if !first {
                qb.push(", ");
            }
            first = false;
            qb.push(column).push(" = ");
            push_value(&mut qb, value);
        }
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_sqlx(RepositoryOperation::Update, e)
                    .with_entity(E::NAME, id)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_sqlx(RepositoryOperation::Delete, e)
                    .with_entity(E::NAME, id)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_sqlx(RepositoryOperation::Ping, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Motorcycle;
    use crate::repository::FilterCondition;

    #[test]
    fn test_select_sql_binds_filters_and_window() {
        let predicate = Predicate::all()
            .and(FilterCondition::eq("brand", "Honda"))
            .and(FilterCondition::eq("year", 2022));
        let qb =
            PgRepository::<Motorcycle>::select_query(&predicate, Some(Pagination::page(2, 10)));
        assert_eq!(
            qb.sql(),
            "SELECT * FROM motorcycles WHERE brand = $1 AND year = $2 \
             ORDER BY id ASC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn test_count_sql_without_filters() {
        let qb = PgRepository::<Motorcycle>::count_query(&Predicate::all());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM motorcycles");
    }
}
