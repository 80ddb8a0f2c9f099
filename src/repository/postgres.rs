//! PostgreSQL store.
//!
//! One generic implementation serves every record type. Column values travel
//! as a single JSON parameter expanded with `jsonb_populate_record`, so the
//! statements only need the table name and [`Record::COLUMNS`].

use super::{Scope, Store, UserDirectory};
use crate::entity::{check_columns, Patch, Record};
use crate::error::Result;
use crate::models::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::marker::PhantomData;

/// Open a connection pool.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    info!("Connected to PostgreSQL (max connections: {})", max_connections);
    Ok(pool)
}

/// Apply the embedded migrations under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(sqlx::Error::from)?;
    info!("Database migrations applied");
    Ok(())
}

fn scope_clause(scope: Scope) -> &'static str {
    match scope {
        Scope::Live => " AND deleted_at IS NULL",
        Scope::All => "",
    }
}

/// sqlx-backed [`Store`] for any record with an `i64` id.
///
/// Cloning shares the pool.
pub struct PgStore<T> {
    pool: PgPool,
    insert_sql: String,
    update_sql: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for PgStore<T> {
    fn clone(&self) -> Self {
        PgStore {
            pool: self.pool.clone(),
            insert_sql: self.insert_sql.clone(),
            update_sql: self.update_sql.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> PgStore<T>
where
    T: Record<Id = i64> + for<'r> FromRow<'r, PgRow> + Unpin,
{
    pub fn new(pool: PgPool) -> Self {
        let table = T::table_name();
        let columns = T::COLUMNS.join(", ");
        let assignments = T::COLUMNS
            .iter()
            .map(|c| format!("{c} = r.{c}"))
            .collect::<Vec<_>>()
            .join(", ");

        let insert_sql = format!(
            "INSERT INTO {table} ({columns}, created_at, updated_at) \
             SELECT {columns}, now(), now() FROM jsonb_populate_record(NULL::{table}, $1) \
             RETURNING *"
        );
        let update_sql = format!(
            "UPDATE {table} SET {assignments}, updated_at = now() \
             FROM jsonb_populate_record(NULL::{table}, $1) AS r \
             WHERE {table}.id = $2 RETURNING {table}.*"
        );

        PgStore {
            pool,
            insert_sql,
            update_sql,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<T> Store<T> for PgStore<T>
where
    T: Record<Id = i64> + for<'r> FromRow<'r, PgRow> + Unpin,
{
    async fn create(&self, draft: &T::Draft) -> Result<T> {
        let row = sqlx::query_as::<_, T>(&self.insert_sql)
            .bind(Json(serde_json::to_value(draft)?))
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: &i64, scope: Scope) -> Result<Option<T>> {
        let sql = format!(
            "SELECT * FROM {} WHERE id = $1{}",
            T::table_name(),
            scope_clause(scope)
        );
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(*id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_all(&self, scope: Scope) -> Result<Vec<T>> {
        let sql = format!(
            "SELECT * FROM {} WHERE TRUE{} ORDER BY id",
            T::table_name(),
            scope_clause(scope)
        );
        let rows = sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn update(&self, id: &i64, draft: &T::Draft) -> Result<Option<T>> {
        let row = sqlx::query_as::<_, T>(&self.update_sql)
            .bind(Json(serde_json::to_value(draft)?))
            .bind(*id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_fields(&self, id: &i64, patch: &Patch) -> Result<Option<T>> {
        // Column names are spliced into the statement; only known ones pass.
        check_columns::<T>(patch)?;
        let table = T::table_name();

        let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {table} SET "));
        for column in patch.keys() {
            qb.push(format!("{column} = r.{column}, "));
        }
        qb.push(format!(
            "updated_at = now() FROM jsonb_populate_record(NULL::{table}, "
        ));
        qb.push_bind(Json(Value::Object(patch.clone())));
        qb.push(format!(") AS r WHERE {table}.id = "));
        qb.push_bind(*id);
        qb.push(format!(" RETURNING {table}.*"));

        let row = qb
            .build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn set_deleted_at(&self, id: &i64, at: Option<DateTime<Utc>>) -> Result<u64> {
        let sql = format!("UPDATE {} SET deleted_at = $1 WHERE id = $2", T::table_name());
        let result = sqlx::query(&sql)
            .bind(at)
            .bind(*id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserDirectory for PgStore<User> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = $1 AND deleted_at IS NULL",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
