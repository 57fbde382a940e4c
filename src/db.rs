//! Database collaborator used by the insert workers.
//!
//! The pipeline only needs two primitives: prepare a parameterized statement
//! and execute it with positional text arguments. [`Database`] captures that
//! seam; [`SqlDatabase`] implements it on a sqlx pool, and
//! [`crate::test_support::RecordingDatabase`] implements it in memory.

use std::future::Future;

use sqlx::any::{Any, AnyPoolOptions, AnyStatement};
use sqlx::pool::PoolConnection;
use sqlx::{AnyPool, Connection, Executor, Statement};

use crate::error::{LoadError, LoadResult};

pub trait Database: Clone + Send + Sync + 'static {
    /// A statement prepared for exactly one batch.
    type Prepared: Send + 'static;

    /// Prepare `sql` for a single execution.
    fn prepare(&self, sql: &str) -> impl Future<Output = Result<Self::Prepared, sqlx::Error>> + Send;

    /// Execute a prepared statement, returning the number of affected rows.
    fn execute(
        &self,
        prepared: Self::Prepared,
        args: Vec<String>,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

/// sqlx-backed database handle.
///
/// The pool is capped at the configured concurrency so that the number of
/// open connections matches the number of insert slots.
#[derive(Clone, Debug)]
pub struct SqlDatabase {
    pool: AnyPool,
}

/// A statement prepared on, and pinned to, one pooled connection.
pub struct PreparedInsert {
    conn: PoolConnection<Any>,
    statement: AnyStatement<'static>,
}

impl SqlDatabase {
    /// Connect with at most `max_connections` connections and ping once.
    pub async fn connect(url: &str, max_connections: usize) -> LoadResult<Self> {
        sqlx::any::install_default_drivers();

        let max_connections = u32::try_from(max_connections).unwrap_or(u32::MAX);
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(LoadError::Connect)?;

        let mut conn = pool.acquire().await.map_err(LoadError::Connect)?;
        conn.ping().await.map_err(LoadError::Connect)?;
        drop(conn);

        log::debug!("connected to database, pool size {}", max_connections);
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl Database for SqlDatabase {
    type Prepared = PreparedInsert;

    async fn prepare(&self, sql: &str) -> Result<PreparedInsert, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        let prepared = (&mut *conn).prepare(sql).await?;
        let statement = Statement::to_owned(&prepared);
        Ok(PreparedInsert { conn, statement })
    }

    async fn execute(&self, prepared: PreparedInsert, args: Vec<String>) -> Result<u64, sqlx::Error> {
        let PreparedInsert {
            mut conn,
            statement,
        } = prepared;

        let mut query = statement.query();
        for value in args {
            query = query.bind(value);
        }

        let result = query.execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_scheme_is_a_connect_error() {
        let result = SqlDatabase::connect("nosuchdb://localhost/test", 2).await;
        assert!(matches!(result, Err(LoadError::Connect(_))));
    }
}
