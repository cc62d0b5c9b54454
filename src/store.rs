//! Transaction store
//!
//! Read-side access to the transaction table owned by the CRUD layer.
//! Postgres-backed in deployment; in-memory for development and tests.

use crate::models::{TransactionKind, TransactionRecord};
use crate::Result;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Trait for read-only transaction queries
#[async_trait::async_trait]
pub trait TransactionStore: Send + Sync {
    /// Fetch all non-deleted transactions for `user_id` with date in
    /// `[start, end]` (both inclusive).
    async fn fetch_window(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TransactionRecord>>;
}

/// In-memory store for development and tests
pub struct InMemoryTransactionStore {
    rows: Arc<RwLock<HashMap<Uuid, Vec<TransactionRecord>>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, record: TransactionRecord) {
        let mut rows = self.rows.write().await;
        rows.entry(record.user_id).or_insert_with(Vec::new).push(record);
    }

    pub async fn mark_deleted(&self, user_id: Uuid, transaction_id: Uuid) {
        let mut rows = self.rows.write().await;
        if let Some(user_rows) = rows.get_mut(&user_id) {
            for row in user_rows.iter_mut() {
                if row.id == transaction_id {
                    row.is_deleted = true;
                }
            }
        }
    }
}

impl Default for InMemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn fetch_window(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TransactionRecord>> {
        let rows = self.rows.read().await;

        Ok(rows
            .get(&user_id)
            .map(|user_rows| {
                user_rows
                    .iter()
                    .filter(|t| !t.is_deleted && t.date >= start && t.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Postgres-backed store over the CRUD layer's transaction table
pub struct PgTransactionStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS transactions (
                      id UUID PRIMARY KEY,
                      user_id UUID NOT NULL,
                      amount DOUBLE PRECISION NOT NULL,
                      type TEXT NOT NULL,
                      date DATE NOT NULL,
                      category TEXT NOT NULL,
                      description TEXT NOT NULL,
                      notes TEXT,
                      is_deleted BOOLEAN NOT NULL DEFAULT FALSE
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_transactions_user_date
                    ON transactions (user_id, date);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                crate::error::AssistantError::DatabaseError(format!(
                    "Failed to initialize transaction schema: {}",
                    e
                ))
            })?;

        Ok(())
    }

    fn kind_from_db(kind: &str) -> TransactionKind {
        match kind.to_lowercase().as_str() {
            "income" => TransactionKind::Income,
            _ => TransactionKind::Expense,
        }
    }
}

#[async_trait::async_trait]
impl TransactionStore for PgTransactionStore {
    async fn fetch_window(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TransactionRecord>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, amount, type, date, category, description, notes
            FROM transactions
            WHERE user_id = $1
              AND date >= $2
              AND date <= $3
              AND is_deleted = FALSE
            ORDER BY date ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            crate::error::AssistantError::DatabaseError(format!(
                "Failed to load transaction window: {}",
                e
            ))
        })?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let db_kind: String = row.try_get("type").unwrap_or_else(|_| "expense".to_string());

            records.push(TransactionRecord {
                id: row.try_get("id").unwrap_or_else(|_| Uuid::new_v4()),
                user_id,
                amount: row.try_get("amount").unwrap_or(0.0),
                kind: Self::kind_from_db(&db_kind),
                date: row.try_get("date").unwrap_or(start),
                category: row.try_get("category").unwrap_or_default(),
                description: row.try_get("description").unwrap_or_default(),
                notes: row.try_get("notes").ok(),
                is_deleted: false,
            });
        }

        Ok(records)
    }
}

/// Build a store from the environment: Postgres when a database URL is
/// configured and the pool can be created, in-memory otherwise.
pub fn build_store() -> Arc<dyn TransactionStore> {
    let database_url = env::var("POSTGRES_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok();

    if let Some(url) = database_url {
        match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(&url)
        {
            Ok(pool) => {
                info!("Transaction store backend: postgres");
                return Arc::new(PgTransactionStore::new(pool));
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres transaction store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Transaction store backend: in-memory");
    Arc::new(InMemoryTransactionStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: Uuid, date: &str, kind: TransactionKind, amount: f64) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            user_id,
            amount,
            kind,
            date: date.parse().unwrap(),
            category: "Ăn uống".to_string(),
            description: "test".to_string(),
            notes: None,
            is_deleted: false,
        }
    }

    #[test]
    fn test_window_filters_dates_and_deleted_rows() {
        tokio_test::block_on(async {
            let store = InMemoryTransactionStore::new();
            let user_id = Uuid::new_v4();

            let inside = record(user_id, "2025-06-10", TransactionKind::Expense, 50_000.0);
            let outside = record(user_id, "2025-01-01", TransactionKind::Expense, 80_000.0);
            let deleted_id = Uuid::new_v4();
            let mut deleted = record(user_id, "2025-06-12", TransactionKind::Income, 1_000_000.0);
            deleted.id = deleted_id;

            store.insert(inside).await;
            store.insert(outside).await;
            store.insert(deleted).await;
            store.mark_deleted(user_id, deleted_id).await;

            let window = store
                .fetch_window(
                    user_id,
                    "2025-06-01".parse().unwrap(),
                    "2025-06-30".parse().unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(window.len(), 1);
            assert_eq!(window[0].amount, 50_000.0);
        });
    }

    #[test]
    fn test_unknown_user_yields_empty_window() {
        tokio_test::block_on(async {
            let store = InMemoryTransactionStore::new();

            let window = store
                .fetch_window(
                    Uuid::new_v4(),
                    "2025-06-01".parse().unwrap(),
                    "2025-06-30".parse().unwrap(),
                )
                .await
                .unwrap();

            assert!(window.is_empty());
        });
    }
}
