use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use thiserror::Error;

use urbanbot_core::collab::DataStore;
use urbanbot_core::record::Record;

use crate::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read-only query execution over the city schema. The router guarantees
/// every statement arriving here already passed the destructive-action
/// filter and the SELECT-only structural check.
pub struct SqlDataStore {
    pool: DbPool,
}

impl SqlDataStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<Record>, StoreError> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }
}

#[async_trait]
impl DataStore for SqlDataStore {
    async fn query(&self, sql: &str) -> Result<Vec<Record>> {
        Ok(self.fetch(sql).await?)
    }
}

/// Decode a row into ordered column/value pairs. SQLite is dynamically
/// typed, so decoding branches on the declared type of each column.
fn decode_row(row: &SqliteRow) -> Result<Record, StoreError> {
    let mut fields = Vec::with_capacity(row.columns().len());

    for column in row.columns() {
        let ordinal = column.ordinal();
        let raw = row
            .try_get_raw(ordinal)
            .map_err(|error| StoreError::Decode(format!("column {}: {error}", column.name())))?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            decode_column(row, ordinal, &type_name)
                .map_err(|error| StoreError::Decode(format!("column {}: {error}", column.name())))?
        };

        fields.push((column.name().to_string(), value));
    }

    Ok(Record::new(fields))
}

fn decode_column(row: &SqliteRow, ordinal: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" => {
            Value::from(row.try_get::<i64, _>(ordinal)?)
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            let float = row.try_get::<f64, _>(ordinal)?;
            serde_json::Number::from_f64(float).map(Value::Number).unwrap_or(Value::Null)
        }
        "BOOLEAN" | "BOOL" => Value::Bool(row.try_get::<bool, _>(ordinal)?),
        // TEXT, DATETIME and anything else sqlite stores as text.
        _ => Value::String(row.try_get::<String, _>(ordinal)?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use urbanbot_core::collab::DataStore;

    use super::SqlDataStore;
    use crate::{connect_with_settings, migrations};

    async fn seeded_store() -> SqlDataStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("in-memory sqlite connects");
        migrations::run_pending(&pool).await.expect("migrations apply");

        sqlx::query(
            "INSERT INTO accident_events \
             (accident_id, detected_at, severity, vehicle_count, latitude, longitude) \
             VALUES ('acc-1', '2026-08-29 09:10:00', 'major', 3, 11.01, 76.96)",
        )
        .execute(&pool)
        .await
        .expect("seed row inserts");

        SqlDataStore::new(pool)
    }

    #[tokio::test]
    async fn select_preserves_column_order_and_types() {
        let store = seeded_store().await;
        let records = store
            .query("SELECT severity, vehicle_count, latitude FROM accident_events")
            .await
            .expect("select succeeds");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.first().map(|(name, _)| name), Some("severity"));
        assert_eq!(record.get("vehicle_count"), Some(&serde_json::json!(3)));
        assert_eq!(record.get("latitude"), Some(&serde_json::json!(11.01)));
    }

    #[tokio::test]
    async fn count_queries_come_back_as_single_integer_columns() {
        let store = seeded_store().await;
        let records = store
            .query("SELECT COUNT(*) AS accident_count FROM accident_events")
            .await
            .expect("count succeeds");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].len(), 1);
        assert_eq!(records[0].get("accident_count"), Some(&serde_json::json!(1)));
    }

    #[tokio::test]
    async fn empty_result_is_an_empty_vec_not_an_error() {
        let store = seeded_store().await;
        let records = store
            .query("SELECT * FROM citizen_complaints")
            .await
            .expect("empty select succeeds");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn null_columns_decode_as_null() {
        let store = seeded_store().await;
        let records = store
            .query("SELECT image_id FROM accident_events")
            .await
            .expect("select succeeds");
        assert_eq!(records[0].get("image_id"), Some(&serde_json::Value::Null));
    }
}
