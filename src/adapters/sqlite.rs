use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::{
    Column, Row, Sqlite, TypeInfo, ValueRef,
    query::Query as SqlxQuery,
    sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow},
};

use super::{
    Adapter,
    sql::{self, Dialect},
};
use crate::{error::Error, query::Query, record::Record, value::Value};

/// SQLite adapter.
///
/// Values are decoded by their storage class (`INTEGER`, `REAL`, `TEXT`,
/// `NULL`); dates therefore come back as text and compare as text. Date
/// parameters are bound as RFC 3339 strings.
pub struct SqliteAdapter {
    pub(crate) pool: SqlitePool,
}

impl SqliteAdapter {
    /// Create a new SQLite adapter with a file-based database
    pub async fn new_file(path: &str) -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{}", path))
            .await?;

        Ok(Self { pool })
    }

    /// Create a new SQLite adapter with an in-memory database
    pub async fn new_memory() -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn query_bind_values<'q>(
        mut query: SqlxQuery<'q, Sqlite, SqliteArguments<'q>>,
        values: &[Value],
    ) -> SqlxQuery<'q, Sqlite, SqliteArguments<'q>> {
        for value in values {
            query = match value {
                Value::Null => query.bind(None::<String>),
                Value::Int(i) => query.bind(*i),
                Value::Float(f) => query.bind(*f),
                Value::Bool(b) => query.bind(*b),
                Value::String(s) => query.bind(s.clone()),
                Value::Date(d) => query.bind(d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                Value::Json(j) => query.bind(j.clone()),
            };
        }
        query
    }

    fn map_row_to_record(row: SqliteRow) -> Result<Record, Error> {
        let de = |e: sqlx::Error| Error::Deserialize(e.to_string());
        let mut record = Record::new();

        for column in row.columns() {
            let i = column.ordinal();
            let raw = row.try_get_raw(i).map_err(de)?;
            if raw.is_null() {
                record.insert(column.name(), Value::Null);
                continue;
            }

            let storage = raw.type_info().name().to_string();
            let value = match storage.as_str() {
                "INTEGER" | "BOOLEAN" => Value::Int(row.try_get_unchecked::<i64, _>(i).map_err(de)?),
                "REAL" => Value::Float(row.try_get_unchecked::<f64, _>(i).map_err(de)?),
                "TEXT" | "DATETIME" | "DATE" | "TIME" => {
                    Value::String(row.try_get_unchecked::<String, _>(i).map_err(de)?)
                }
                other => {
                    return Err(Error::Deserialize(format!(
                        "unsupported storage class {} for `{}`",
                        other,
                        column.name()
                    )));
                }
            };
            record.insert(column.name(), value);
        }

        Ok(record)
    }
}

#[async_trait]
impl Adapter for SqliteAdapter {
    async fn fetch(&self, query: &Query) -> Result<Vec<Record>, Error> {
        let stmt = sql::select(query, Dialect::Sqlite);
        let rows = Self::query_bind_values(sqlx::query(&stmt.sql), &stmt.binds)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::map_row_to_record).collect()
    }

    async fn count(&self, query: &Query) -> Result<u64, Error> {
        let stmt = sql::count(query, Dialect::Sqlite);
        let row = Self::query_bind_values(sqlx::query(&stmt.sql), &stmt.binds)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row
            .try_get("count")
            .map_err(|e| Error::Deserialize(e.to_string()))?;
        Ok(count as u64)
    }
}
