use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{
    Column, PgPool, Postgres, Row, TypeInfo,
    postgres::{PgArguments, PgPoolOptions, PgRow},
    query::Query as PgQuery,
};
use uuid::Uuid;

use super::{
    Adapter,
    sql::{self, Dialect},
};
use crate::{error::Error, query::Query, record::Record, value::Value};

/// PostgreSQL adapter.
///
/// Queries run against the table named by `Query::source`; every column of
/// the row is decoded into the returned [`Record`]. Supported column types:
/// `BOOL`, `INT2/4/8`, `FLOAT4/8`, `TEXT`/`VARCHAR`/`BPCHAR`/`NAME`,
/// `TIMESTAMPTZ`, `TIMESTAMP`, `DATE`, `UUID`, `JSON`/`JSONB`.
///
/// JSON-path orderings extract text (`jsonb_extract_path_text`), so their
/// boundary values compare as text.
pub struct PostgresAdapter {
    pub(crate) pool: PgPool,
}

impl PostgresAdapter {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, Error> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn query_bind_values<'q>(
        mut query: PgQuery<'q, Postgres, PgArguments>,
        values: &[Value],
    ) -> PgQuery<'q, Postgres, PgArguments> {
        for value in values {
            query = match value {
                Value::Null => query.bind(None::<String>),
                Value::Int(i) => query.bind(*i),
                Value::Float(f) => query.bind(*f),
                Value::Bool(b) => query.bind(*b),
                Value::String(s) => query.bind(s.clone()),
                Value::Date(d) => query.bind(*d),
                Value::Json(j) => query.bind(j.clone()),
            };
        }
        query
    }

    fn map_row_to_record(row: PgRow) -> Result<Record, Error> {
        let de = |e: sqlx::Error| Error::Deserialize(e.to_string());
        let mut record = Record::new();

        for column in row.columns() {
            let i = column.ordinal();
            let value = match column.type_info().name() {
                "BOOL" => row.try_get::<Option<bool>, _>(i).map_err(de)?.map(Value::Bool),
                "INT2" => row
                    .try_get::<Option<i16>, _>(i)
                    .map_err(de)?
                    .map(|v| Value::Int(v as i64)),
                "INT4" => row
                    .try_get::<Option<i32>, _>(i)
                    .map_err(de)?
                    .map(|v| Value::Int(v as i64)),
                "INT8" => row.try_get::<Option<i64>, _>(i).map_err(de)?.map(Value::Int),
                "FLOAT4" => row
                    .try_get::<Option<f32>, _>(i)
                    .map_err(de)?
                    .map(|v| Value::Float(v as f64)),
                "FLOAT8" => row.try_get::<Option<f64>, _>(i).map_err(de)?.map(Value::Float),
                "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row
                    .try_get::<Option<String>, _>(i)
                    .map_err(de)?
                    .map(Value::String),
                "TIMESTAMPTZ" => row
                    .try_get::<Option<DateTime<Utc>>, _>(i)
                    .map_err(de)?
                    .map(Value::Date),
                "TIMESTAMP" => row
                    .try_get::<Option<NaiveDateTime>, _>(i)
                    .map_err(de)?
                    .map(|v| Value::Date(v.and_utc())),
                "DATE" => row
                    .try_get::<Option<NaiveDate>, _>(i)
                    .map_err(de)?
                    .map(|v| Value::String(v.to_string())),
                "UUID" => row
                    .try_get::<Option<Uuid>, _>(i)
                    .map_err(de)?
                    .map(|v| Value::String(v.to_string())),
                "JSON" | "JSONB" => row
                    .try_get::<Option<serde_json::Value>, _>(i)
                    .map_err(de)?
                    .map(Value::Json),
                other => {
                    return Err(Error::Deserialize(format!(
                        "unsupported column type {} for `{}`",
                        other,
                        column.name()
                    )));
                }
            };
            record.insert(column.name(), value.unwrap_or_default());
        }

        Ok(record)
    }
}

#[async_trait]
impl Adapter for PostgresAdapter {
    async fn fetch(&self, query: &Query) -> Result<Vec<Record>, Error> {
        let stmt = sql::select(query, Dialect::Postgres);
        let rows = Self::query_bind_values(sqlx::query(&stmt.sql), &stmt.binds)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::map_row_to_record).collect()
    }

    async fn count(&self, query: &Query) -> Result<u64, Error> {
        let stmt = sql::count(query, Dialect::Postgres);
        let row = Self::query_bind_values(sqlx::query(&stmt.sql), &stmt.binds)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row
            .try_get("count")
            .map_err(|e| Error::Deserialize(e.to_string()))?;
        Ok(count as u64)
    }
}
