// In-memory query engine.
//
// Predicates use SQL three-valued logic and ORDER BY follows PostgreSQL:
// NULLS LAST ascending, NULLS FIRST descending.
//
// JSON path values keep their JSON type here, so numeric leaves compare as
// numbers. PostgreSQL extracts them as text and compares them as text.
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::Adapter;
use crate::{
    error::Error,
    expr::{Comparison, Expr, Predicate},
    ordering::{Direction, OrderingRule},
    query::Query,
    record::Record,
    value::Value,
};

#[derive(Clone, Default)]
struct MemoryStore {
    tables: Arc<Mutex<HashMap<String, Vec<Record>>>>,
}

#[derive(Clone, Default)]
pub struct MemoryAdapter {
    store: MemoryStore,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, table: &str, record: Record) -> Result<(), Error> {
        self.insert_many(table, std::iter::once(record))
    }

    pub fn insert_many(
        &self,
        table: &str,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<(), Error> {
        let mut tables = self.lock()?;
        tables.entry(table.to_string()).or_default().extend(records);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Record>>>, Error> {
        self.store
            .tables
            .lock()
            .map_err(|e| Error::engine(format!("memory store poisoned: {}", e)))
    }

    fn matching(&self, query: &Query) -> Result<Vec<Record>, Error> {
        let tables = self.lock()?;
        let Some(rows) = tables.get(&query.source) else {
            return Ok(Vec::new());
        };

        let predicate = query.predicate();
        Ok(rows
            .iter()
            .filter(|row| eval_predicate(&predicate, row, &query.source) == Some(true))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn fetch(&self, query: &Query) -> Result<Vec<Record>, Error> {
        let mut rows = self.matching(query)?;
        let rules = query.ordering.rules();
        rows.sort_by(|a, b| compare_rows(rules, a, b, &query.source));

        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn count(&self, query: &Query) -> Result<u64, Error> {
        Ok(self.matching(query)?.len() as u64)
    }
}

fn column_value(record: &Record, column: &str, source: &str) -> Value {
    if let Some(value) = record.get(column) {
        return value.clone();
    }

    match column.split_once('.') {
        Some((table, name)) if table == source => {
            record.get(name).cloned().unwrap_or_default()
        }
        _ => Value::Null,
    }
}

fn eval_expr(expr: &Expr, record: &Record, source: &str) -> Value {
    match expr {
        Expr::Column(name) => column_value(record, name, source),
        Expr::JsonPath { column, path } => {
            let Value::Json(mut current) = column_value(record, column, source) else {
                return Value::Null;
            };
            for segment in path {
                current = match current.get_mut(segment.as_str()) {
                    Some(next) => next.take(),
                    None => return Value::Null,
                };
            }
            Value::from_json(&current)
        }
        Expr::Literal(value) => value.clone(),
        Expr::Coalesce(args) => args
            .iter()
            .map(|arg| eval_expr(arg, record, source))
            .find(|v| !v.is_null())
            .unwrap_or_default(),
        Expr::Lower(inner) => match eval_expr(inner, record, source) {
            Value::String(s) => Value::String(s.to_lowercase()),
            other => other,
        },
    }
}

/// `None` is SQL's UNKNOWN.
fn eval_predicate(predicate: &Predicate, record: &Record, source: &str) -> Option<bool> {
    match predicate {
        Predicate::Always => Some(true),
        Predicate::Never => Some(false),
        Predicate::Compare { left, op, right } => {
            let lhs = eval_expr(left, record, source);

            // `= NULL` / `<> NULL` literals mean IS NULL / IS NOT NULL.
            if matches!(right, Expr::Literal(Value::Null)) {
                match op {
                    Comparison::Equal => return Some(lhs.is_null()),
                    Comparison::NotEqual => return Some(!lhs.is_null()),
                    _ => {}
                }
            }

            let rhs = eval_expr(right, record, source);
            let ordering = lhs.sql_cmp(&rhs)?;
            Some(match op {
                Comparison::Equal => ordering == Ordering::Equal,
                Comparison::NotEqual => ordering != Ordering::Equal,
                Comparison::GreaterThan => ordering == Ordering::Greater,
                Comparison::GreaterThanOrEqual => ordering != Ordering::Less,
                Comparison::LessThan => ordering == Ordering::Less,
                Comparison::LessThanOrEqual => ordering != Ordering::Greater,
            })
        }
        Predicate::And(parts) => {
            let mut unknown = false;
            for part in parts {
                match eval_predicate(part, record, source) {
                    Some(false) => return Some(false),
                    None => unknown = true,
                    Some(true) => {}
                }
            }
            if unknown { None } else { Some(true) }
        }
        Predicate::Or(parts) => {
            let mut unknown = false;
            for part in parts {
                match eval_predicate(part, record, source) {
                    Some(true) => return Some(true),
                    None => unknown = true,
                    Some(false) => {}
                }
            }
            if unknown { None } else { Some(false) }
        }
    }
}

fn compare_rows(rules: &[OrderingRule], a: &Record, b: &Record, source: &str) -> Ordering {
    for rule in rules {
        let left = eval_expr(&rule.column, a, source);
        let right = eval_expr(&rule.column, b, source);

        let ascending = match (&left, &right) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            _ => left.sql_cmp(&right).unwrap_or(Ordering::Equal),
        };

        let ordering = match rule.direction {
            Direction::Asc => ascending,
            Direction::Desc => ascending.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
