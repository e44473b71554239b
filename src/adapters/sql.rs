// SQL rendering shared by the sqlx adapters.
use crate::{
    expr::{Comparison, Expr, Predicate},
    query::Query,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

/// A rendered statement and its parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<Value>,
}

/// `SELECT *` honouring filters, ordering and limit.
pub fn select(query: &Query, dialect: Dialect) -> Statement {
    let mut r = Renderer::new(dialect);
    r.sql.push_str("SELECT * FROM ");
    r.ident(&query.source);
    r.where_clause(query);

    let rules = query.ordering.rules();
    if !rules.is_empty() {
        r.sql.push_str(" ORDER BY ");
        for (i, rule) in rules.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            r.expr(&rule.column);
            r.sql.push(' ');
            r.sql.push_str(rule.direction.as_sql());
        }
    }

    if let Some(limit) = query.limit {
        r.sql.push_str(&format!(" LIMIT {}", limit));
    }

    r.finish()
}

/// `SELECT COUNT(*)` honouring filters only.
pub fn count(query: &Query, dialect: Dialect) -> Statement {
    let mut r = Renderer::new(dialect);
    r.sql.push_str("SELECT COUNT(*) AS \"count\" FROM ");
    r.ident(&query.source);
    r.where_clause(query);
    r.finish()
}

struct Renderer {
    dialect: Dialect,
    sql: String,
    binds: Vec<Value>,
    // Set while rendering a comparison against Postgres JSON text.
    text_operands: bool,
}

impl Renderer {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            binds: Vec::new(),
            text_operands: false,
        }
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            binds: self.binds,
        }
    }

    fn ident(&mut self, name: &str) {
        for (i, part) in name.split('.').enumerate() {
            if i > 0 {
                self.sql.push('.');
            }
            self.sql.push('"');
            self.sql.push_str(&part.replace('"', "\"\""));
            self.sql.push('"');
        }
    }

    fn bind(&mut self, value: Value) {
        // NULL is inlined so the engine never has to infer a parameter type for it.
        if value.is_null() {
            self.sql.push_str("NULL");
            return;
        }

        let value = if self.text_operands {
            as_json_text(value)
        } else {
            value
        };
        self.binds.push(value);
        match self.dialect {
            Dialect::Postgres => self.sql.push_str(&format!("${}", self.binds.len())),
            Dialect::Sqlite => self.sql.push('?'),
        }
    }

    fn where_clause(&mut self, query: &Query) {
        if query.filters.is_empty() {
            return;
        }
        self.sql.push_str(" WHERE ");
        self.predicate(&query.predicate());
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Column(name) => self.ident(name),
            Expr::JsonPath { column, path } => match self.dialect {
                Dialect::Postgres => {
                    self.sql.push_str("jsonb_extract_path_text(");
                    self.ident(column);
                    for segment in path {
                        self.sql.push_str(", ");
                        self.bind(Value::String(segment.clone()));
                    }
                    self.sql.push(')');
                }
                Dialect::Sqlite => {
                    self.sql.push_str("json_extract(");
                    self.ident(column);
                    self.sql.push_str(", ");
                    let mut json_path = String::from("$");
                    for segment in path {
                        json_path.push_str(&format!(".\"{}\"", segment.replace('"', "\\\"")));
                    }
                    self.bind(Value::String(json_path));
                    self.sql.push(')');
                }
            },
            Expr::Literal(value) => self.bind(value.clone()),
            Expr::Coalesce(args) => {
                self.sql.push_str("COALESCE(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.expr(arg);
                }
                self.sql.push(')');
            }
            Expr::Lower(inner) => {
                self.sql.push_str("LOWER(");
                self.expr(inner);
                self.sql.push(')');
            }
        }
    }

    fn predicate(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::Always => self.sql.push_str("1 = 1"),
            Predicate::Never => self.sql.push_str("1 = 0"),
            Predicate::Compare { left, op, right } => {
                let null_check = matches!(right, Expr::Literal(Value::Null));
                self.text_operands = self.dialect == Dialect::Postgres && has_json_path(left);
                self.expr(left);
                match (op, null_check) {
                    (Comparison::Equal, true) => self.sql.push_str(" IS NULL"),
                    (Comparison::NotEqual, true) => self.sql.push_str(" IS NOT NULL"),
                    _ => {
                        self.sql.push(' ');
                        self.sql.push_str(op.as_sql());
                        self.sql.push(' ');
                        self.expr(right);
                    }
                }
                self.text_operands = false;
            }
            Predicate::And(parts) if parts.is_empty() => self.sql.push_str("1 = 1"),
            Predicate::Or(parts) if parts.is_empty() => self.sql.push_str("1 = 0"),
            Predicate::And(parts) => self.group(parts, " AND "),
            Predicate::Or(parts) => self.group(parts, " OR "),
        }
    }

    fn group(&mut self, parts: &[Predicate], joiner: &str) {
        self.sql.push('(');
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(joiner);
            }
            self.predicate(part);
        }
        self.sql.push(')');
    }
}

fn has_json_path(expr: &Expr) -> bool {
    match expr {
        Expr::JsonPath { .. } => true,
        Expr::Coalesce(args) => args.iter().any(has_json_path),
        Expr::Lower(inner) => has_json_path(inner),
        Expr::Column(_) | Expr::Literal(_) => false,
    }
}

/// `jsonb_extract_path_text` yields text, so operands compared with it are
/// bound as the text Postgres prints for the same JSON scalar.
fn as_json_text(value: Value) -> Value {
    match value {
        Value::String(_) | Value::Null => value,
        other => match other.to_json() {
            serde_json::Value::String(s) => Value::String(s),
            json => Value::String(json.to_string()),
        },
    }
}
