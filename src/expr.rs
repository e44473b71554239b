//! Engine-level expressions and the boolean predicate tree handed to adapters.

use std::fmt;

use crate::value::{ToValue, Value};

/// A scalar expression the query engine can evaluate per row.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference, optionally table-qualified (`movies.title`).
    Column(String),
    /// Text extracted from a JSON column along a key path.
    JsonPath { column: String, path: Vec<String> },
    Literal(Value),
    /// First non-null argument.
    Coalesce(Vec<Expr>),
    Lower(Box<Expr>),
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn literal(value: impl ToValue) -> Self {
        Expr::Literal(value.to_value())
    }

    pub fn json_path<S: Into<String>>(column: impl Into<String>, path: impl IntoIterator<Item = S>) -> Self {
        Expr::JsonPath {
            column: column.into(),
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    /// `COALESCE(column, fallbacks...)`
    pub fn coalesce(column: impl Into<String>, fallbacks: Vec<Value>) -> Self {
        let mut args = vec![Expr::Column(column.into())];
        args.extend(fallbacks.into_iter().map(Expr::Literal));
        Expr::Coalesce(args)
    }

    pub fn lower(inner: Expr) -> Self {
        Expr::Lower(Box::new(inner))
    }

    /// Replaces the first column reference with `value`, producing the
    /// expression a boundary value has to go through to be comparable with
    /// this one. A bare column becomes the literal itself.
    pub fn with_value(&self, value: &Value) -> Expr {
        let mut replaced = false;
        self.substitute(value, &mut replaced)
    }

    fn substitute(&self, value: &Value, replaced: &mut bool) -> Expr {
        match self {
            Expr::Column(_) | Expr::JsonPath { .. } if !*replaced => {
                *replaced = true;
                Expr::Literal(value.clone())
            }
            Expr::Coalesce(args) => {
                Expr::Coalesce(args.iter().map(|a| a.substitute(value, replaced)).collect())
            }
            Expr::Lower(inner) => Expr::Lower(Box::new(inner.substitute(value, replaced))),
            other => other.clone(),
        }
    }

    /// The first column reference inside this expression, if any.
    pub fn first_column(&self) -> Option<&Expr> {
        match self {
            Expr::Column(_) | Expr::JsonPath { .. } => Some(self),
            Expr::Coalesce(args) => args.iter().find_map(Expr::first_column),
            Expr::Lower(inner) => inner.first_column(),
            Expr::Literal(_) => None,
        }
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::Column(name.to_string())
    }
}

impl From<String> for Expr {
    fn from(name: String) -> Self {
        Expr::Column(name)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{}", name),
            Expr::JsonPath { column, path } => write!(f, "{}:{}", column, path.join(".")),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Coalesce(args) => {
                write!(f, "coalesce(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Lower(inner) => write!(f, "lower({})", inner),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Comparison {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Comparison::Equal => "=",
            Comparison::NotEqual => "<>",
            Comparison::GreaterThan => ">",
            Comparison::GreaterThanOrEqual => ">=",
            Comparison::LessThan => "<",
            Comparison::LessThanOrEqual => "<=",
        }
    }
}

/// Immutable boolean filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Always,
    /// Matches nothing. Used as the edge sentinel.
    Never,
    Compare {
        left: Expr,
        op: Comparison,
        right: Expr,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(left: Expr, op: Comparison, right: Expr) -> Self {
        Predicate::Compare { left, op, right }
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Predicate::compare(left, Comparison::Equal, right)
    }

    /// Conjunction of `parts`; a single part is returned as is.
    pub fn all(mut parts: Vec<Predicate>) -> Self {
        match parts.len() {
            0 => Predicate::Always,
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }

    pub fn any(mut parts: Vec<Predicate>) -> Self {
        match parts.len() {
            0 => Predicate::Never,
            1 => parts.remove(0),
            _ => Predicate::Or(parts),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Always => write!(f, "true"),
            Predicate::Never => write!(f, "false"),
            Predicate::Compare { left, op, right } => {
                write!(f, "{} {} {}", left, op.as_sql(), right)
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                let joiner = if matches!(self, Predicate::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                write!(f, "(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", joiner)?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
        }
    }
}
