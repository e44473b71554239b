use crate::{
    expr::{Comparison, Expr, Predicate},
    ordering::{Direction, OrderingRule, OrderingSpec},
    value::{ToValue, Value},
};

/// -----------------------------
/// Query plan (engine contract)
/// -----------------------------
///
/// Filters are ANDed together. Ordering is emitted as the engine's ORDER BY
/// and doubles as the keyset for pagination.
#[derive(Debug, Clone)]
pub struct Query {
    pub source: String,
    pub filters: Vec<Predicate>,
    pub ordering: OrderingSpec,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            filters: Vec::new(),
            ordering: OrderingSpec::default(),
            limit: None,
        }
    }

    pub fn filter(self, predicate: Predicate) -> Self {
        let mut consumed_self = self;
        consumed_self.filters.push(predicate);
        consumed_self
    }

    fn compare(self, column: impl Into<Expr>, comparison: Comparison, value: impl ToValue) -> Self {
        self.filter(Predicate::compare(
            column.into(),
            comparison,
            Expr::Literal(value.to_value()),
        ))
    }

    // Equality
    pub fn where_eq(self, column: impl Into<Expr>, value: impl ToValue) -> Self {
        self.compare(column, Comparison::Equal, value)
    }

    // Not Equal
    pub fn where_ne(self, column: impl Into<Expr>, value: impl ToValue) -> Self {
        self.compare(column, Comparison::NotEqual, value)
    }

    // Greater Than
    pub fn where_gt(self, column: impl Into<Expr>, value: impl ToValue) -> Self {
        self.compare(column, Comparison::GreaterThan, value)
    }

    // Greater Than or Equal
    pub fn where_gte(self, column: impl Into<Expr>, value: impl ToValue) -> Self {
        self.compare(column, Comparison::GreaterThanOrEqual, value)
    }

    // Less Than
    pub fn where_lt(self, column: impl Into<Expr>, value: impl ToValue) -> Self {
        self.compare(column, Comparison::LessThan, value)
    }

    // Less Than or Equal
    pub fn where_lte(self, column: impl Into<Expr>, value: impl ToValue) -> Self {
        self.compare(column, Comparison::LessThanOrEqual, value)
    }

    pub fn where_null(self, column: impl Into<Expr>) -> Self {
        self.compare(column, Comparison::Equal, Value::Null)
    }

    // Sorting
    pub fn order_by(self, column: impl Into<Expr>, direction: Direction) -> Self {
        self.order_by_rule(OrderingRule::new(column, direction))
    }

    pub fn order_by_asc(self, column: impl Into<Expr>) -> Self {
        self.order_by(column, Direction::Asc)
    }

    pub fn order_by_desc(self, column: impl Into<Expr>) -> Self {
        self.order_by(column, Direction::Desc)
    }

    /// Orders by `COALESCE(column, fallbacks...)`. Boundary values are
    /// coalesced with the same fallbacks before comparison.
    pub fn order_by_coalesce(
        self,
        column: impl Into<String>,
        direction: Direction,
        fallbacks: Vec<Value>,
    ) -> Self {
        self.order_by(Expr::coalesce(column, fallbacks), direction)
    }

    /// Orders by an arbitrary expression, with an explicit boundary transform
    /// and the property its value is read from.
    pub fn order_by_explicit<F>(
        self,
        column: Expr,
        direction: Direction,
        transform: F,
        property: impl Into<String>,
    ) -> Self
    where
        F: Fn(&Value) -> Expr + Send + Sync + 'static,
    {
        self.order_by_rule(
            OrderingRule::new(column, direction)
                .with_transform(transform)
                .with_property(property),
        )
    }

    pub fn order_by_rule(self, rule: OrderingRule) -> Self {
        let mut consumed_self = self;
        consumed_self.ordering.push(rule);
        consumed_self
    }

    pub fn limit(self, limit: u32) -> Self {
        let mut consumed_self = self;
        consumed_self.limit = Some(limit);
        consumed_self
    }

    pub fn set_ordering(&mut self, ordering: OrderingSpec) {
        self.ordering = ordering;
    }

    pub fn set_limit(&mut self, limit: u32) {
        self.limit = Some(limit);
    }

    pub fn has_limit(&self) -> bool {
        self.limit.is_some()
    }

    /// All filters as one predicate.
    pub fn predicate(&self) -> Predicate {
        Predicate::all(self.filters.clone())
    }
}
