use std::{fmt, sync::Arc};

use crate::{
    error::Error,
    expr::{Comparison, Expr},
    record::Record,
    resolver::PropertyResolver,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }

    /// Operator selecting rows strictly after a boundary in this direction.
    pub fn comparison(self) -> Comparison {
        match self {
            Direction::Asc => Comparison::GreaterThan,
            Direction::Desc => Comparison::LessThan,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

pub type Transform = Arc<dyn Fn(&Value) -> Expr + Send + Sync>;

/// One column of the sort order.
#[derive(Clone)]
pub struct OrderingRule {
    pub column: Expr,
    pub direction: Direction,
    property: Option<String>,
    transform: Option<Transform>,
}

impl OrderingRule {
    pub fn new(column: impl Into<Expr>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction,
            property: None,
            transform: None,
        }
    }

    pub fn asc(column: impl Into<Expr>) -> Self {
        Self::new(column, Direction::Asc)
    }

    pub fn desc(column: impl Into<Expr>) -> Self {
        Self::new(column, Direction::Desc)
    }

    /// Property path the sort value is read from, overriding the resolver.
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Maps a boundary value to the expression compared against `column`.
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Value) -> Expr + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    pub fn value_of(&self, record: &Record) -> Value {
        match &self.property {
            Some(prop) => record.get_path(prop),
            None => Value::Null,
        }
    }

    pub fn compare_value(&self, value: &Value) -> Expr {
        match &self.transform {
            Some(transform) => transform(value),
            None => self.column.with_value(value),
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            direction: self.direction.reversed(),
            ..self.clone()
        }
    }

    fn resolve(&self, resolver: &dyn PropertyResolver) -> Result<Self, Error> {
        if self.property.is_some() {
            return Ok(self.clone());
        }

        let property = resolver.property(&self.column).ok_or_else(|| {
            Error::InvalidOrdering(format!("cannot resolve a property for `{}`", self.column))
        })?;

        Ok(Self {
            property: Some(property),
            ..self.clone()
        })
    }
}

impl fmt::Debug for OrderingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderingRule")
            .field("column", &self.column)
            .field("direction", &self.direction)
            .field("property", &self.property)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// One row's position in the sort order, one value per rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeysetTuple(pub Vec<Value>);

impl KeysetTuple {
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for KeysetTuple {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// The declared multi-column sort order of a query.
#[derive(Debug, Clone, Default)]
pub struct OrderingSpec {
    rules: Vec<OrderingRule>,
}

impl OrderingSpec {
    pub fn new(rules: Vec<OrderingRule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: OrderingRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[OrderingRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every rule flipped, for backward traversal.
    pub fn reversed(&self) -> Self {
        Self {
            rules: self.rules.iter().map(OrderingRule::reversed).collect(),
        }
    }

    /// Fills in missing properties and checks the ordering can be paginated.
    pub fn resolved(&self, resolver: &dyn PropertyResolver) -> Result<Self, Error> {
        if self.rules.is_empty() {
            return Err(Error::InvalidOrdering(
                "cursor pagination requires at least one ordering rule".into(),
            ));
        }

        let rules = self
            .rules
            .iter()
            .map(|rule| rule.resolve(resolver))
            .collect::<Result<Vec<_>, _>>()?;

        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.property == rule.property) {
                return Err(Error::InvalidOrdering(format!(
                    "property `{}` is ordered more than once",
                    rule.property().unwrap_or_default()
                )));
            }
        }

        Ok(Self { rules })
    }

    pub fn tuple_of(&self, record: &Record) -> KeysetTuple {
        KeysetTuple(self.rules.iter().map(|r| r.value_of(record)).collect())
    }

    /// Short stable digest of the declared columns and directions.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for rule in &self.rules {
            hasher.update(rule.column.to_string().as_bytes());
            hasher.update(b"\0");
            hasher.update(rule.direction.as_sql().as_bytes());
            hasher.update(b"\0");
            hasher.update(rule.property().unwrap_or_default().as_bytes());
            hasher.update(b"\x1e");
        }
        hasher.finalize().to_hex()[..16].to_string()
    }
}

impl From<Vec<OrderingRule>> for OrderingSpec {
    fn from(rules: Vec<OrderingRule>) -> Self {
        Self::new(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DefaultResolver;

    #[test]
    fn test_resolved_fills_properties() {
        let spec = OrderingSpec::new(vec![
            OrderingRule::asc("movies.title"),
            OrderingRule::desc("id").with_property("key"),
        ])
        .resolved(&DefaultResolver)
        .unwrap();

        assert_eq!(spec.rules()[0].property(), Some("title"));
        assert_eq!(spec.rules()[1].property(), Some("key"));
    }

    #[test]
    fn test_resolved_rejects_empty_and_duplicates() {
        assert!(matches!(
            OrderingSpec::default().resolved(&DefaultResolver),
            Err(Error::InvalidOrdering(_))
        ));
        assert!(matches!(
            OrderingSpec::new(vec![OrderingRule::asc("a.id"), OrderingRule::desc("b.id")])
                .resolved(&DefaultResolver),
            Err(Error::InvalidOrdering(_))
        ));
    }

    #[test]
    fn test_reversed_flips_every_rule() {
        let spec = OrderingSpec::new(vec![OrderingRule::asc("a"), OrderingRule::desc("b")]);
        let dirs: Vec<_> = spec.reversed().rules().iter().map(|r| r.direction).collect();
        assert_eq!(dirs, vec![Direction::Desc, Direction::Asc]);
    }

    #[test]
    fn test_fingerprint_tracks_direction() {
        let asc = OrderingSpec::new(vec![OrderingRule::asc("id")]);
        let desc = OrderingSpec::new(vec![OrderingRule::desc("id")]);
        assert_eq!(asc.fingerprint(), asc.clone().fingerprint());
        assert_ne!(asc.fingerprint(), desc.fingerprint());
        assert_eq!(asc.fingerprint().len(), 16);
    }

    #[test]
    fn test_custom_transform() {
        let rule = OrderingRule::asc(Expr::lower(Expr::column("title")))
            .with_transform(|v| Expr::lower(Expr::Literal(v.clone())));
        assert_eq!(
            rule.compare_value(&Value::String("Ab".into())),
            Expr::lower(Expr::Literal(Value::String("Ab".into())))
        );
    }
}
