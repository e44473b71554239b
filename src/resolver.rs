use std::collections::HashMap;

use crate::expr::Expr;

/// Maps an engine-level column expression to the property path used to read
/// its value back out of a fetched [`Record`](crate::Record).
pub trait PropertyResolver: Send + Sync + 'static {
    fn property(&self, column: &Expr) -> Option<String>;
}

/// Strips table qualifiers and joins JSON paths with dots:
/// `movies.title` → `title`, `movies.data:{a,b}` → `data.a.b`.
/// Computed expressions resolve through their first column.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl DefaultResolver {
    fn unqualified(column: &str) -> &str {
        column.rsplit('.').next().unwrap_or(column)
    }
}

impl PropertyResolver for DefaultResolver {
    fn property(&self, column: &Expr) -> Option<String> {
        match column.first_column()? {
            Expr::Column(name) => Some(Self::unqualified(name).to_string()),
            Expr::JsonPath { column, path } => {
                let mut prop = Self::unqualified(column).to_string();
                for segment in path {
                    prop.push('.');
                    prop.push_str(segment);
                }
                Some(prop)
            }
            _ => None,
        }
    }
}

/// Explicit column → property overrides, falling back to [`DefaultResolver`].
#[derive(Debug, Clone, Default)]
pub struct MappedResolver {
    overrides: HashMap<String, String>,
}

impl MappedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, column: impl Into<String>, property: impl Into<String>) -> Self {
        self.overrides.insert(column.into(), property.into());
        self
    }
}

impl PropertyResolver for MappedResolver {
    fn property(&self, column: &Expr) -> Option<String> {
        if let Some(Expr::Column(name)) = column.first_column() {
            if let Some(prop) = self.overrides.get(name) {
                return Some(prop.clone());
            }
        }
        DefaultResolver.property(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_default_resolver() {
        let r = DefaultResolver;
        assert_eq!(r.property(&Expr::column("movies.title")), Some("title".into()));
        assert_eq!(r.property(&Expr::column("id")), Some("id".into()));
        assert_eq!(
            r.property(&Expr::json_path("movies.data", ["author", "name"])),
            Some("data.author.name".into())
        );
        assert_eq!(
            r.property(&Expr::coalesce("alt_title", vec![Value::Null])),
            Some("alt_title".into())
        );
        assert_eq!(r.property(&Expr::literal(1i64)), None);
    }

    #[test]
    fn test_mapped_resolver_override() {
        let r = MappedResolver::new().map("created_at", "createdAt");
        assert_eq!(r.property(&Expr::column("created_at")), Some("createdAt".into()));
        assert_eq!(r.property(&Expr::column("movies.id")), Some("id".into()));
    }
}
