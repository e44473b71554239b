//! Keyset predicate construction.
//!
//! For rules `[c0, c1, c2]` (all ascending) and boundary `(v0, v1, v2)` the
//! filter selecting rows strictly after the boundary is
//!
//! ```text
//! c0 > v0
//!   OR (c0 = v0 AND (c1 > v1
//!         OR (c0 = v0 AND c1 = v1 AND c2 > v2)))
//! ```
//!
//! Descending rules use `<`. Comparisons and equality against NULL follow the
//! engine: equality with a NULL literal is rendered as `IS NULL`.

use crate::{
    error::Error,
    expr::{Comparison, Expr, Predicate},
    ordering::{KeysetTuple, OrderingRule},
    value::Value,
};

/// Builds the predicate selecting rows strictly after `boundary` under
/// `rules`. Rules must already be flipped for backward traversal.
///
/// Returns `None` when there is no boundary (first page).
pub fn build_predicate(
    rules: &[OrderingRule],
    boundary: Option<&KeysetTuple>,
) -> Result<Option<Predicate>, Error> {
    let Some(boundary) = boundary else {
        return Ok(None);
    };

    if boundary.len() != rules.len() {
        return Err(Error::invalid_cursor(format!(
            "expected {} values, found {}",
            rules.len(),
            boundary.len()
        )));
    }

    if rules.is_empty() {
        return Ok(Some(Predicate::Never));
    }

    let compared: Vec<Expr> = rules
        .iter()
        .zip(boundary.values())
        .map(|(rule, value)| rule.compare_value(value))
        .collect();

    // Edge sentinel: nothing lies beyond a bare NULL single-column boundary.
    // A transformed NULL such as `COALESCE(NULL, '')` is still comparable.
    if let [Expr::Literal(Value::Null)] = compared.as_slice() {
        return Ok(Some(Predicate::Never));
    }

    Ok(Some(match_from(rules, &compared, 0)))
}

fn match_from(rules: &[OrderingRule], compared: &[Expr], i: usize) -> Predicate {
    let rule = &rules[i];
    let strictly_after = Predicate::compare(
        rule.column.clone(),
        rule.direction.comparison(),
        compared[i].clone(),
    );

    if i + 1 == rules.len() {
        return strictly_after;
    }

    let mut tie = equal_through(rules, compared, i);
    tie.push(match_from(rules, compared, i + 1));

    Predicate::Or(vec![strictly_after, Predicate::And(tie)])
}

fn equal_through(rules: &[OrderingRule], compared: &[Expr], i: usize) -> Vec<Predicate> {
    rules[..=i]
        .iter()
        .zip(compared)
        .map(|(rule, value)| Predicate::compare(rule.column.clone(), Comparison::Equal, value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::OrderingSpec;

    fn lit(v: i64) -> Expr {
        Expr::Literal(Value::Int(v))
    }

    #[test]
    fn test_no_boundary_no_predicate() {
        let rules = vec![OrderingRule::asc("id")];
        assert_eq!(build_predicate(&rules, None).unwrap(), None);
    }

    #[test]
    fn test_single_rule_directions() {
        let boundary = KeysetTuple(vec![Value::Int(5)]);

        let asc = build_predicate(&[OrderingRule::asc("id")], Some(&boundary)).unwrap();
        assert_eq!(
            asc,
            Some(Predicate::compare(Expr::column("id"), Comparison::GreaterThan, lit(5)))
        );

        let desc = build_predicate(&[OrderingRule::desc("id")], Some(&boundary)).unwrap();
        assert_eq!(
            desc,
            Some(Predicate::compare(Expr::column("id"), Comparison::LessThan, lit(5)))
        );
    }

    #[test]
    fn test_multi_column_tree() {
        let rules = vec![
            OrderingRule::asc("a"),
            OrderingRule::desc("b"),
            OrderingRule::asc("c"),
        ];
        let boundary = KeysetTuple(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let predicate = build_predicate(&rules, Some(&boundary)).unwrap().unwrap();

        let a = || Expr::column("a");
        let b = || Expr::column("b");
        let c = || Expr::column("c");
        let expected = Predicate::Or(vec![
            Predicate::compare(a(), Comparison::GreaterThan, lit(1)),
            Predicate::And(vec![
                Predicate::eq(a(), lit(1)),
                Predicate::Or(vec![
                    Predicate::compare(b(), Comparison::LessThan, lit(2)),
                    Predicate::And(vec![
                        Predicate::eq(a(), lit(1)),
                        Predicate::eq(b(), lit(2)),
                        Predicate::compare(c(), Comparison::GreaterThan, lit(3)),
                    ]),
                ]),
            ]),
        ]);
        assert_eq!(predicate, expected);
    }

    #[test]
    fn test_backward_flips_operators() {
        let spec = OrderingSpec::new(vec![OrderingRule::asc("id")]).reversed();
        let predicate = build_predicate(spec.rules(), Some(&KeysetTuple(vec![Value::Int(9)])))
            .unwrap()
            .unwrap();
        assert_eq!(
            predicate,
            Predicate::compare(Expr::column("id"), Comparison::LessThan, lit(9))
        );
    }

    #[test]
    fn test_null_single_boundary_is_sentinel() {
        let predicate = build_predicate(
            &[OrderingRule::asc("title")],
            Some(&KeysetTuple(vec![Value::Null])),
        )
        .unwrap();
        assert_eq!(predicate, Some(Predicate::Never));
    }

    #[test]
    fn test_coalesced_null_single_boundary_is_compared() {
        let column = Expr::coalesce("title", vec![Value::String(String::new())]);
        let predicate = build_predicate(
            &[OrderingRule::asc(column.clone())],
            Some(&KeysetTuple(vec![Value::Null])),
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            predicate,
            Predicate::compare(
                column,
                Comparison::GreaterThan,
                Expr::Coalesce(vec![
                    Expr::Literal(Value::Null),
                    Expr::Literal(Value::String(String::new())),
                ]),
            )
        );
    }

    #[test]
    fn test_transform_to_literal_null_is_sentinel() {
        let rule = OrderingRule::asc(Expr::lower(Expr::column("title")))
            .with_transform(|_| Expr::Literal(Value::Null));
        let predicate = build_predicate(&[rule], Some(&KeysetTuple(vec![Value::String("a".into())])))
            .unwrap();
        assert_eq!(predicate, Some(Predicate::Never));
    }

    #[test]
    fn test_null_in_composite_is_compared() {
        let rules = vec![OrderingRule::asc("title"), OrderingRule::asc("id")];
        let predicate = build_predicate(
            &rules,
            Some(&KeysetTuple(vec![Value::Null, Value::Int(1)])),
        )
        .unwrap()
        .unwrap();
        assert_ne!(predicate, Predicate::Never);
    }

    #[test]
    fn test_coalesce_compares_transformed_value() {
        let column = Expr::coalesce("title", vec![Value::String(String::new())]);
        let rules = vec![OrderingRule::asc(column.clone())];
        let predicate = build_predicate(
            &rules,
            Some(&KeysetTuple(vec![Value::String("m".into())])),
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            predicate,
            Predicate::compare(
                column,
                Comparison::GreaterThan,
                Expr::Coalesce(vec![
                    Expr::Literal(Value::String("m".into())),
                    Expr::Literal(Value::String(String::new())),
                ]),
            )
        );
    }

    #[test]
    fn test_arity_mismatch() {
        let rules = vec![OrderingRule::asc("a"), OrderingRule::asc("b")];
        assert!(matches!(
            build_predicate(&rules, Some(&KeysetTuple(vec![Value::Int(1)]))),
            Err(Error::InvalidCursor(_))
        ));
    }
}
