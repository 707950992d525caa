use super::*;
use crate::{
    db::query::builder::FieldPath,
    test_support::{Asset, Project, Sequence, Shot},
    traits::EntityKind,
    value::{EntityRef, Value},
};
use proptest::prelude::*;
use std::collections::HashMap;
use time::macros::{date, datetime};

///
/// MapRow
/// Row keyed by dotted field name.
///

#[derive(Default)]
struct MapRow(HashMap<String, Value>);

impl MapRow {
    fn with(mut self, field: &FieldPath, value: impl Into<Value>) -> Self {
        self.0.insert(field.name(), value.into());
        self
    }
}

impl Row for MapRow {
    fn field(&self, path: &FieldPath) -> FieldPresence {
        self.0
            .get(&path.name())
            .cloned()
            .map_or(FieldPresence::Missing, FieldPresence::Present)
    }
}

fn leaf(pred: &Predicate) -> &ComparePredicate {
    match pred {
        Predicate::Compare(cmp) => cmp,
        other => panic!("expected a leaf, got {other:?}"),
    }
}

fn cut_in(n: i64) -> Predicate {
    Shot::CUT_IN.eq(n)
}

// ----------------------------------------------------------------------
// Construction
// ----------------------------------------------------------------------

#[test]
fn typed_builders_pick_the_wire_operator() {
    let cases = [
        (Shot::CODE.eq("sh010"), "is"),
        (Shot::CODE.ne("sh010"), "is_not"),
        (Shot::CODE.contains("010"), "contains"),
        (Shot::CODE.starts_with("sh"), "start_with"),
        (Shot::CODE.ends_with("0"), "end_with"),
        (Shot::CUT_IN.gt(10), "greater_than"),
        (Shot::CUT_IN.lt(10), "less_than"),
        (Shot::CUT_IN.between(Some(1), None), "between"),
        (Shot::CUT_IN.is_in([1, 2]), "in"),
        (Shot::STATUS.is_not_in(["fin"]), "not_in"),
        (Shot::DUE.in_last(2, DateUnit::Day), "in_last"),
        (Shot::UPDATED_AT.in_calendar_week(0), "in_calendar_week"),
        (Shot::THUMBNAIL.exists(), "is_not"),
        (Shot::THUMBNAIL.not_exists(), "is"),
        (Shot::ENTITY.type_is::<Asset>(), "type_is"),
        (Shot::PROJECT.name_contains("demo"), "name_contains"),
    ];

    for (pred, op) in cases {
        assert_eq!(leaf(&pred).op.to_string(), op, "{pred:?}");
    }
}

#[test]
fn operand_shapes_follow_the_operator() {
    assert_eq!(
        leaf(&Shot::DUE.in_next(3, DateUnit::Week)).value,
        Value::List(vec![Value::Int(3), Value::Text("WEEK".into())])
    );
    assert_eq!(
        leaf(&Shot::CUT_IN.between(None, Some(20))).value,
        Value::List(vec![Value::Null, Value::Int(20)])
    );
    assert_eq!(
        leaf(&Shot::ENTITY.type_is_not::<Sequence>()).value,
        Value::Text("Sequence".into())
    );
    assert_eq!(leaf(&Shot::THUMBNAIL.exists()).value, Value::Null);
}

#[test]
fn untyped_construction_checks_operator_support() {
    let path = FieldPath::of(Shot::MODEL, "cut_in").unwrap();
    let err = ComparePredicate::new(path, Operator::Contains, "10").unwrap_err();

    assert!(matches!(err, QueryError::UnsupportedOperator { op: Operator::Contains, .. }));
}

#[test]
fn untyped_construction_checks_operand_shape() {
    let path = FieldPath::of(Shot::MODEL, "cut_in").unwrap();

    let err = ComparePredicate::new(path.clone(), Operator::Between, 10).unwrap_err();
    assert!(matches!(err, QueryError::InvalidOperand { found: "int", .. }), "{err:?}");

    let err = ComparePredicate::new(path.clone(), Operator::Is, "ten").unwrap_err();
    assert!(matches!(err, QueryError::InvalidOperand { .. }));

    let ok = ComparePredicate::new(path, Operator::In, vec![1, 2]).unwrap();
    assert_eq!(ok.value, Value::List(vec![Value::Int(1), Value::Int(2)]));
}

#[test]
fn relative_date_operand_needs_a_known_unit() {
    let path = FieldPath::of(Shot::MODEL, "due").unwrap();
    let bad = Value::List(vec![Value::Int(1), Value::Text("FORTNIGHT".into())]);

    assert!(ComparePredicate::new(path.clone(), Operator::InLast, bad).is_err());
    assert!(ComparePredicate::new(path, Operator::InCalendarDay, 0).is_ok());
}

#[test]
fn relation_operators_are_rejected_on_scalars() {
    let path = FieldPath::of(Shot::MODEL, "code").unwrap();

    assert!(ComparePredicate::new(path, Operator::TypeIs, "Asset").is_err());
}

// ----------------------------------------------------------------------
// Combination
// ----------------------------------------------------------------------

#[test]
fn combining_nests_mixed_operators() {
    let (a, b, c) = (cut_in(1), cut_in(2), cut_in(3));

    assert_eq!(
        (a.clone() & b.clone()) | c.clone(),
        Predicate::Any(vec![Predicate::All(vec![a.clone(), b.clone()]), c.clone()])
    );
    assert_eq!(
        a.clone() & (b.clone() | c.clone()),
        Predicate::All(vec![a, Predicate::Any(vec![b, c])])
    );
}

#[test]
fn by_ref_combination_matches_owned() {
    let (a, b) = (cut_in(1), cut_in(2));

    assert_eq!(&a & &b, a.clone() & b.clone());
    assert_eq!(&a | &b, a | b);
}

#[test]
fn leaves_are_visited_depth_first() {
    let pred = (cut_in(1) | cut_in(2)) & cut_in(3);
    let values: Vec<_> = pred.leaves().map(|cmp| cmp.value.clone()).collect();

    assert_eq!(values, [Value::Int(1), Value::Int(2), Value::Int(3)]);
    assert_eq!(pred.logical_operator(), Some(LogicalOperator::All));
}

proptest! {
    #[test]
    fn and_is_associative(a in any::<i64>(), b in any::<i64>(), c in any::<i64>()) {
        let (a, b, c) = (cut_in(a), cut_in(b), cut_in(c));

        let left = (a.clone() & b.clone()) & c.clone();
        let right = a.clone() & (b.clone() & c.clone());

        prop_assert_eq!(&left, &right);
        prop_assert_eq!(left, Predicate::and([a, b, c]));
    }

    #[test]
    fn or_is_associative(a in any::<i64>(), b in any::<i64>(), c in any::<i64>()) {
        let (a, b, c) = (cut_in(a), cut_in(b), cut_in(c));

        let left = (a.clone() | b.clone()) | c.clone();
        let right = a.clone() | (b.clone() | c.clone());

        prop_assert_eq!(&left, &right);
        prop_assert_eq!(left, Predicate::or([a, b, c]));
    }

    #[test]
    fn folding_keeps_every_leaf(values in prop::collection::vec(any::<i64>(), 1..12)) {
        let preds: Vec<_> = values.iter().copied().map(cut_in).collect();
        let folded = preds.iter().skip(1).fold(preds[0].clone(), |acc, p| acc & p.clone());

        let leaves: Vec<_> = folded.leaves().map(|cmp| cmp.value.clone()).collect();
        let expected: Vec<_> = values.into_iter().map(Value::Int).collect();
        prop_assert_eq!(leaves, expected);
    }
}

// ----------------------------------------------------------------------
// Evaluation
// ----------------------------------------------------------------------

#[test]
fn scalar_comparisons() {
    let row = MapRow::default()
        .with(Shot::CUT_IN.path(), 1001)
        .with(Shot::CODE.path(), "SH010_comp");

    assert!(eval(&row, &Shot::CUT_IN.eq(1001)));
    assert!(eval(&row, &Shot::CUT_IN.gt(1000)));
    assert!(!eval(&row, &Shot::CUT_IN.lt(1000)));
    assert!(eval(&row, &Shot::CUT_IN.is_in([1, 1001])));
    assert!(eval(&row, &Shot::CUT_IN.is_not_in([1, 2])));
    assert!(eval(&row, &Shot::CODE.contains("010")));
    assert!(eval(&row, &Shot::CODE.starts_with("sh")));
    assert!(eval(&row, &Shot::CODE.ends_with("COMP")));
    assert!(eval(&row, &Shot::CODE.not_contains("lighting")));
}

#[test]
fn between_treats_null_bounds_as_open() {
    let row = MapRow::default().with(Shot::CUT_IN.path(), 50);

    assert!(eval(&row, &Shot::CUT_IN.between(Some(10), None)));
    assert!(eval(&row, &Shot::CUT_IN.between(None, Some(50))));
    assert!(!eval(&row, &Shot::CUT_IN.between(Some(51), Some(60))));
    assert!(eval(&row, &Shot::CUT_IN.not_between(Some(51), Some(60))));

    let null = MapRow::default().with(Shot::CUT_IN.path(), Value::Null);
    assert!(!eval(&null, &Shot::CUT_IN.between(None, None)));
    assert!(!eval(&null, &Shot::CUT_IN.not_between(Some(1), Some(2))));
}

#[test]
fn null_checks() {
    let row = MapRow::default()
        .with(Shot::DESCRIPTION.path(), Value::Null)
        .with(Shot::TASKS.path(), Value::List(Vec::new()));

    assert!(eval(&row, &Shot::DESCRIPTION.is_null()));
    assert!(!eval(&row, &Shot::DESCRIPTION.is_not_null()));
    assert!(eval(&row, &Shot::TASKS.is_null()));
}

#[test]
fn multi_entity_is_matches_any_element() {
    let tasks = Value::List(vec![
        Value::Entity(EntityRef::new("Task", 1)),
        Value::Entity(EntityRef::new("Task", 2)),
    ]);
    let row = MapRow::default().with(Shot::TASKS.path(), tasks);

    assert!(eval(&row, &Shot::TASKS.eq(EntityRef::new("Task", 2))));
    assert!(!eval(&row, &Shot::TASKS.eq(EntityRef::new("Task", 3))));
    assert!(eval(&row, &Shot::TASKS.ne(EntityRef::new("Task", 3))));
}

#[test]
fn relation_type_and_name_operators() {
    let hero = EntityRef::new("Asset", 1).with_name("Hero");
    let row = MapRow::default()
        .with(Shot::ENTITY.path(), hero)
        .with(Shot::PROJECT.path(), Value::Null);

    assert!(eval(&row, &Shot::ENTITY.type_is::<Asset>()));
    assert!(eval(&row, &Shot::ENTITY.type_is_not::<Sequence>()));
    assert!(eval(&row, &Shot::ENTITY.name_is("hero")));
    assert!(eval(&row, &Shot::ENTITY.name_contains("ER")));
    assert!(eval(&row, &Shot::ENTITY.name_not_contains("villain")));
    assert!(!eval(&row, &Shot::PROJECT.type_is::<Project>()));
}

#[test]
fn missing_fields_never_match() {
    let row = MapRow::default();

    assert!(!eval(&row, &Shot::CODE.eq("x")));
    assert!(!eval(&row, &Shot::CODE.ne("x")));
    assert!(!eval(&row, &Shot::CODE.is_null()));
}

#[test]
fn groups_evaluate_all_and_any() {
    let row = MapRow::default().with(Shot::CUT_IN.path(), 5);

    assert!(eval(&row, &(cut_in(5) | cut_in(6))));
    assert!(!eval(&row, &(cut_in(5) & cut_in(6))));
    assert!(eval(&row, &Predicate::and([])));
    assert!(!eval(&row, &Predicate::or([])));
}

#[test]
fn relative_windows_use_the_given_clock() {
    let now = datetime!(2024-03-15 12:00 UTC);
    let row = MapRow::default()
        .with(Shot::UPDATED_AT.path(), datetime!(2024-03-14 18:00 UTC))
        .with(Shot::DUE.path(), date!(2024 - 03 - 20));

    let at = |pred: &Predicate| eval_at(&row, pred, now);

    assert!(at(&Shot::UPDATED_AT.in_last(1, DateUnit::Day)));
    assert!(!at(&Shot::UPDATED_AT.in_last(2, DateUnit::Hour)));
    assert!(at(&Shot::UPDATED_AT.not_in_last(2, DateUnit::Hour)));
    assert!(at(&Shot::DUE.in_next(1, DateUnit::Week)));
    assert!(!at(&Shot::DUE.in_next(2, DateUnit::Day)));
    assert!(at(&Shot::DUE.not_in_next(2, DateUnit::Day)));
}

#[test]
fn calendar_offsets_are_relative_to_today() {
    // 2024-03-15 is a Friday.
    let now = datetime!(2024-03-15 08:00 UTC);
    let row = MapRow::default()
        .with(Shot::DUE.path(), date!(2024 - 03 - 11))
        .with(Shot::UPDATED_AT.path(), datetime!(2024-03-14 23:30 UTC));

    let at = |pred: &Predicate| eval_at(&row, pred, now);

    assert!(at(&Shot::UPDATED_AT.in_calendar_day(-1)));
    assert!(!at(&Shot::UPDATED_AT.in_calendar_day(0)));
    assert!(at(&Shot::DUE.in_calendar_week(0)));
    assert!(!at(&Shot::DUE.in_calendar_week(-1)));
    assert!(at(&Shot::DUE.in_calendar_month(0)));
    assert!(at(&Shot::DUE.in_calendar_year(0)));
    assert!(!at(&Shot::DUE.in_calendar_year(1)));
}
