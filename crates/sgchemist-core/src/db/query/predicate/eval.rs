//! In-memory predicate evaluation.
//!
//! Mirrors the remote filter semantics closely enough for an in-memory
//! engine. Text operators are case-insensitive; relative date operators are
//! evaluated against a caller-provided clock (`eval_at`) or the current UTC
//! time (`eval`). Months count as 30 days and years as 365 days.

use crate::{
    db::query::{
        builder::FieldPath,
        predicate::{ComparePredicate, DateUnit, Operator, Predicate},
    },
    value::Value,
};
use std::cmp::Ordering;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

///
/// FieldPresence
///
/// Result of resolving a field path against a row.
/// A path through a multi-entity relation resolves to a list of values.
///

#[derive(Clone, Debug, PartialEq)]
pub enum FieldPresence {
    Present(Value),
    Missing,
}

///
/// Row
///
/// Anything a predicate can be evaluated against.
///

pub trait Row {
    fn field(&self, path: &FieldPath) -> FieldPresence;
}

/// Evaluate a predicate against the current UTC time.
#[must_use]
pub fn eval<R: Row + ?Sized>(row: &R, predicate: &Predicate) -> bool {
    eval_at(row, predicate, OffsetDateTime::now_utc())
}

/// Evaluate a predicate; relative date operators use `now`.
#[must_use]
pub fn eval_at<R: Row + ?Sized>(row: &R, predicate: &Predicate, now: OffsetDateTime) -> bool {
    match predicate {
        Predicate::All(children) => children.iter().all(|p| eval_at(row, p, now)),
        Predicate::Any(children) => children.iter().any(|p| eval_at(row, p, now)),
        Predicate::Compare(cmp) => match row.field(&cmp.field) {
            FieldPresence::Present(actual) => eval_compare(&actual, cmp, now),
            FieldPresence::Missing => false,
        },
    }
}

fn eval_compare(actual: &Value, cmp: &ComparePredicate, now: OffsetDateTime) -> bool {
    let operand = &cmp.value;

    match cmp.op {
        Operator::Is => is(actual, operand),
        Operator::IsNot => !is(actual, operand),
        Operator::GreaterThan => actual.partial_order(operand) == Some(Ordering::Greater),
        Operator::LessThan => actual.partial_order(operand) == Some(Ordering::Less),
        Operator::Between => between(actual, operand),
        Operator::NotBetween => !actual.is_null() && !between(actual, operand),
        Operator::In => member(actual, operand),
        Operator::NotIn => !member(actual, operand),
        Operator::Contains => text(actual, operand, |a, b| a.contains(b)),
        Operator::NotContains => !text(actual, operand, |a, b| a.contains(b)),
        Operator::StartsWith => text(actual, operand, |a, b| a.starts_with(b)),
        Operator::EndsWith => text(actual, operand, |a, b| a.ends_with(b)),
        Operator::TypeIs => type_is(actual, operand),
        Operator::TypeIsNot => !type_is(actual, operand),
        Operator::NameIs => name(actual, operand, |a, b| a == b),
        Operator::NameContains => name(actual, operand, |a, b| a.contains(b)),
        Operator::NameNotContains => !name(actual, operand, |a, b| a.contains(b)),
        Operator::InLast => relative(actual, operand, now, false),
        Operator::NotInLast => !actual.is_null() && !relative(actual, operand, now, false),
        Operator::InNext => relative(actual, operand, now, true),
        Operator::NotInNext => !actual.is_null() && !relative(actual, operand, now, true),
        Operator::InCalendarDay
        | Operator::InCalendarWeek
        | Operator::InCalendarMonth
        | Operator::InCalendarYear => calendar(actual, cmp.op, operand, now),
    }
}

// Collections match when any element matches; null matches an empty collection.
fn is(actual: &Value, operand: &Value) -> bool {
    match actual {
        Value::List(items) if operand.is_null() => items.is_empty(),
        Value::List(items) => items.iter().any(|item| item.loose_eq(operand)),
        _ => actual.loose_eq(operand),
    }
}

fn member(actual: &Value, operand: &Value) -> bool {
    let Some(candidates) = operand.as_list() else {
        return false;
    };

    candidates.iter().any(|candidate| is(actual, candidate))
}

fn between(actual: &Value, operand: &Value) -> bool {
    let Some([low, high]) = operand.as_list() else {
        return false;
    };
    if actual.is_null() {
        return false;
    }

    let above = low.is_null()
        || matches!(actual.partial_order(low), Some(Ordering::Greater | Ordering::Equal));
    let below = high.is_null()
        || matches!(actual.partial_order(high), Some(Ordering::Less | Ordering::Equal));

    above && below
}

fn text(actual: &Value, operand: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (actual.as_text(), operand.as_text()) {
        (Some(a), Some(b)) => test(&a.to_lowercase(), &b.to_lowercase()),
        _ => false,
    }
}

fn type_is(actual: &Value, operand: &Value) -> bool {
    operand
        .as_text()
        .is_some_and(|t| actual.entities().any(|e| e.entity_type == t))
}

fn name(actual: &Value, operand: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    let Some(wanted) = operand.as_text().map(str::to_lowercase) else {
        return false;
    };

    actual
        .entities()
        .filter_map(|e| e.name.as_deref())
        .any(|n| test(&n.to_lowercase(), &wanted))
}

fn instant(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::Date(d) => Some(d.midnight().assume_utc()),
        Value::DateTime(t) => Some(t.to_offset(UtcOffset::UTC)),
        _ => None,
    }
}

fn span(count: i64, unit: DateUnit) -> Option<Duration> {
    let seconds_per_unit = match unit {
        DateUnit::Hour => 3_600,
        DateUnit::Day => 86_400,
        DateUnit::Week => 7 * 86_400,
        DateUnit::Month => 30 * 86_400,
        DateUnit::Year => 365 * 86_400,
    };

    count.checked_mul(seconds_per_unit).map(Duration::seconds)
}

fn relative(actual: &Value, operand: &Value, now: OffsetDateTime, forward: bool) -> bool {
    let Some([Value::Int(count), Value::Text(unit)]) = operand.as_list() else {
        return false;
    };
    let (Some(at), Some(unit)) = (instant(actual), DateUnit::parse(unit)) else {
        return false;
    };
    let Some(span) = span(*count, unit) else {
        return false;
    };

    let window = if forward {
        now.checked_add(span).map(|end| (now, end))
    } else {
        now.checked_sub(span).map(|start| (start, now))
    };

    window.is_some_and(|(start, end)| start <= at && at <= end)
}

fn week_start(date: Date) -> Date {
    let offset = i64::from(date.weekday().number_days_from_monday());
    date.checked_sub(Duration::days(offset)).unwrap_or(date)
}

fn month_index(date: Date) -> i64 {
    i64::from(date.year()) * 12 + i64::from(u8::from(date.month())) - 1
}

fn calendar(actual: &Value, op: Operator, operand: &Value, now: OffsetDateTime) -> bool {
    let (Some(at), Some(offset)) = (instant(actual), operand.as_int()) else {
        return false;
    };
    let (at, today) = (at.date(), now.to_offset(UtcOffset::UTC).date());

    match op {
        Operator::InCalendarDay => span(offset, DateUnit::Day)
            .and_then(|d| today.checked_add(d))
            .is_some_and(|target| at == target),
        Operator::InCalendarWeek => span(offset, DateUnit::Week)
            .and_then(|d| week_start(today).checked_add(d))
            .is_some_and(|target| week_start(at) == target),
        Operator::InCalendarMonth => {
            month_index(today).checked_add(offset) == Some(month_index(at))
        }
        Operator::InCalendarYear => {
            i64::from(today.year()).checked_add(offset) == Some(i64::from(at.year()))
        }
        _ => false,
    }
}
