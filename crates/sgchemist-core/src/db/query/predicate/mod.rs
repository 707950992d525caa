pub mod eval;

#[cfg(test)]
mod tests;

use crate::{
    db::query::{QueryError, builder::FieldPath},
    model::field::FieldKind,
    value::Value,
};
use derive_more::Display;
use std::ops::{BitAnd, BitOr};

// re-exports
pub use eval::{FieldPresence, Row, eval, eval_at};

///
/// Predicate AST
///
/// Immutable filter trees. Leaves compare one field path against an
/// operand; groups combine children with `all` / `any`. Typed field
/// descriptors build leaves that are valid by construction; the untyped
/// `ComparePredicate::new` checks the operator and the operand shape
/// against the field kind.
///

///
/// Operator
/// Display form is the remote filter operator.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Operator {
    #[display("between")]
    Between,
    #[display("contains")]
    Contains,
    #[display("end_with")]
    EndsWith,
    #[display("greater_than")]
    GreaterThan,
    #[display("in")]
    In,
    #[display("in_calendar_day")]
    InCalendarDay,
    #[display("in_calendar_month")]
    InCalendarMonth,
    #[display("in_calendar_week")]
    InCalendarWeek,
    #[display("in_calendar_year")]
    InCalendarYear,
    #[display("in_last")]
    InLast,
    #[display("in_next")]
    InNext,
    #[display("is")]
    Is,
    #[display("is_not")]
    IsNot,
    #[display("less_than")]
    LessThan,
    #[display("name_contains")]
    NameContains,
    #[display("name_is")]
    NameIs,
    #[display("name_not_contains")]
    NameNotContains,
    #[display("not_between")]
    NotBetween,
    #[display("not_contains")]
    NotContains,
    #[display("not_in")]
    NotIn,
    #[display("not_in_last")]
    NotInLast,
    #[display("not_in_next")]
    NotInNext,
    #[display("start_with")]
    StartsWith,
    #[display("type_is")]
    TypeIs,
    #[display("type_is_not")]
    TypeIsNot,
}

impl Operator {
    /// Whether fields of `kind` accept this operator.
    #[must_use]
    pub const fn supports(self, kind: FieldKind) -> bool {
        match self {
            Self::Is | Self::IsNot => true,
            Self::GreaterThan | Self::LessThan | Self::Between | Self::NotBetween => {
                kind.is_numeric()
            }
            Self::In | Self::NotIn => {
                kind.is_numeric()
                    || kind.is_text()
                    || kind.is_relation()
                    || matches!(kind, FieldKind::List)
            }
            Self::Contains | Self::NotContains | Self::StartsWith | Self::EndsWith => {
                kind.is_text()
            }
            Self::InLast
            | Self::NotInLast
            | Self::InNext
            | Self::NotInNext
            | Self::InCalendarDay
            | Self::InCalendarWeek
            | Self::InCalendarMonth
            | Self::InCalendarYear => kind.is_date(),
            Self::TypeIs
            | Self::TypeIsNot
            | Self::NameContains
            | Self::NameNotContains
            | Self::NameIs => kind.is_relation(),
        }
    }

    /// Check the operand shape this operator expects for a field of `kind`.
    fn check_operand(self, kind: FieldKind, value: &Value) -> Result<(), &'static str> {
        let scalar = |v: &Value| kind.accepts_scalar(v);
        let ok = match self {
            Self::Is | Self::IsNot => scalar(value),
            Self::GreaterThan | Self::LessThan => !value.is_null() && scalar(value),
            Self::Between | Self::NotBetween => {
                matches!(value.as_list(), Some([low, high]) if scalar(low) && scalar(high))
            }
            Self::In | Self::NotIn => value
                .as_list()
                .is_some_and(|items| items.iter().all(|v| !v.is_null() && scalar(v))),
            Self::Contains
            | Self::NotContains
            | Self::StartsWith
            | Self::EndsWith
            | Self::TypeIs
            | Self::TypeIsNot
            | Self::NameContains
            | Self::NameNotContains
            | Self::NameIs => value.as_text().is_some(),
            Self::InLast | Self::NotInLast | Self::InNext | Self::NotInNext => matches!(
                value.as_list(),
                Some([Value::Int(_), Value::Text(unit)]) if DateUnit::parse(unit).is_some()
            ),
            Self::InCalendarDay
            | Self::InCalendarWeek
            | Self::InCalendarMonth
            | Self::InCalendarYear => value.as_int().is_some(),
        };

        if ok { Ok(()) } else { Err(self.operand_hint()) }
    }

    const fn operand_hint(self) -> &'static str {
        match self {
            Self::Is | Self::IsNot => "a value of the field type or null",
            Self::GreaterThan | Self::LessThan => "a non-null value of the field type",
            Self::Between | Self::NotBetween => "a [low, high] list",
            Self::In | Self::NotIn => "a list of values of the field type",
            Self::InLast | Self::NotInLast | Self::InNext | Self::NotInNext => {
                "a [count, unit] list"
            }
            Self::InCalendarDay
            | Self::InCalendarWeek
            | Self::InCalendarMonth
            | Self::InCalendarYear => "an integer offset",
            _ => "a text value",
        }
    }
}

///
/// DateUnit
/// Unit of relative date operators.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum DateUnit {
    #[display("HOUR")]
    Hour,
    #[display("DAY")]
    Day,
    #[display("WEEK")]
    Week,
    #[display("MONTH")]
    Month,
    #[display("YEAR")]
    Year,
}

impl DateUnit {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "HOUR" => Some(Self::Hour),
            "DAY" => Some(Self::Day),
            "WEEK" => Some(Self::Week),
            "MONTH" => Some(Self::Month),
            "YEAR" => Some(Self::Year),
            _ => None,
        }
    }
}

///
/// LogicalOperator
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum LogicalOperator {
    #[display("all")]
    All,
    #[display("any")]
    Any,
}

///
/// ComparePredicate
///

#[derive(Clone, Debug, PartialEq)]
pub struct ComparePredicate {
    pub field: FieldPath,
    pub op: Operator,
    pub value: Value,
}

impl ComparePredicate {
    /// Build a condition, checking the operator and operand against the field kind.
    pub fn new(
        field: FieldPath,
        op: Operator,
        value: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        let value = value.into();
        let kind = field.kind();

        if !op.supports(kind) {
            return Err(QueryError::UnsupportedOperator {
                field: field.name(),
                op,
                kind,
            });
        }

        if let Err(expected) = op.check_operand(kind, &value) {
            return Err(QueryError::InvalidOperand {
                field: field.name(),
                op,
                expected,
                found: value.label(),
            });
        }

        Ok(Self { field, op, value })
    }

    // Typed descriptors only produce valid combinations.
    pub(crate) const fn unchecked(field: FieldPath, op: Operator, value: Value) -> Self {
        Self { field, op, value }
    }
}

///
/// Predicate
///

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    All(Vec<Self>),
    Any(Vec<Self>),
    Compare(ComparePredicate),
}

impl Predicate {
    /// Conjunction of all predicates; same-operator groups are flattened.
    #[must_use]
    pub fn and(preds: impl IntoIterator<Item = Self>) -> Self {
        Self::group(LogicalOperator::All, preds)
    }

    /// Disjunction of all predicates; same-operator groups are flattened.
    #[must_use]
    pub fn or(preds: impl IntoIterator<Item = Self>) -> Self {
        Self::group(LogicalOperator::Any, preds)
    }

    fn group(op: LogicalOperator, preds: impl IntoIterator<Item = Self>) -> Self {
        let mut children = Vec::new();
        for pred in preds {
            match (op, pred) {
                (LogicalOperator::All, Self::All(inner))
                | (LogicalOperator::Any, Self::Any(inner)) => {
                    children.extend(inner);
                }
                (_, pred) => children.push(pred),
            }
        }

        match op {
            LogicalOperator::All => Self::All(children),
            LogicalOperator::Any => Self::Any(children),
        }
    }

    #[must_use]
    pub const fn logical_operator(&self) -> Option<LogicalOperator> {
        match self {
            Self::All(_) => Some(LogicalOperator::All),
            Self::Any(_) => Some(LogicalOperator::Any),
            Self::Compare(_) => None,
        }
    }

    /// Visit every leaf, depth first.
    pub fn leaves(&self) -> Box<dyn Iterator<Item = &ComparePredicate> + '_> {
        match self {
            Self::Compare(cmp) => Box::new(std::iter::once(cmp)),
            Self::All(children) | Self::Any(children) => {
                Box::new(children.iter().flat_map(Self::leaves))
            }
        }
    }
}

impl From<ComparePredicate> for Predicate {
    fn from(cmp: ComparePredicate) -> Self {
        Self::Compare(cmp)
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::and([self, rhs])
    }
}

impl BitAnd for &Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Self) -> Self::Output {
        Predicate::and([self.clone(), rhs.clone()])
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::or([self, rhs])
    }
}

impl BitOr for &Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Self) -> Self::Output {
        Predicate::or([self.clone(), rhs.clone()])
    }
}
