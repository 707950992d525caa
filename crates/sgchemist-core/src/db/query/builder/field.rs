use crate::{
    db::query::{
        GroupingField, GroupingType, OrderDirection, QueryError, SummaryField, SummaryType,
        predicate::{ComparePredicate, DateUnit, Operator, Predicate},
    },
    fields::{Checkbox, Dated, FieldType, Membership, Numeric, Quantity, Relation, Textual},
    model::{
        entity::EntityModel,
        field::{FieldKind, FieldModel},
    },
    traits::EntityKind,
    value::Value,
};
use std::{fmt, marker::PhantomData};

///
/// Hop
/// One relation traversal: the relation field and the entity type crossed into.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Hop {
    pub relation: &'static FieldModel,
    pub owner: &'static EntityModel,
    pub target: &'static EntityModel,
}

impl Hop {
    /// Remote name of the relation, aliases resolved to the field they narrow.
    #[must_use]
    pub fn relation_name(&self) -> &'static str {
        self.owner.storage_field(self.relation).name
    }
}

///
/// FieldPath
///
/// A field reachable from a root entity, possibly through relations.
/// Its remote name is the dotted path `relation.TargetType.field`, chained
/// once per hop.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldPath {
    root: &'static EntityModel,
    hops: Vec<Hop>,
    field: &'static FieldModel,
}

impl FieldPath {
    /// Field declared directly on `root`.
    #[must_use]
    pub const fn new(root: &'static EntityModel, field: &'static FieldModel) -> Self {
        Self {
            root,
            hops: Vec::new(),
            field,
        }
    }

    /// Field of `root` by attribute name.
    pub fn of(root: &'static EntityModel, attr: &str) -> Result<Self, QueryError> {
        root.field(attr)
            .map(|field| Self::new(root, field))
            .ok_or_else(|| QueryError::UnknownField {
                entity_type: root.entity_type,
                field: attr.to_string(),
            })
    }

    /// Continue this relation path into `next`, which must be rooted at one
    /// of the relation targets.
    pub fn join(&self, next: &Self) -> Result<Self, QueryError> {
        if !self.field.kind.is_relation() {
            return Err(QueryError::NotARelation { field: self.name() });
        }
        if !self.field.targets_type(next.root.entity_type) {
            return Err(QueryError::InvalidTarget {
                field: self.name(),
                target: next.root.entity_type.to_string(),
            });
        }

        let mut hops = self.hops.clone();
        hops.push(Hop {
            relation: self.field,
            owner: self.owner(),
            target: next.root,
        });
        hops.extend(next.hops.iter().copied());

        Ok(Self {
            root: self.root,
            hops,
            field: next.field,
        })
    }

    #[must_use]
    pub const fn root(&self) -> &'static EntityModel {
        self.root
    }

    /// Entity model declaring the leaf field.
    #[must_use]
    pub fn owner(&self) -> &'static EntityModel {
        self.hops.last().map_or(self.root, |hop| hop.target)
    }

    #[must_use]
    pub const fn field(&self) -> &'static FieldModel {
        self.field
    }

    #[must_use]
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.field.kind
    }

    #[must_use]
    pub fn is_relative(&self) -> bool {
        !self.hops.is_empty()
    }

    /// Remote name of the leaf field alone, aliases resolved.
    #[must_use]
    pub fn leaf_name(&self) -> &'static str {
        self.owner().storage_field(self.field).name
    }

    /// Remote (dotted) name of the whole path.
    #[must_use]
    pub fn name(&self) -> String {
        let mut name = String::new();
        for hop in &self.hops {
            name.push_str(hop.relation_name());
            name.push('.');
            name.push_str(hop.target.entity_type);
            name.push('.');
        }
        name.push_str(self.leaf_name());

        name
    }
}

impl AsRef<Self> for FieldPath {
    fn as_ref(&self) -> &Self {
        self
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

///
/// Field
///
/// Typed descriptor of a field of `E` with kind marker `K`.
///
/// Declared as associated constants by `entity!` (`Shot::CODE`). Only the
/// operators valid for `K` are available; relational traversal keeps the
/// root entity `E` and adopts the kind of the traversed-to field.
///

pub struct Field<E, K> {
    path: FieldPath,
    _marker: PhantomData<fn() -> (E, K)>,
}

impl<E, K> Field<E, K> {
    #[must_use]
    pub const fn new(model: &'static EntityModel, field: &'static FieldModel) -> Self {
        Self {
            path: FieldPath::new(model, field),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn path(&self) -> &FieldPath {
        &self.path
    }

    #[must_use]
    pub fn into_path(self) -> FieldPath {
        self.path
    }

    /// Remote (dotted) name.
    #[must_use]
    pub fn name(&self) -> String {
        self.path.name()
    }

    #[must_use]
    pub const fn model(&self) -> &'static FieldModel {
        self.path.field
    }

    fn compare(&self, op: Operator, value: Value) -> Predicate {
        Predicate::Compare(ComparePredicate::unchecked(self.path.clone(), op, value))
    }

    fn summary(&self, summary: SummaryType) -> SummaryField {
        SummaryField {
            field: self.path.clone(),
            summary,
        }
    }

    fn grouping(&self, grouping: GroupingType) -> GroupingField {
        GroupingField {
            field: self.path.clone(),
            grouping,
            direction: OrderDirection::Asc,
        }
    }
}

impl<E, K> Clone for Field<E, K> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E, K> fmt::Debug for Field<E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.path.name()).finish()
    }
}

impl<E, K> AsRef<FieldPath> for Field<E, K> {
    fn as_ref(&self) -> &FieldPath {
        &self.path
    }
}

impl<E, K> From<Field<E, K>> for FieldPath {
    fn from(field: Field<E, K>) -> Self {
        field.path
    }
}

// ----------------------------------------------------------------------
// All kinds
// ----------------------------------------------------------------------

impl<E, K: FieldType> Field<E, K> {
    /// `is`
    #[must_use]
    pub fn eq(&self, value: impl Into<K::Operand>) -> Predicate {
        self.compare(Operator::Is, operand::<K>(value))
    }

    /// `is_not`
    #[must_use]
    pub fn ne(&self, value: impl Into<K::Operand>) -> Predicate {
        self.compare(Operator::IsNot, operand::<K>(value))
    }

    #[must_use]
    pub fn is_null(&self) -> Predicate {
        self.compare(Operator::Is, Value::Null)
    }

    #[must_use]
    pub fn is_not_null(&self) -> Predicate {
        self.compare(Operator::IsNot, Value::Null)
    }
}

// ----------------------------------------------------------------------
// Kind-specific operators
// ----------------------------------------------------------------------

impl<E, K: Membership> Field<E, K> {
    /// `in`
    #[must_use]
    pub fn is_in<I, V>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<K::Operand>,
    {
        self.compare(Operator::In, operands::<K, _, _>(values))
    }

    /// `not_in`
    #[must_use]
    pub fn is_not_in<I, V>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<K::Operand>,
    {
        self.compare(Operator::NotIn, operands::<K, _, _>(values))
    }
}

fn operand<K: FieldType>(value: impl Into<K::Operand>) -> Value {
    let operand: K::Operand = value.into();

    operand.into()
}

fn operands<K: FieldType, I, V>(values: I) -> Value
where
    I: IntoIterator<Item = V>,
    V: Into<K::Operand>,
{
    Value::List(values.into_iter().map(operand::<K>).collect())
}

impl<E, K: Numeric> Field<E, K> {
    /// `greater_than`
    #[must_use]
    pub fn gt(&self, value: impl Into<K::Operand>) -> Predicate {
        self.compare(Operator::GreaterThan, operand::<K>(value))
    }

    /// `less_than`
    #[must_use]
    pub fn lt(&self, value: impl Into<K::Operand>) -> Predicate {
        self.compare(Operator::LessThan, operand::<K>(value))
    }

    /// Inclusive range; a `None` bound is open.
    #[must_use]
    pub fn between(&self, low: Option<K::Operand>, high: Option<K::Operand>) -> Predicate {
        self.compare(Operator::Between, bounds::<K>(low, high))
    }

    #[must_use]
    pub fn not_between(&self, low: Option<K::Operand>, high: Option<K::Operand>) -> Predicate {
        self.compare(Operator::NotBetween, bounds::<K>(low, high))
    }
}

fn bounds<K: FieldType>(low: Option<K::Operand>, high: Option<K::Operand>) -> Value {
    Value::List(vec![
        low.map_or(Value::Null, Into::into),
        high.map_or(Value::Null, Into::into),
    ])
}

impl<E, K: Textual> Field<E, K> {
    #[must_use]
    pub fn contains(&self, text: impl Into<String>) -> Predicate {
        self.compare(Operator::Contains, Value::Text(text.into()))
    }

    #[must_use]
    pub fn not_contains(&self, text: impl Into<String>) -> Predicate {
        self.compare(Operator::NotContains, Value::Text(text.into()))
    }

    /// `start_with`
    #[must_use]
    pub fn starts_with(&self, text: impl Into<String>) -> Predicate {
        self.compare(Operator::StartsWith, Value::Text(text.into()))
    }

    /// `end_with`
    #[must_use]
    pub fn ends_with(&self, text: impl Into<String>) -> Predicate {
        self.compare(Operator::EndsWith, Value::Text(text.into()))
    }
}

impl<E, K: Dated> Field<E, K> {
    #[must_use]
    pub fn in_last(&self, count: i64, unit: DateUnit) -> Predicate {
        self.compare(Operator::InLast, relative(count, unit))
    }

    #[must_use]
    pub fn not_in_last(&self, count: i64, unit: DateUnit) -> Predicate {
        self.compare(Operator::NotInLast, relative(count, unit))
    }

    #[must_use]
    pub fn in_next(&self, count: i64, unit: DateUnit) -> Predicate {
        self.compare(Operator::InNext, relative(count, unit))
    }

    #[must_use]
    pub fn not_in_next(&self, count: i64, unit: DateUnit) -> Predicate {
        self.compare(Operator::NotInNext, relative(count, unit))
    }

    /// Offset in days from today (0 = today, -1 = yesterday).
    #[must_use]
    pub fn in_calendar_day(&self, offset: i64) -> Predicate {
        self.compare(Operator::InCalendarDay, Value::Int(offset))
    }

    #[must_use]
    pub fn in_calendar_week(&self, offset: i64) -> Predicate {
        self.compare(Operator::InCalendarWeek, Value::Int(offset))
    }

    #[must_use]
    pub fn in_calendar_month(&self, offset: i64) -> Predicate {
        self.compare(Operator::InCalendarMonth, Value::Int(offset))
    }

    #[must_use]
    pub fn in_calendar_year(&self, offset: i64) -> Predicate {
        self.compare(Operator::InCalendarYear, Value::Int(offset))
    }
}

fn relative(count: i64, unit: DateUnit) -> Value {
    Value::List(vec![Value::Int(count), Value::Text(unit.to_string())])
}

impl<E> Field<E, crate::fields::Image> {
    /// Image is set (`is_not` null).
    #[must_use]
    pub fn exists(&self) -> Predicate {
        self.compare(Operator::IsNot, Value::Null)
    }

    /// Image is unset (`is` null).
    #[must_use]
    pub fn not_exists(&self) -> Predicate {
        self.compare(Operator::Is, Value::Null)
    }
}

// ----------------------------------------------------------------------
// Relations
// ----------------------------------------------------------------------

impl<E, K: Relation> Field<E, K> {
    #[must_use]
    pub fn type_is<T: EntityKind>(&self) -> Predicate {
        self.compare(Operator::TypeIs, Value::from(T::ENTITY_TYPE))
    }

    #[must_use]
    pub fn type_is_not<T: EntityKind>(&self) -> Predicate {
        self.compare(Operator::TypeIsNot, Value::from(T::ENTITY_TYPE))
    }

    #[must_use]
    pub fn name_is(&self, text: impl Into<String>) -> Predicate {
        self.compare(Operator::NameIs, Value::Text(text.into()))
    }

    #[must_use]
    pub fn name_contains(&self, text: impl Into<String>) -> Predicate {
        self.compare(Operator::NameContains, Value::Text(text.into()))
    }

    #[must_use]
    pub fn name_not_contains(&self, text: impl Into<String>) -> Predicate {
        self.compare(Operator::NameNotContains, Value::Text(text.into()))
    }

    /// Traverse into a field of the related entity `T`.
    ///
    /// The result is rooted at `E` and named
    /// `relation.T.field`. Fails when `T` is not a target of this relation.
    pub fn f<T: EntityKind, K2>(&self, target: &Field<T, K2>) -> Result<Field<E, K2>, QueryError> {
        Ok(Field {
            path: self.path.join(&target.path)?,
            _marker: PhantomData,
        })
    }
}

// ----------------------------------------------------------------------
// Summaries and grouping
// ----------------------------------------------------------------------

impl<E, K: FieldType> Field<E, K> {
    #[must_use]
    pub fn record_count(&self) -> SummaryField {
        self.summary(SummaryType::RecordCount)
    }

    /// Rows where this field is set.
    #[must_use]
    pub fn count(&self) -> SummaryField {
        self.summary(SummaryType::Count)
    }

    /// One group per distinct value.
    #[must_use]
    pub fn group_exact(&self) -> GroupingField {
        self.grouping(GroupingType::Exact)
    }
}

impl<E, K: Numeric> Field<E, K> {
    #[must_use]
    pub fn minimum(&self) -> SummaryField {
        self.summary(SummaryType::Minimum)
    }

    #[must_use]
    pub fn maximum(&self) -> SummaryField {
        self.summary(SummaryType::Maximum)
    }
}

impl<E, K: Quantity> Field<E, K> {
    #[must_use]
    pub fn sum(&self) -> SummaryField {
        self.summary(SummaryType::Sum)
    }

    #[must_use]
    pub fn average(&self) -> SummaryField {
        self.summary(SummaryType::Average)
    }

    #[must_use]
    pub fn group_tens(&self) -> GroupingField {
        self.grouping(GroupingType::Tens)
    }

    #[must_use]
    pub fn group_hundreds(&self) -> GroupingField {
        self.grouping(GroupingType::Hundreds)
    }

    #[must_use]
    pub fn group_thousands(&self) -> GroupingField {
        self.grouping(GroupingType::Thousands)
    }

    #[must_use]
    pub fn group_tens_of_thousands(&self) -> GroupingField {
        self.grouping(GroupingType::TensOfThousands)
    }

    #[must_use]
    pub fn group_hundreds_of_thousands(&self) -> GroupingField {
        self.grouping(GroupingType::HundredsOfThousands)
    }

    #[must_use]
    pub fn group_millions(&self) -> GroupingField {
        self.grouping(GroupingType::Millions)
    }
}

impl<E, K: Dated> Field<E, K> {
    #[must_use]
    pub fn earliest(&self) -> SummaryField {
        self.summary(SummaryType::Earliest)
    }

    #[must_use]
    pub fn latest(&self) -> SummaryField {
        self.summary(SummaryType::Latest)
    }

    #[must_use]
    pub fn group_day(&self) -> GroupingField {
        self.grouping(GroupingType::Day)
    }

    #[must_use]
    pub fn group_month(&self) -> GroupingField {
        self.grouping(GroupingType::Month)
    }

    #[must_use]
    pub fn group_quarter(&self) -> GroupingField {
        self.grouping(GroupingType::Quarter)
    }

    #[must_use]
    pub fn group_year(&self) -> GroupingField {
        self.grouping(GroupingType::Year)
    }
}

impl<E> Field<E, Checkbox> {
    /// Rows where the box is ticked.
    #[must_use]
    pub fn checked(&self) -> SummaryField {
        self.summary(SummaryType::Checked)
    }

    #[must_use]
    pub fn unchecked(&self) -> SummaryField {
        self.summary(SummaryType::Unchecked)
    }
}

impl<E, K: Textual> Field<E, K> {
    #[must_use]
    pub fn group_first_letter(&self) -> GroupingField {
        self.grouping(GroupingType::FirstLetter)
    }
}

impl<E, K: Relation> Field<E, K> {
    #[must_use]
    pub fn group_entity_type(&self) -> GroupingField {
        self.grouping(GroupingType::EntityType)
    }
}
