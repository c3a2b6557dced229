//! Condition AST.
//!
//! A condition renders two ways: to SQL text through a `FieldResolver`, and
//! to a three-valued in-memory predicate over a `Row`. Both sides match on
//! the same closed set of variants.

mod eval;
mod operation;
mod render;

#[cfg(test)]
mod tests;

pub use eval::{FieldPresence, Row, Ternary};
pub use operation::Operation;
pub use render::{add_bracket, and_fragments, child_expr, or_fragments, replace_placeholders};

use crate::{dialect::SearchMode, query::Join, value::Value};
use derive_more::Display;
use std::ops::{BitAnd, BitOr, Not};

///
/// Logic
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Logic {
    #[display("AND")]
    And,
    #[display("OR")]
    Or,
}

///
/// Condition
///

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Simple(SimpleCondition),
    Group(GroupCondition),
    Not(Box<Self>),
    Exists(ExistsCondition),
    Custom(CustomCondition),
    Search(SearchCondition),
}

///
/// SimpleCondition
///

#[derive(Clone, Debug, PartialEq)]
pub struct SimpleCondition {
    pub field: String,
    pub op: Operation,
    pub value: Value,
    /// Drop the condition entirely when its value is null or empty.
    pub ignore_if_empty: bool,
}

///
/// GroupCondition
///

#[derive(Clone, Debug, PartialEq)]
pub struct GroupCondition {
    pub logic: Logic,
    pub conditions: Vec<Condition>,
}

///
/// ExistsCondition
///
/// Correlated subquery over a relationship field. The inner condition is
/// resolved against the relationship's target model.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ExistsCondition {
    pub field: String,
    pub condition: Option<Box<Condition>>,
    pub joins: Vec<Join>,
    pub negated: bool,
}

///
/// CustomCondition
///
/// Raw template with `$COL` / `$COL[n]` column slots and an `EXPR` value slot.
///

#[derive(Clone, Debug, PartialEq)]
pub struct CustomCondition {
    pub sql_template: String,
    pub fields: Vec<String>,
    pub value: Option<Value>,
}

///
/// SearchCondition
///

#[derive(Clone, Debug, PartialEq)]
pub struct SearchCondition {
    pub field: String,
    pub value: Value,
    pub mode: SearchMode,
}

impl Condition {
    #[must_use]
    pub fn simple(field: impl Into<String>, op: Operation, value: impl Into<Value>) -> Self {
        Self::Simple(SimpleCondition {
            field: field.into(),
            op,
            value: value.into(),
            ignore_if_empty: false,
        })
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::simple(field, Operation::Eq, value)
    }

    #[must_use]
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::simple(field, Operation::Ne, value)
    }

    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::simple(field, Operation::Lt, value)
    }

    #[must_use]
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::simple(field, Operation::Lte, value)
    }

    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::simple(field, Operation::Gt, value)
    }

    #[must_use]
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::simple(field, Operation::Gte, value)
    }

    #[must_use]
    pub fn like(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::simple(field, Operation::Like, value)
    }

    #[must_use]
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::simple(field, Operation::Contains, value)
    }

    #[must_use]
    pub fn starts_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::simple(field, Operation::StartsWith, value)
    }

    #[must_use]
    pub fn ends_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::simple(field, Operation::EndsWith, value)
    }

    #[must_use]
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::simple(field, Operation::IsNull, Value::Null)
    }

    #[must_use]
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::simple(field, Operation::IsNotNull, Value::Null)
    }

    #[must_use]
    pub fn is_blank(field: impl Into<String>) -> Self {
        Self::simple(field, Operation::IsBlank, Value::Null)
    }

    #[must_use]
    pub fn is_not_blank(field: impl Into<String>) -> Self {
        Self::simple(field, Operation::IsNotBlank, Value::Null)
    }

    #[must_use]
    pub fn in_<T: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = T>) -> Self {
        Self::simple(field, Operation::In, Value::from_list(values))
    }

    #[must_use]
    pub fn not_in<T: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Self::simple(field, Operation::NotIn, Value::from_list(values))
    }

    /// `eq` for scalars and single-element lists, `in` otherwise.
    #[must_use]
    pub fn eq_or_in(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::simple(field, Operation::EqOrIn, value)
    }

    #[must_use]
    pub fn and(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::group(Logic::And, conditions)
    }

    #[must_use]
    pub fn or(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::group(Logic::Or, conditions)
    }

    #[must_use]
    pub fn group(logic: Logic, conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::Group(GroupCondition {
            logic,
            conditions: conditions.into_iter().collect(),
        })
    }

    #[must_use]
    pub fn negate(condition: Self) -> Self {
        Self::Not(Box::new(condition))
    }

    #[must_use]
    pub fn exists(field: impl Into<String>, condition: Option<Self>) -> Self {
        Self::Exists(ExistsCondition {
            field: field.into(),
            condition: condition.map(Box::new),
            joins: Vec::new(),
            negated: false,
        })
    }

    #[must_use]
    pub fn not_exists(field: impl Into<String>, condition: Option<Self>) -> Self {
        Self::Exists(ExistsCondition {
            field: field.into(),
            condition: condition.map(Box::new),
            joins: Vec::new(),
            negated: true,
        })
    }

    #[must_use]
    pub fn custom<S: Into<String>>(
        sql_template: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
        value: Option<Value>,
    ) -> Self {
        Self::Custom(CustomCondition {
            sql_template: sql_template.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            value,
        })
    }

    #[must_use]
    pub fn search(field: impl Into<String>, value: impl Into<Value>, mode: SearchMode) -> Self {
        Self::Search(SearchCondition {
            field: field.into(),
            value: value.into(),
            mode,
        })
    }

    /// Mark a simple condition to be dropped when its value is empty.
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn ignore_if_empty(mut self) -> Self {
        if let Self::Simple(simple) = &mut self {
            simple.ignore_if_empty = true;
        }
        self
    }

    /// Attach joins to an exists condition's subquery.
    #[must_use]
    pub fn with_joins(mut self, joins: impl IntoIterator<Item = Join>) -> Self {
        if let Self::Exists(exists) = &mut self {
            exists.joins.extend(joins);
        }
        self
    }

    /// AND two optional conditions, keeping whichever side is present.
    #[must_use]
    pub fn and_optional(left: Option<Self>, right: Option<Self>) -> Option<Self> {
        match (left, right) {
            (Some(l), Some(r)) => Some(Self::and([l, r])),
            (l, r) => l.or(r),
        }
    }

    /// Field paths referenced by simple, custom and search leaves.
    /// Exists subtrees are resolved in their own scope and are skipped.
    #[must_use]
    pub fn simple_fields(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_simple_fields(&mut out);
        out
    }

    fn collect_simple_fields(&self, out: &mut Vec<String>) {
        match self {
            Self::Simple(s) => {
                if !s.field.is_empty() {
                    out.push(s.field.clone());
                }
            }
            Self::Group(g) => g.conditions.iter().for_each(|c| c.collect_simple_fields(out)),
            Self::Not(inner) => inner.collect_simple_fields(out),
            Self::Exists(_) => {}
            Self::Custom(c) => out.extend(c.fields.iter().cloned()),
            Self::Search(s) => out.push(s.field.clone()),
        }
    }

    /// Relationship paths referenced by exists conditions at this scope.
    #[must_use]
    pub fn exists_fields(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_exists_fields(&mut out);
        out
    }

    fn collect_exists_fields(&self, out: &mut Vec<String>) {
        match self {
            Self::Exists(e) => {
                if !e.field.is_empty() {
                    out.push(e.field.clone());
                }
            }
            Self::Group(g) => g.conditions.iter().for_each(|c| c.collect_exists_fields(out)),
            Self::Not(inner) => inner.collect_exists_fields(out),
            Self::Simple(_) | Self::Custom(_) | Self::Search(_) => {}
        }
    }
}

impl BitAnd for Condition {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::and([self, rhs])
    }
}

impl BitOr for Condition {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::or([self, rhs])
    }
}

impl Not for Condition {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::negate(self)
    }
}
