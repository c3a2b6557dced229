use crate::{
    condition::{Condition, Logic},
    value::Value,
};
use std::collections::BTreeMap;

///
/// Ternary
///
/// Result of evaluating a condition in memory. `Absent` means the condition
/// does not apply and must not influence an enclosing AND/OR.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Ternary {
    True,
    False,
    Absent,
}

impl Ternary {
    #[must_use]
    pub const fn from_bool(b: bool) -> Self {
        if b { Self::True } else { Self::False }
    }

    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Absent => Self::Absent,
        }
    }

    #[must_use]
    pub const fn is_absent(self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub const fn as_option(self) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::False => Some(false),
            Self::Absent => None,
        }
    }

    /// Fold child results of a group.
    ///
    /// Absent children are ignored. With nothing left the group is absent.
    /// OR holds iff any present child is true; AND holds iff no present
    /// child is false.
    pub fn aggregate(logic: Logic, results: impl IntoIterator<Item = Self>) -> Self {
        let mut any_true = false;
        let mut any_false = false;
        let mut any_present = false;

        for result in results {
            match result {
                Self::True => any_true = true,
                Self::False => any_false = true,
                Self::Absent => continue,
            }
            any_present = true;
        }

        if !any_present {
            return Self::Absent;
        }

        match logic {
            Logic::Or => Self::from_bool(any_true),
            Logic::And => Self::from_bool(!any_false),
        }
    }
}

///
/// FieldPresence
///

#[derive(Clone, Debug, PartialEq)]
pub enum FieldPresence {
    Present(Value),
    Missing,
}

///
/// Row
///
/// Field access for in-memory evaluation. Dotted paths descend into nested
/// record values; a missing field reads as null.
///

pub trait Row {
    fn field(&self, name: &str) -> FieldPresence;
}

impl Row for BTreeMap<String, Value> {
    fn field(&self, name: &str) -> FieldPresence {
        self.get(name)
            .map_or(FieldPresence::Missing, |v| FieldPresence::Present(v.clone()))
    }
}

impl Row for Value {
    fn field(&self, name: &str) -> FieldPresence {
        match self {
            Self::Record(map) => map.field(name),
            _ => FieldPresence::Missing,
        }
    }
}

impl Row for serde_json::Value {
    fn field(&self, name: &str) -> FieldPresence {
        self.get(name).map_or(FieldPresence::Missing, |v| {
            FieldPresence::Present(Value::from(v.clone()))
        })
    }
}

fn read_path(row: &dyn Row, path: &str) -> Value {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    let FieldPresence::Present(value) = row.field(head) else {
        return Value::Null;
    };

    match rest {
        Some(rest) => value.get_path(rest).cloned().unwrap_or(Value::Null),
        None => value,
    }
}

impl Condition {
    /// Three-valued in-memory evaluation.
    pub fn matches(&self, row: &dyn Row) -> Ternary {
        match self {
            Self::Simple(s) => {
                if s.field.is_empty()
                    || (s.ignore_if_empty && s.op.needs_value() && s.value.is_empty_value())
                {
                    return Ternary::Absent;
                }
                let data = read_path(row, &s.field);

                Ternary::from_bool(s.op.matches(&data, &s.value))
            }

            Self::Group(g) => {
                Ternary::aggregate(g.logic, g.conditions.iter().map(|c| c.matches(row)))
            }

            Self::Not(inner) => inner.matches(row).negate(),

            Self::Exists(e) => {
                let Value::List(items) = read_path(row, &e.field) else {
                    return Ternary::False;
                };
                let any = items.iter().any(|item| match e.condition.as_deref() {
                    Some(inner) => inner.matches(item) == Ternary::True,
                    None => true,
                });

                Ternary::from_bool(any != e.negated)
            }

            Self::Custom(_) | Self::Search(_) => Ternary::Absent,
        }
    }
}
