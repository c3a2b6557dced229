use crate::{
    error::QueryError,
    statement::{ParamBag, value_path},
    value::{Value, loose_eq, strict_order_cmp},
};
use derive_more::Display;
use std::cmp::Ordering;

///
/// Operation
///
/// Fixed operator set for simple conditions. Each operator owns both its SQL
/// template and its in-memory predicate, so the two stay side by side.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[remain::sorted]
pub enum Operation {
    #[display("contains")]
    Contains,
    #[display("endsWith")]
    EndsWith,
    #[display("eq")]
    Eq,
    #[display("eqOrIn")]
    EqOrIn,
    #[display("gt")]
    Gt,
    #[display("gte")]
    Gte,
    #[display("in")]
    In,
    #[display("isBlank")]
    IsBlank,
    #[display("isNotBlank")]
    IsNotBlank,
    #[display("isNotNull")]
    IsNotNull,
    #[display("isNull")]
    IsNull,
    #[display("like")]
    Like,
    #[display("lt")]
    Lt,
    #[display("lte")]
    Lte,
    #[display("ne")]
    Ne,
    #[display("notIn")]
    NotIn,
    #[display("startsWith")]
    StartsWith,
}

impl Operation {
    /// Template over `$COL` and `#{EXPR}`.
    ///
    /// Collection operators expand per element and have no fixed template.
    #[must_use]
    pub const fn template(self) -> Option<&'static str> {
        match self {
            Self::Eq => Some("$COL = #{EXPR}"),
            Self::Ne => Some("$COL != #{EXPR}"),
            Self::Lt => Some("$COL < #{EXPR}"),
            Self::Lte => Some("$COL <= #{EXPR}"),
            Self::Gt => Some("$COL > #{EXPR}"),
            Self::Gte => Some("$COL >= #{EXPR}"),
            Self::Like => Some("$COL LIKE #{EXPR}"),
            Self::Contains => Some("$COL LIKE CONCAT(CONCAT('%', #{EXPR}), '%')"),
            Self::StartsWith => Some("$COL LIKE CONCAT(#{EXPR}, '%')"),
            Self::EndsWith => Some("$COL LIKE CONCAT('%', #{EXPR})"),
            Self::IsNull => Some("$COL IS NULL"),
            Self::IsNotNull => Some("$COL IS NOT NULL"),
            Self::IsBlank => Some("($COL IS NULL OR $COL = '')"),
            Self::IsNotBlank => Some("($COL IS NOT NULL AND $COL != '')"),
            Self::In | Self::NotIn | Self::EqOrIn => None,
        }
    }

    /// Whether the operator reads its bound value.
    #[must_use]
    pub const fn needs_value(self) -> bool {
        !matches!(
            self,
            Self::IsNull | Self::IsNotNull | Self::IsBlank | Self::IsNotBlank
        )
    }

    /// Render against an already-resolved column, binding the value under
    /// `value_expr`.
    pub fn render(
        self,
        column: &str,
        value_expr: &str,
        value: &Value,
        params: &mut ParamBag,
    ) -> Result<String, QueryError> {
        match self {
            Self::In => render_in(column, "IN", value_expr, value, params, self),
            Self::NotIn => render_in(column, "NOT IN", value_expr, value, params, self),
            Self::EqOrIn => match value {
                Value::List(items) => match items.as_slice() {
                    [] => Err(empty_collection(self)),
                    [single] => Self::Eq.render(column, value_expr, single, params),
                    _ => Self::In.render(column, value_expr, value, params),
                },
                Value::Null => Err(empty_collection(self)),
                scalar => Self::Eq.render(column, value_expr, scalar, params),
            },
            _ => {
                let template = self.template().unwrap_or_default();
                let path = value_path(value_expr);
                if self.needs_value() {
                    params.bind(path.clone(), value.clone());
                }

                Ok(template
                    .replace("$COL", column)
                    .replace("EXPR", &path))
            }
        }
    }

    /// In-memory predicate over the stored value `data` and the condition
    /// value `test`.
    #[must_use]
    pub fn matches(self, data: &Value, test: &Value) -> bool {
        match self {
            Self::Eq => !data.is_null() && loose_eq(data, test),
            Self::Ne => !data.is_null() && !loose_eq(data, test),
            Self::Lt => order_holds(data, test, |o| o == Ordering::Less),
            Self::Lte => order_holds(data, test, |o| o != Ordering::Greater),
            Self::Gt => order_holds(data, test, |o| o == Ordering::Greater),
            Self::Gte => order_holds(data, test, |o| o != Ordering::Less),
            Self::Like | Self::Contains => text_holds(data, test, |d, t| d.contains(t)),
            Self::StartsWith => text_holds(data, test, |d, t| d.starts_with(t)),
            Self::EndsWith => text_holds(data, test, |d, t| d.ends_with(t)),
            Self::IsNull => data.is_null(),
            Self::IsNotNull => !data.is_null(),
            Self::IsBlank => data.is_null() || data.as_text() == Some(""),
            Self::IsNotBlank => !data.is_null() && data.as_text() != Some(""),
            Self::In => !data.is_null() && contains(test, data),
            Self::NotIn => !data.is_null() && !contains(test, data),
            Self::EqOrIn => match test {
                Value::List(items) => match items.as_slice() {
                    [single] => Self::Eq.matches(data, single),
                    _ => Self::In.matches(data, test),
                },
                scalar => Self::Eq.matches(data, scalar),
            },
        }
    }
}

fn render_in(
    column: &str,
    keyword: &str,
    value_expr: &str,
    value: &Value,
    params: &mut ParamBag,
    op: Operation,
) -> Result<String, QueryError> {
    let items = match value {
        Value::Null => return Err(empty_collection(op)),
        Value::List(items) if items.is_empty() => return Err(empty_collection(op)),
        Value::List(items) => items.as_slice(),
        scalar => std::slice::from_ref(scalar),
    };

    let path = value_path(value_expr);
    let placeholders = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_path = format!("{path}[{i}]");
            let placeholder = format!("#{{{item_path}}}");
            params.bind(item_path, item.clone());
            placeholder
        })
        .collect::<Vec<_>>()
        .join(",");

    Ok(format!("{column} {keyword} ({placeholders})"))
}

fn empty_collection(op: Operation) -> QueryError {
    QueryError::condition(format!("'{op}' requires a non-empty collection value"))
}

fn order_holds(data: &Value, test: &Value, pred: impl Fn(Ordering) -> bool) -> bool {
    strict_order_cmp(data, test).is_some_and(pred)
}

fn text_holds(data: &Value, test: &Value, pred: impl Fn(&str, &str) -> bool) -> bool {
    match (data.as_text(), test.as_text()) {
        (Some(d), Some(t)) => pred(d, t),
        _ => false,
    }
}

fn contains(collection: &Value, data: &Value) -> bool {
    match collection {
        Value::List(items) => items.iter().any(|item| loose_eq(item, data)),
        Value::Null => false,
        scalar => loose_eq(scalar, data),
    }
}
