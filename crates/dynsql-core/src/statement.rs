//! Compiled statement output.
//!
//! SQL text carries named `#{path}` placeholders; the parameter bag maps each
//! path to its bound value. `to_positional` lowers both into driver form.

use crate::{error::QueryError, graph::SelectColumn, value::Value};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Suffix appended to a value expression to address its bound value.
pub const VALUE_KEY: &str = "v";

/// Path of the value bound under `value_expr`.
#[must_use]
pub fn value_path(value_expr: &str) -> String {
    if value_expr.is_empty() {
        VALUE_KEY.to_string()
    } else {
        format!("{value_expr}.{VALUE_KEY}")
    }
}

///
/// ParamBag
///
/// Ordered mapping from compile-time paths (`c1.v`, `c1.c[0].v`, `o0.v`,
/// `r_t0.v`) to bound values.
///

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ParamBag(BTreeMap<String, Value>);

impl ParamBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, path: impl Into<String>, value: Value) {
        self.0.insert(path.into(), value);
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.0.get(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

///
/// PlaceholderStyle
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// `?`
    #[default]
    #[display("question")]
    Question,
    /// `$1`, `$2`, ...
    #[display("numbered")]
    Numbered,
}

///
/// StatementKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum StatementKind {
    Aggregate,
    Count,
    DeleteWhere,
    Exists,
    Query,
    Recursive,
    RecursiveCount,
    VectorSearch,
}

///
/// Statement
///

#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub model: String,
    pub sql: String,
    pub params: ParamBag,
    /// Select-list structure for row mapping; empty for non-select output.
    pub columns: Vec<SelectColumn>,
}

///
/// PositionalStatement
///

#[derive(Clone, Debug, PartialEq)]
pub struct PositionalStatement {
    pub sql: String,
    pub values: Vec<Value>,
}

impl Statement {
    /// Rewrite `#{path}` placeholders into positional form.
    ///
    /// Text after a comma inside the braces is a binding option and is
    /// ignored. Unbound paths are rejected.
    pub fn to_positional(&self, style: PlaceholderStyle) -> Result<PositionalStatement, QueryError> {
        let mut sql = String::with_capacity(self.sql.len());
        let mut values = Vec::new();
        let mut rest = self.sql.as_str();

        while let Some(start) = rest.find("#{") {
            let Some(len) = rest[start + 2..].find('}') else {
                return Err(QueryError::condition(format!(
                    "unterminated placeholder in: {}",
                    &rest[start..]
                )));
            };
            let inner = &rest[start + 2..start + 2 + len];
            let path = inner.split(',').next().unwrap_or_default().trim();
            let value = self
                .params
                .get(path)
                .ok_or_else(|| QueryError::condition(format!("unbound parameter '{path}'")))?;

            sql.push_str(&rest[..start]);
            values.push(value.clone());
            match style {
                PlaceholderStyle::Question => sql.push('?'),
                PlaceholderStyle::Numbered => {
                    sql.push('$');
                    sql.push_str(&values.len().to_string());
                }
            }
            rest = &rest[start + 2 + len + 1..];
        }
        sql.push_str(rest);

        Ok(PositionalStatement { sql, values })
    }
}

///
/// TESTS
///
