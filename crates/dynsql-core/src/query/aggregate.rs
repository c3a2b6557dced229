use crate::dialect::Dialect;
use derive_more::Display;

///
/// AggFunction
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[remain::sorted]
pub enum AggFunction {
    Avg,
    Count,
    CountDistinct,
    JsonArrayAgg,
    JsonArrayAggDistinct,
    ListAgg,
    ListAggDistinct,
    Max,
    Min,
    /// Plain column; becomes a GROUP BY key.
    None,
    Sum,
}

impl AggFunction {
    /// Select expression for an already-qualified column.
    #[must_use]
    pub fn to_select_column(self, column: &str, dialect: Dialect) -> String {
        match self {
            Self::None => column.to_string(),
            Self::Count => format!("COUNT({column})"),
            Self::Sum => format!("SUM({column})"),
            Self::Avg => format!("AVG({column})"),
            Self::Max => format!("MAX({column})"),
            Self::Min => format!("MIN({column})"),
            Self::CountDistinct => format!("COUNT(DISTINCT {column})"),
            Self::ListAgg => dialect.list_agg(column, false),
            Self::ListAggDistinct => dialect.list_agg(column, true),
            Self::JsonArrayAgg => dialect.json_array_agg(column, false),
            Self::JsonArrayAggDistinct => dialect.json_array_agg(column, true),
        }
    }

    #[must_use]
    pub const fn is_group_key(self) -> bool {
        matches!(self, Self::None)
    }
}

///
/// AggSelectItem
///

#[derive(Clone, Debug, PartialEq)]
pub struct AggSelectItem {
    /// Field path, or `*` / `1` for row counts.
    pub field: String,
    pub function: AggFunction,
    /// Result column name; defaults to the field path.
    pub alias: Option<String>,
    /// Group-key expression over `$COL`, used with `AggFunction::None`.
    pub custom_function: Option<String>,
}

impl AggSelectItem {
    #[must_use]
    pub fn new(field: impl Into<String>, function: AggFunction) -> Self {
        Self {
            field: field.into(),
            function,
            alias: None,
            custom_function: None,
        }
    }

    #[must_use]
    pub fn group_by(field: impl Into<String>) -> Self {
        Self::new(field, AggFunction::None)
    }

    #[must_use]
    pub fn count_all() -> Self {
        Self::new("*", AggFunction::Count).with_alias("count")
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn with_custom_function(mut self, template: impl Into<String>) -> Self {
        self.custom_function = Some(template.into());
        self
    }

    /// Row count over every row rather than a column.
    #[must_use]
    pub fn is_row_count(&self) -> bool {
        self.function == AggFunction::Count && (self.field == "*" || self.field == "1")
    }

    #[must_use]
    pub fn result_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field)
    }
}

///
/// TESTS
///
