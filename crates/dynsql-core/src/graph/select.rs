use crate::dialect::Dialect;
use serde::Serialize;

///
/// SelectColumn
///
/// Select-list entry. Leaf columns always carry the full dotted property,
/// so the rendered SQL is the same whether or not relationship columns are
/// grouped.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectColumn {
    Column {
        sql: String,
        property: String,
        id: bool,
        group_by: bool,
    },
    /// Columns of a to-one relationship.
    Association {
        property: String,
        columns: Vec<Self>,
    },
    /// Columns of a to-many relationship.
    Collection {
        property: String,
        columns: Vec<Self>,
    },
}

impl SelectColumn {
    #[must_use]
    pub fn column(sql: impl Into<String>, property: impl Into<String>) -> Self {
        Self::Column {
            sql: sql.into(),
            property: property.into(),
            id: false,
            group_by: false,
        }
    }

    #[must_use]
    pub fn property(&self) -> &str {
        match self {
            Self::Column { property, .. }
            | Self::Association { property, .. }
            | Self::Collection { property, .. } => property,
        }
    }

    /// Leaf columns in select order.
    #[must_use]
    pub fn leaves(columns: &[Self]) -> Vec<&Self> {
        let mut out = Vec::new();
        collect_leaves(columns, &mut out);
        out
    }

    /// SQL of every leaf flagged as a grouping key.
    #[must_use]
    pub fn group_by_sql(columns: &[Self]) -> Vec<&str> {
        Self::leaves(columns)
            .into_iter()
            .filter_map(|c| match c {
                Self::Column {
                    sql, group_by: true, ..
                } => Some(sql.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn collect_leaves<'c>(columns: &'c [SelectColumn], out: &mut Vec<&'c SelectColumn>) {
    for column in columns {
        match column {
            SelectColumn::Column { .. } => out.push(column),
            SelectColumn::Association { columns, .. } | SelectColumn::Collection { columns, .. } => {
                collect_leaves(columns, out);
            }
        }
    }
}

/// `sql AS "property", ...`, or `*` when nothing is selected.
#[must_use]
pub fn render_select_list(columns: &[SelectColumn], dialect: Dialect) -> String {
    let rendered = SelectColumn::leaves(columns)
        .into_iter()
        .filter_map(|c| match c {
            SelectColumn::Column { sql, property, .. } => {
                Some(format!("{sql} AS {}", dialect.quote_alias(property)))
            }
            _ => None,
        })
        .collect::<Vec<_>>();

    if rendered.is_empty() {
        "*".to_string()
    } else {
        rendered.join(", ")
    }
}

///
/// TESTS
///
