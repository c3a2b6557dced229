use crate::{error::QueryError, statement::PlaceholderStyle};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

///
/// Dialect
///
/// SQL syntax variants for features that differ across database products.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[remain::sorted]
pub enum Dialect {
    #[display("h2")]
    H2,
    #[default]
    #[display("mysql")]
    Mysql,
    #[display("oceanbase")]
    OceanBase,
    #[display("oracle")]
    Oracle,
    #[display("postgresql")]
    Postgresql,
    #[display("sqlite")]
    Sqlite,
}

///
/// SearchMode
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum SearchMode {
    #[default]
    #[display("DEFAULT")]
    Default,
    #[display("BOOLEAN")]
    Boolean,
}

impl Dialect {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::H2 => "h2",
            Self::Mysql => "mysql",
            Self::OceanBase => "oceanbase",
            Self::Oracle => "oracle",
            Self::Postgresql => "postgresql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Full-text predicate template over `$COL` and `#{EXPR}`.
    pub fn search_template(self, mode: SearchMode) -> Result<&'static str, QueryError> {
        match (self, mode) {
            (Self::Mysql | Self::OceanBase, SearchMode::Boolean) => {
                Ok("MATCH ($COL) AGAINST (#{EXPR} IN BOOLEAN MODE)")
            }
            (Self::Mysql | Self::OceanBase, SearchMode::Default) => {
                Ok("MATCH ($COL) AGAINST (#{EXPR} IN NATURAL LANGUAGE MODE)")
            }
            (Self::Postgresql, SearchMode::Default) => {
                Ok("to_tsvector('chinese', $COL) @@ to_tsquery('chinese', #{EXPR})")
            }
            (Self::Postgresql, SearchMode::Boolean) => Err(QueryError::unsupported(
                self,
                "full-text search does not support BOOLEAN mode",
            )),
            (Self::H2 | Self::Oracle | Self::Sqlite, _) => Err(QueryError::unsupported(
                self,
                "full-text search is not supported",
            )),
        }
    }

    /// Vector distance template over `$COL` and `#{EXPR}`.
    ///
    /// `approximate` asks for index-assisted search where the product
    /// distinguishes it; only used for ordering.
    pub fn distance_template(self, approximate: bool) -> Result<String, QueryError> {
        match self {
            Self::OceanBase => {
                let suffix = if approximate { " APPROXIMATE" } else { "" };
                Ok(format!("l2_distance($COL, #{{EXPR}}){suffix}"))
            }
            Self::Mysql => Ok("DISTANCE($COL, #{EXPR}, 'COSINE')".to_string()),
            Self::Postgresql => Ok("$COL <-> #{EXPR}".to_string()),
            Self::H2 | Self::Oracle | Self::Sqlite => Err(QueryError::unsupported(
                self,
                "vector distance is not supported",
            )),
        }
    }

    /// String aggregation over a column.
    #[must_use]
    pub fn list_agg(self, column: &str, distinct: bool) -> String {
        let distinct = if distinct { "DISTINCT " } else { "" };
        match self {
            Self::H2 | Self::Mysql | Self::OceanBase | Self::Sqlite => {
                format!("GROUP_CONCAT({distinct}{column})")
            }
            Self::Postgresql => format!("STRING_AGG({distinct}{column} , ',')"),
            Self::Oracle => format!("LISTAGG({distinct}{column} , ',')"),
        }
    }

    /// JSON array aggregation over a column.
    #[must_use]
    pub fn json_array_agg(self, column: &str, distinct: bool) -> String {
        let distinct = if distinct { "DISTINCT " } else { "" };
        match self {
            Self::H2 | Self::Mysql | Self::OceanBase | Self::Postgresql => {
                format!("JSON_ARRAYAGG({distinct}{column})")
            }
            Self::Oracle => format!("JSONB_AGG({distinct}{column})"),
            Self::Sqlite => format!("JSON_GROUP_ARRAY({distinct}{column})"),
        }
    }

    /// Quote a select alias.
    #[must_use]
    pub fn quote_alias(self, alias: &str) -> String {
        match self {
            Self::Mysql | Self::OceanBase => format!("`{}`", alias.replace('`', "``")),
            Self::H2 | Self::Oracle | Self::Postgresql | Self::Sqlite => {
                format!("\"{}\"", alias.replace('"', "\"\""))
            }
        }
    }

    /// Paging clause over the bound `_rows` / `_offset` parameters.
    #[must_use]
    pub fn limit_clause(self, rows: &str, offset: Option<&str>) -> String {
        match (self, offset) {
            (Self::Oracle, Some(offset)) => {
                format!("OFFSET #{{{offset}}} ROWS FETCH NEXT #{{{rows}}} ROWS ONLY")
            }
            (Self::Oracle, None) => format!("FETCH FIRST #{{{rows}}} ROWS ONLY"),
            (_, Some(offset)) => format!("LIMIT #{{{rows}}} OFFSET #{{{offset}}}"),
            (_, None) => format!("LIMIT #{{{rows}}}"),
        }
    }

    /// Keyword opening a recursive common table expression.
    #[must_use]
    pub const fn recursive_with(self) -> &'static str {
        match self {
            Self::Oracle => "WITH",
            _ => "WITH RECURSIVE",
        }
    }

    #[must_use]
    pub const fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Self::Postgresql => PlaceholderStyle::Numbered,
            _ => PlaceholderStyle::Question,
        }
    }
}

impl FromStr for Dialect {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h2" => Ok(Self::H2),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "oceanbase" => Ok(Self::OceanBase),
            "oracle" => Ok(Self::Oracle),
            "postgresql" | "postgres" => Ok(Self::Postgresql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(QueryError::Config(format!("unknown dialect '{other}'"))),
        }
    }
}

///
/// TESTS
///
