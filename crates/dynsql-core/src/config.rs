use crate::{dialect::Dialect, error::QueryError, statement::PlaceholderStyle};
use serde::{Deserialize, Serialize};

///
/// EngineConfig
///
/// Compiler settings, usually read from a `[dynsql]`-style TOML table.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub dialect: Dialect,

    /// Positional placeholder style; defaults per dialect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<PlaceholderStyle>,

    /// Upper bound applied to every page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_page_size: Option<u32>,

    /// Group relationship columns unless a request says otherwise.
    pub nested_select: bool,
}

impl EngineConfig {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, QueryError> {
        toml::from_str(s).map_err(|e| QueryError::Config(e.to_string()))
    }

    #[must_use]
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.placeholder
            .unwrap_or_else(|| self.dialect.placeholder_style())
    }

    /// Clamp a requested page size.
    #[must_use]
    pub fn page_size(&self, requested: u32) -> u32 {
        match self.max_page_size {
            Some(max) if max > 0 => requested.min(max),
            _ => requested,
        }
    }
}

///
/// TESTS
///
