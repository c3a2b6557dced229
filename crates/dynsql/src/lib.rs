//! ## Crate layout
//! - `core`: models, conditions, join graph, statement compiler and
//!   observability.
//! - `error`: the public error surface.
//!
//! The `prelude` module covers what an application needs to describe its
//! models and compile requests.

pub use dynsql_core as core;

pub mod error;

pub use error::Error;

use dynsql_core::config::EngineConfig;

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Read engine settings from a TOML document.
pub fn load_config(toml: &str) -> Result<EngineConfig, Error> {
    EngineConfig::from_toml_str(toml).map_err(Error::from)
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error,
        core::{
            obs::{compile_report, compile_reset_all},
            prelude::*,
        },
        error::{CompileErrorKind, ErrorKind, ErrorOrigin},
    };
}
