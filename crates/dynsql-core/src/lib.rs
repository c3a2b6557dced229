//! Metadata-driven SQL compiler: condition trees, join graphs, statement
//! assembly and recursive tree queries, plus the `prelude` of request types.

// public exports are one module level down
pub mod compile;
pub mod condition;
pub mod config;
pub mod dialect;
pub mod error;
pub mod graph;
pub mod model;
pub mod obs;
pub mod permission;
pub mod query;
pub mod resolver;
pub mod statement;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Vocabulary needed to describe models and build requests.
///

pub mod prelude {
    pub use crate::{
        compile::Compiler,
        condition::{Condition, Logic, Operation, Ternary},
        config::EngineConfig,
        dialect::{Dialect, SearchMode},
        model::{BasicField, Field, Model, ModelRegistry},
        permission::Permission,
        query::{
            AggFunction, AggSelectItem, AggregateRequest, CustomSelectField, Direction, Join,
            JoinType, OrderItem, Page, QueryRequest, RecursiveRequest, VectorSearchRequest,
        },
        statement::{PlaceholderStyle, Statement},
        value::Value,
    };
}
