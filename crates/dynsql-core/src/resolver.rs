//! Field resolver boundary.
//!
//! Conditions never see the join graph directly. They ask a resolver to turn
//! a dotted field path into a qualified column, or a relationship path into a
//! correlated subquery plus a resolver scoped to the subquery.

use crate::{error::QueryError, query::Join, statement::ParamBag};

///
/// ExistsSql
///
/// `SELECT 1 FROM ... WHERE <correlation>` fragment and the resolver that
/// addresses fields inside it.
///

pub struct ExistsSql<'r> {
    pub sql: String,
    pub resolver: Box<dyn FieldResolver + 'r>,
}

///
/// FieldResolver
///

pub trait FieldResolver {
    /// Qualified column for a field path, after permission checks.
    fn convert_column(&self, field_path: &str) -> Result<String, QueryError>;

    /// Correlated subquery over the relationship at `field_path`.
    ///
    /// `inner_fields` are paths the nested condition will reference; they are
    /// joined into the subquery before it is rendered.
    fn convert_exists_sql(
        &self,
        field_path: &str,
        joins: &[Join],
        inner_fields: &[String],
        params: &mut ParamBag,
    ) -> Result<ExistsSql<'_>, QueryError>;
}
