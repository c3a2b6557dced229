use crate::{
    error::QueryError,
    graph::{JoinGraph, ModelContext, NodeId},
    model::FieldKind,
    query::Join,
    resolver::{ExistsSql, FieldResolver},
    statement::ParamBag,
};

///
/// NodeResolver
///
/// Resolves paths relative to one node of a persistent graph.
///

pub(crate) struct NodeResolver<'g, 'a> {
    graph: &'g JoinGraph<'a>,
    node: NodeId,
    checked: bool,
}

impl<'g, 'a> NodeResolver<'g, 'a> {
    pub const fn new(graph: &'g JoinGraph<'a>, node: NodeId, checked: bool) -> Self {
        Self {
            graph,
            node,
            checked,
        }
    }
}

impl FieldResolver for NodeResolver<'_, '_> {
    fn convert_column(&self, field_path: &str) -> Result<String, QueryError> {
        self.graph.column(self.node, field_path, self.checked)
    }

    fn convert_exists_sql(
        &self,
        field_path: &str,
        joins: &[Join],
        inner_fields: &[String],
        params: &mut ParamBag,
    ) -> Result<ExistsSql<'_>, QueryError> {
        let (sql, resolver) =
            self.graph
                .exists_sql(self.node, field_path, joins, inner_fields, self.checked, params)?;

        Ok(ExistsSql {
            sql,
            resolver: Box::new(resolver),
        })
    }
}

///
/// SubqueryResolver
///
/// Owns the transient graph of an exists subquery for as long as the inner
/// condition renders.
///

pub(crate) struct SubqueryResolver<'a> {
    graph: JoinGraph<'a>,
    checked: bool,
}

impl<'a> SubqueryResolver<'a> {
    pub const fn new(graph: JoinGraph<'a>, checked: bool) -> Self {
        Self { graph, checked }
    }
}

impl FieldResolver for SubqueryResolver<'_> {
    fn convert_column(&self, field_path: &str) -> Result<String, QueryError> {
        self.graph.column(NodeId::ROOT, field_path, self.checked)
    }

    fn convert_exists_sql(
        &self,
        field_path: &str,
        joins: &[Join],
        inner_fields: &[String],
        params: &mut ParamBag,
    ) -> Result<ExistsSql<'_>, QueryError> {
        let (sql, resolver) =
            self.graph
                .exists_sql(NodeId::ROOT, field_path, joins, inner_fields, self.checked, params)?;

        Ok(ExistsSql {
            sql,
            resolver: Box::new(resolver),
        })
    }
}

///
/// PlainResolver
///
/// Single-table resolver with no join graph, used where the statement has
/// no aliases to join against (CTE branches, bulk deletes).
///

pub(crate) struct PlainResolver<'a> {
    ctx: ModelContext<'a>,
    checked: bool,
    qualifier: Option<&'a str>,
}

impl<'a> PlainResolver<'a> {
    pub const fn new(ctx: ModelContext<'a>, checked: bool, qualifier: Option<&'a str>) -> Self {
        Self {
            ctx,
            checked,
            qualifier,
        }
    }

    fn qualify(&self, column: &str) -> String {
        match self.qualifier {
            Some(q) => format!("{q}.{column}"),
            None => column.to_string(),
        }
    }
}

impl FieldResolver for PlainResolver<'_> {
    fn convert_column(&self, field_path: &str) -> Result<String, QueryError> {
        let (head, sub) = match field_path.split_once('.') {
            Some((head, sub)) => (head, Some(sub)),
            None => (field_path, None),
        };
        let field = self.ctx.field(head, self.checked)?;

        match (&field.kind, sub) {
            (FieldKind::Basic(basic), None) => Ok(self.qualify(&basic.column)),
            (FieldKind::Group(group), Some(sub)) => group
                .sub_field(sub)
                .map(|b| self.qualify(&b.column))
                .ok_or_else(|| {
                    QueryError::field(self.ctx.name(), field_path, "group sub-field does not exist")
                }),
            (FieldKind::Basic(_), Some(_)) => Err(QueryError::field(
                self.ctx.name(),
                head,
                format!("is not a relationship; cannot resolve '{field_path}'"),
            )),
            (FieldKind::Group(_), None) => Err(QueryError::field(
                self.ctx.name(),
                field_path,
                "group field needs a sub-field",
            )),
            (FieldKind::ToOne(_) | FieldKind::ToMany(_), _) => Err(QueryError::field(
                self.ctx.name(),
                field_path,
                "relationship paths cannot be resolved on a single table",
            )),
        }
    }

    fn convert_exists_sql(
        &self,
        field_path: &str,
        _joins: &[Join],
        _inner_fields: &[String],
        _params: &mut ParamBag,
    ) -> Result<ExistsSql<'_>, QueryError> {
        Err(QueryError::field(
            self.ctx.name(),
            field_path,
            "exists conditions cannot be resolved on a single table",
        ))
    }
}
