//! Statement assembly.
//!
//! Every entry point builds a fresh `AliasCounter` and join graph, renders
//! SELECT / FROM / JOIN / WHERE / GROUP BY / ORDER BY / LIMIT in that order,
//! and returns the SQL together with its parameter bag.

mod recursive;
mod vector;

#[cfg(test)]
mod tests;

use crate::{
    condition::{Condition, and_fragments},
    config::EngineConfig,
    dialect::Dialect,
    error::QueryError,
    graph::{
        AliasCounter, Catalog, JoinGraph, NodeId, PlainResolver, SelectColumn, render_select_list,
    },
    model::{DELETE_FLAG_FIELD, ModelProvider},
    obs::{self, CompileEvent},
    permission::PermissionProvider,
    query::{AggregateRequest, Join, OrderItem, Page, QueryRequest},
    statement::{ParamBag, PositionalStatement, Statement, StatementKind},
    value::Value,
};

/// Parameter holding the page size.
pub const ROWS_PARAM: &str = "_rows";

/// Parameter holding the row offset.
pub const OFFSET_PARAM: &str = "_offset";

/// Parameter holding the flag value a logical delete writes.
pub const DELETE_FLAG_PARAM: &str = "_delete_flag";

/// Parameter namespace of the root WHERE clause.
const ROOT_PREFIX: &str = "c";

/// Result column of count statements.
const COUNT_ALIAS: &str = "count";

///
/// Compiler
///
/// Entry point. Holds only shared, read-only inputs; every compile call owns
/// its own graph and counter.
///

pub struct Compiler<'a> {
    models: &'a dyn ModelProvider,
    permissions: &'a dyn PermissionProvider,
    config: EngineConfig,
}

///
/// SelectMode
///

#[derive(Clone, Copy)]
enum SelectMode<'q> {
    /// Statement builds its own select list.
    Skip,
    /// `None` selects defaults.
    Fields(Option<&'q [String]>),
}

///
/// Scope
/// Everything that decides which join nodes exist.
///

struct Scope<'q> {
    condition: Option<&'q Condition>,
    joins: &'q [Join],
    order_items: &'q [OrderItem],
    extra_paths: Vec<String>,
    select: SelectMode<'q>,
    ignore_soft_delete: bool,
    /// Set where RIGHT and FULL joins are rejected.
    outer_joins_rejected_in: Option<&'static str>,
}

impl<'q> Scope<'q> {
    const fn filter(condition: Option<&'q Condition>, joins: &'q [Join], ignore_soft_delete: bool) -> Self {
        Self {
            condition,
            joins,
            order_items: &[],
            extra_paths: Vec::new(),
            select: SelectMode::Skip,
            ignore_soft_delete,
            outer_joins_rejected_in: None,
        }
    }
}

///
/// Tail
/// Clauses after the select list.
///

struct Tail<'q> {
    from: String,
    condition: Option<&'q Condition>,
    root_predicate: bool,
    group_by: Vec<String>,
    order_items: &'q [OrderItem],
    page: Option<Page>,
}

impl<'a> Compiler<'a> {
    #[must_use]
    pub fn new(
        models: &'a dyn ModelProvider,
        permissions: &'a dyn PermissionProvider,
        config: EngineConfig,
    ) -> Self {
        Self {
            models,
            permissions,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    const fn catalog(&self) -> Catalog<'a> {
        Catalog {
            models: self.models,
            permissions: self.permissions,
            dialect: self.config.dialect,
        }
    }

    /// Lower a compiled statement with the configured placeholder style.
    pub fn to_positional(&self, statement: &Statement) -> Result<PositionalStatement, QueryError> {
        statement.to_positional(self.config.placeholder_style())
    }

    // ---------------------------------------------------------------------
    // Entry points
    // ---------------------------------------------------------------------

    pub fn compile_query(&self, model: &str, request: &QueryRequest) -> Result<Statement, QueryError> {
        self.instrument(StatementKind::Query, model, || {
            self.query(model, request, StatementKind::Query)
        })
    }

    pub fn compile_count(
        &self,
        model: &str,
        condition: Option<&Condition>,
        joins: &[Join],
        ignore_soft_delete: bool,
    ) -> Result<Statement, QueryError> {
        self.instrument(StatementKind::Count, model, || {
            self.count(model, condition, joins, ignore_soft_delete)
        })
    }

    pub fn compile_exists(
        &self,
        model: &str,
        condition: Option<&Condition>,
        joins: &[Join],
        ignore_soft_delete: bool,
    ) -> Result<Statement, QueryError> {
        self.instrument(StatementKind::Exists, model, || {
            let counter = AliasCounter::default();
            let mut params = ParamBag::new();
            let scope = Scope {
                outer_joins_rejected_in: Some("an existence check"),
                ..Scope::filter(condition, joins, ignore_soft_delete)
            };
            let graph = self.graph(&counter, model, &scope)?;

            let tail = Tail {
                from: root_from(&graph),
                condition,
                root_predicate: true,
                group_by: Vec::new(),
                order_items: &[],
                page: Some(Page::new(1, 1)),
            };
            let sql = format!("SELECT 1{}", self.tail_sql(&graph, &tail, &mut params)?);

            Ok(statement(StatementKind::Exists, model, sql, params, Vec::new()))
        })
    }

    pub fn compile_aggregate(
        &self,
        model: &str,
        request: &AggregateRequest,
    ) -> Result<Statement, QueryError> {
        self.instrument(StatementKind::Aggregate, model, || {
            let counter = AliasCounter::default();
            let mut params = ParamBag::new();
            let scope = Scope {
                condition: request.condition.as_ref(),
                joins: &request.joins,
                order_items: &request.order_items,
                extra_paths: request
                    .items
                    .iter()
                    .filter(|i| !i.is_row_count())
                    .map(|i| i.field.clone())
                    .collect(),
                select: SelectMode::Skip,
                ignore_soft_delete: request.ignore_logic_delete,
                outer_joins_rejected_in: None,
            };
            let graph = self.graph(&counter, model, &scope)?;
            let columns = graph.aggregate_columns(&request.items)?;

            let tail = Tail {
                from: root_from(&graph),
                condition: request.condition.as_ref(),
                root_predicate: true,
                group_by: SelectColumn::group_by_sql(&columns)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                order_items: &request.order_items,
                page: request.page,
            };
            let sql = format!(
                "SELECT {}{}",
                render_select_list(&columns, self.dialect()),
                self.tail_sql(&graph, &tail, &mut params)?
            );

            Ok(statement(StatementKind::Aggregate, model, sql, params, columns))
        })
    }

    /// Bulk delete over plain columns. Soft-delete models get
    /// `UPDATE <table> SET <flag> = true WHERE ...` unless `force_physical`;
    /// everything else gets `DELETE FROM <table> WHERE ...`. The model's data
    /// rights are applied; an empty caller condition is rejected.
    pub fn compile_delete_where(
        &self,
        model: &str,
        condition: &Condition,
        force_physical: bool,
    ) -> Result<Statement, QueryError> {
        self.instrument(StatementKind::DeleteWhere, model, || {
            let ctx = self.catalog().context(model)?;
            let dialect = self.dialect();
            let mut params = ParamBag::new();

            let user = condition.sql(
                &format!("{ROOT_PREFIX}1"),
                Some(&PlainResolver::new(ctx, true, None)),
                dialect,
                &mut params,
            )?;
            if user.is_empty() {
                return Err(QueryError::condition(format!(
                    "delete on [{model}] requires a non-empty condition"
                )));
            }
            let rights = match ctx.permission.and_then(|p| p.data_rights.as_ref()) {
                Some(rights) => rights.sql(
                    &format!("{ROOT_PREFIX}0"),
                    Some(&PlainResolver::new(ctx, false, None)),
                    dialect,
                    &mut params,
                )?,
                None => String::new(),
            };

            let table = ctx.model.schema_and_table();
            let predicate = and_fragments(&[rights, user]);
            let sql = match ctx.model.basic_field(DELETE_FLAG_FIELD) {
                Some(flag) if !force_physical => {
                    params.bind(DELETE_FLAG_PARAM, Value::Bool(true));
                    format!(
                        "UPDATE {table} SET {} = #{{{DELETE_FLAG_PARAM}}} WHERE {predicate}",
                        flag.column
                    )
                }
                _ => format!("DELETE FROM {table} WHERE {predicate}"),
            };

            Ok(statement(StatementKind::DeleteWhere, model, sql, params, Vec::new()))
        })
    }

    // ---------------------------------------------------------------------
    // Builders
    // ---------------------------------------------------------------------

    fn query(&self, model: &str, request: &QueryRequest, kind: StatementKind) -> Result<Statement, QueryError> {
        let counter = AliasCounter::default();
        let mut params = ParamBag::new();
        let scope = query_scope(request);
        let graph = self.graph(&counter, model, &scope)?;

        let nested = request.nested.unwrap_or(self.config.nested_select);
        let mut columns = graph.select_columns(nested);
        columns.extend(graph.custom_columns(&request.custom_select_fields, &mut params)?);

        let tail = Tail {
            from: root_from(&graph),
            condition: request.condition.as_ref(),
            root_predicate: true,
            group_by: Vec::new(),
            order_items: &request.order_items,
            page: request.page,
        };
        let sql = format!(
            "SELECT {}{}",
            render_select_list(&columns, self.dialect()),
            self.tail_sql(&graph, &tail, &mut params)?
        );

        Ok(statement(kind, model, sql, params, columns))
    }

    fn count(
        &self,
        model: &str,
        condition: Option<&Condition>,
        joins: &[Join],
        ignore_soft_delete: bool,
    ) -> Result<Statement, QueryError> {
        let counter = AliasCounter::default();
        let mut params = ParamBag::new();
        let scope = Scope::filter(condition, joins, ignore_soft_delete);
        let graph = self.graph(&counter, model, &scope)?;

        let tail = Tail {
            from: root_from(&graph),
            condition,
            root_predicate: true,
            group_by: Vec::new(),
            order_items: &[],
            page: None,
        };
        let sql = format!(
            "{}{}",
            self.count_select(),
            self.tail_sql(&graph, &tail, &mut params)?
        );

        Ok(statement(StatementKind::Count, model, sql, params, count_columns()))
    }

    fn count_select(&self) -> String {
        format!("SELECT COUNT(*) AS {}", self.dialect().quote_alias(COUNT_ALIAS))
    }

    /// Build the join graph: explicit joins first, then every referenced
    /// path in sorted order, then the select list, then the paths used by
    /// soft-delete and data-rights predicates.
    fn graph<'c>(
        &'c self,
        counter: &'c AliasCounter,
        model: &str,
        scope: &Scope<'_>,
    ) -> Result<JoinGraph<'c>, QueryError> {
        let mut graph = JoinGraph::new(self.catalog(), counter, model)?;
        graph.set_root_ignore_soft_delete(scope.ignore_soft_delete);
        if let Some(context) = scope.outer_joins_rejected_in {
            graph.reject_outer_joins(context);
        }
        graph.add_joins(scope.joins)?;

        let mut paths = scope.condition.map(Condition::join_paths).unwrap_or_default();
        paths.extend(scope.order_items.iter().filter_map(|o| o.field.clone()));
        paths.extend(scope.extra_paths.iter().cloned());
        graph.add_paths(paths, true)?;

        if let SelectMode::Fields(fields) = scope.select {
            graph.add_select_fields(fields)?;
        }
        graph.add_additional_paths()?;

        Ok(graph)
    }

    fn tail_sql(&self, graph: &JoinGraph<'_>, tail: &Tail<'_>, params: &mut ParamBag) -> Result<String, QueryError> {
        let mut sql = format!(" FROM {}", tail.from);
        sql.push_str(&graph.joins_sql(NodeId::ROOT, params)?);

        let where_sql = graph.where_sql(NodeId::ROOT, ROOT_PREFIX, tail.condition, tail.root_predicate, params)?;
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if !tail.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&tail.group_by.join(", "));
        }

        let order_by = graph.order_by_sql(tail.order_items, params)?;
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by);
        }

        sql.push_str(&self.limit_sql(tail.page, params));

        Ok(sql)
    }

    /// Paging clause; binds `_rows` and a non-zero `_offset`.
    fn limit_sql(&self, page: Option<Page>, params: &mut ParamBag) -> String {
        let Some(page) = page.filter(|p| !p.is_unbounded()) else {
            return String::new();
        };
        let page = Page::new(page.current, self.config.page_size(page.size));
        let offset = page.offset();

        params.bind(ROWS_PARAM, Value::from(page.size));
        let offset_param = (offset > 0).then(|| {
            params.bind(OFFSET_PARAM, Value::from(offset));
            OFFSET_PARAM
        });

        format!(" {}", self.dialect().limit_clause(ROWS_PARAM, offset_param))
    }

    fn instrument(
        &self,
        kind: StatementKind,
        model: &str,
        f: impl FnOnce() -> Result<Statement, QueryError>,
    ) -> Result<Statement, QueryError> {
        match f() {
            Ok(statement) => {
                tracing::debug!(
                    %kind,
                    model,
                    dialect = %self.config.dialect,
                    sql = %statement.sql,
                    params = statement.params.len(),
                    "statement compiled"
                );
                obs::record(CompileEvent::StatementCompiled { kind, model });
                Ok(statement)
            }
            Err(err) => {
                tracing::debug!(%kind, model, error = %err, "statement compile failed");
                obs::record(CompileEvent::CompileFailed { kind });
                Err(err)
            }
        }
    }
}

fn query_scope(request: &QueryRequest) -> Scope<'_> {
    Scope {
        condition: request.condition.as_ref(),
        joins: &request.joins,
        order_items: &request.order_items,
        extra_paths: request
            .custom_select_fields
            .iter()
            .flat_map(|f| f.fields.iter().cloned())
            .collect(),
        select: SelectMode::Fields(request.select_fields.as_deref()),
        ignore_soft_delete: request.ignore_logic_delete,
        outer_joins_rejected_in: None,
    }
}

fn root_from(graph: &JoinGraph<'_>) -> String {
    let root = graph.root();
    format!("{} AS {}", root.ctx.model.schema_and_table(), root.alias())
}

fn count_columns() -> Vec<SelectColumn> {
    vec![SelectColumn::column("COUNT(*)", COUNT_ALIAS)]
}

fn statement(
    kind: StatementKind,
    model: &str,
    sql: String,
    params: ParamBag,
    columns: Vec<SelectColumn>,
) -> Statement {
    Statement {
        kind,
        model: model.to_string(),
        sql,
        params,
        columns,
    }
}
