use crate::{
    compile::{Compiler, Tail, count_columns, query_scope, statement},
    condition::and_fragments,
    error::QueryError,
    graph::{AliasCounter, ModelContext, PlainResolver, render_select_list, soft_delete_condition},
    model::{BasicField, FieldKind},
    query::{Direction, QueryRequest, RecursiveRequest},
    statement::{ParamBag, Statement, StatementKind},
};
use std::collections::BTreeSet;

/// Name of the recursive CTE; the outer query reads it as its root table.
const CTE_ALIAS: &str = "t0";

/// Row alias inside the CTE branches.
const ROW_ALIAS: &str = "t";

/// Parameter namespace of the anchor and step predicates.
const ANCHOR_PREFIX: &str = "r_t0";

impl Compiler<'_> {
    /// Tree query over a self-referencing model. Without an initial
    /// condition this is a plain query.
    pub fn compile_recursive(
        &self,
        model: &str,
        request: &RecursiveRequest,
    ) -> Result<Statement, QueryError> {
        self.instrument(StatementKind::Recursive, model, || {
            self.recursive(model, request, false)
        })
    }

    pub fn compile_recursive_count(
        &self,
        model: &str,
        request: &RecursiveRequest,
    ) -> Result<Statement, QueryError> {
        self.instrument(StatementKind::RecursiveCount, model, || {
            self.recursive(model, request, true)
        })
    }

    fn recursive(
        &self,
        model: &str,
        request: &RecursiveRequest,
        count: bool,
    ) -> Result<Statement, QueryError> {
        let query = &request.query;
        let kind = if count {
            StatementKind::RecursiveCount
        } else {
            StatementKind::Recursive
        };
        let ctx = self.catalog().context(model)?;
        let mut params = ParamBag::new();

        let init = match &request.init_condition {
            Some(init) => init.sql(
                &format!("{ANCHOR_PREFIX}1"),
                Some(&PlainResolver::new(ctx, true, Some(ROW_ALIAS))),
                self.dialect(),
                &mut params,
            )?,
            None => String::new(),
        };
        if init.is_empty() {
            tracing::debug!(model, "empty initial condition; compiling without recursion");
            let mut statement = if count {
                self.count(model, query.condition.as_ref(), &query.joins, query.ignore_logic_delete)?
            } else {
                self.query(model, query, kind)?
            };
            statement.kind = kind;
            return Ok(statement);
        }

        let cte = self.cte_sql(ctx, request, init, &mut params)?;

        let counter = AliasCounter::default();
        let scope = query_scope(query);
        let graph = self.graph(&counter, model, &scope)?;
        let tail = Tail {
            from: CTE_ALIAS.to_string(),
            condition: query.condition.as_ref(),
            root_predicate: false,
            group_by: Vec::new(),
            order_items: if count { &[] } else { query.order_items.as_slice() },
            page: if count { None } else { query.page },
        };

        if count {
            let sql = format!(
                "{cte} {}{}",
                self.count_select(),
                self.tail_sql(&graph, &tail, &mut params)?
            );
            return Ok(statement(kind, model, sql, params, count_columns()));
        }

        let nested = query.nested.unwrap_or(self.config.nested_select);
        let mut columns = graph.select_columns(nested);
        columns.extend(graph.custom_columns(&query.custom_select_fields, &mut params)?);
        let sql = format!(
            "{cte} SELECT {}{}",
            render_select_list(&columns, self.dialect()),
            self.tail_sql(&graph, &tail, &mut params)?
        );

        Ok(statement(kind, model, sql, params, columns))
    }

    /// `WITH RECURSIVE t0(cols) AS (anchor UNION ALL step)`.
    fn cte_sql(
        &self,
        ctx: ModelContext<'_>,
        request: &RecursiveRequest,
        init: String,
        params: &mut ParamBag,
    ) -> Result<String, QueryError> {
        let model = ctx.model;
        let dialect = self.dialect();
        let ignore_soft_delete = request.query.ignore_logic_delete;

        let keys = model.primary_key_fields()?;
        let parents = model.parent_id_fields()?;
        if keys.len() != parents.len() {
            return Err(QueryError::join_field(
                &model.name,
                parents.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(","),
                "parent columns do not pair up with the primary key",
            ));
        }

        let columns = cte_columns(ctx, &keys, &parents, recursive_fields(&request.query).as_ref());
        let qualified = columns
            .iter()
            .map(|c| format!("{ROW_ALIAS}.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let table = model.schema_and_table();

        let additional = match ctx.additional_condition(ignore_soft_delete) {
            Some(c) => c.sql(
                &format!("{ANCHOR_PREFIX}0"),
                Some(&PlainResolver::new(ctx, false, Some(ROW_ALIAS))),
                dialect,
                params,
            )?,
            None => String::new(),
        };
        let anchor_where = and_fragments(&[additional, init]);

        let mut step_on = String::new();
        if model.is_soft_delete() && !ignore_soft_delete {
            step_on = soft_delete_condition().sql(
                &format!("{ANCHOR_PREFIX}2"),
                Some(&PlainResolver::new(ctx, false, Some(ROW_ALIAS))),
                dialect,
                params,
            )?;
            step_on.push_str(" AND ");
        }
        step_on.push_str(&direction_predicate(request.direction, &keys, &parents));

        Ok(format!(
            "{} {CTE_ALIAS}({}) AS (SELECT {qualified} FROM {table} {ROW_ALIAS} WHERE {anchor_where} \
             UNION ALL SELECT {qualified} FROM {table} {ROW_ALIAS} JOIN {CTE_ALIAS} ON {step_on})",
            dialect.recursive_with(),
            columns.join(", "),
        ))
    }
}

/// Down pairs each row's parent columns with the CTE's keys; up pairs each
/// row's keys with the CTE's parent columns.
fn direction_predicate(direction: Direction, keys: &[&BasicField], parents: &[&BasicField]) -> String {
    keys.iter()
        .zip(parents)
        .map(|(key, parent)| match direction {
            Direction::Down => format!("{ROW_ALIAS}.{} = {CTE_ALIAS}.{}", parent.column, key.column),
            Direction::Up => format!("{ROW_ALIAS}.{} = {CTE_ALIAS}.{}", key.column, parent.column),
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// First path segments the outer query touches. `None` means every field.
fn recursive_fields(query: &QueryRequest) -> Option<BTreeSet<String>> {
    let select = query.select_fields.as_ref()?;
    let mut paths = select.clone();

    if let Some(condition) = &query.condition {
        paths.extend(condition.simple_fields());
        paths.extend(condition.exists_fields());
    }
    paths.extend(query.order_items.iter().filter_map(|o| o.field.clone()));
    paths.extend(query.joins.iter().map(|j| j.field_path.clone()));
    paths.extend(
        query
            .custom_select_fields
            .iter()
            .flat_map(|f| f.fields.iter().cloned()),
    );

    let heads = paths
        .iter()
        .filter_map(|p| p.split('.').next())
        .map(str::to_string)
        .collect::<BTreeSet<_>>();

    (!heads.contains("*")).then_some(heads)
}

/// Columns projected by both CTE branches, in model order: keys, parent
/// links, referenced permitted fields, and the local columns of referenced
/// to-one relationships.
fn cte_columns(
    ctx: ModelContext<'_>,
    keys: &[&BasicField],
    parents: &[&BasicField],
    wanted: Option<&BTreeSet<String>>,
) -> Vec<String> {
    let model = ctx.model;
    let is_wanted = |name: &str| wanted.is_none_or(|w| w.contains(name));
    let is_link = |name: &str| {
        keys.iter().chain(parents).any(|f| f.name == name)
            || model.fields.iter().any(|f| match &f.kind {
                FieldKind::ToOne(rel) => {
                    is_wanted(&f.name) && rel.join_fields.iter().any(|j| j == name)
                }
                _ => false,
            })
    };

    let mut columns = Vec::new();
    for field in &model.fields {
        match &field.kind {
            FieldKind::Basic(basic) => {
                if is_link(&field.name) || (is_wanted(&field.name) && ctx.is_permitted(&field.name)) {
                    columns.push(basic.column.clone());
                }
            }
            FieldKind::Group(group) => {
                if is_wanted(&field.name) && ctx.is_permitted(&field.name) {
                    columns.extend(group.fields.iter().map(|b| b.column.clone()));
                }
            }
            FieldKind::ToOne(_) | FieldKind::ToMany(_) => {}
        }
    }

    columns
}
