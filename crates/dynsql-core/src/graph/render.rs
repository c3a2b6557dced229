use crate::{
    condition::{Condition, and_fragments, replace_placeholders},
    error::QueryError,
    graph::{
        JoinGraph, Link, NodeId, QueryNode, SelectColumn, Selection, Target,
        resolve::{NodeResolver, SubqueryResolver},
    },
    model::{DELETE_FLAG_FIELD, FieldKind},
    query::{AggSelectItem, CustomSelectField, Join, OrderItem},
    resolver::FieldResolver,
    statement::{ParamBag, value_path},
};

impl<'a> JoinGraph<'a> {
    /// Qualified column for `path`, resolved from `from`.
    pub fn column(&self, from: NodeId, path: &str, checked: bool) -> Result<String, QueryError> {
        let (id, target) = self.find(from, path, checked)?;
        let node = self.node(id);

        match target {
            Target::Field(field) => match &field.kind {
                FieldKind::Basic(basic) => Ok(format!("{}.{}", node.alias(), basic.column)),
                FieldKind::Group(_) => Err(QueryError::field(
                    node.ctx.name(),
                    path,
                    "group field needs a sub-field",
                )),
                FieldKind::ToOne(_) | FieldKind::ToMany(_) => Err(QueryError::field(
                    self.node(from).ctx.name(),
                    path,
                    "relationship cannot be used as a column",
                )),
            },
            Target::SubField(_, sub) => Ok(format!("{}.{}", node.alias(), sub.column)),
            Target::Wildcard | Target::GroupWildcard(_) => Err(QueryError::field(
                node.ctx.name(),
                path,
                "wildcard cannot be used as a column",
            )),
        }
    }

    /// Equality pairs between a node and its parent. To-one pairs the
    /// node's key with the parent's local columns; to-many pairs the node's
    /// columns with the parent's key.
    pub fn link_predicate(&self, node: &QueryNode<'a>) -> Result<String, QueryError> {
        let Some(link) = &node.link else {
            return Err(QueryError::join_field(node.ctx.name(), "", "root node has no join"));
        };
        let child = node.ctx.model;
        let parent = link.parent_model;

        let (child_fields, parent_fields) = match &link.field.kind {
            FieldKind::ToOne(rel) => (child.primary_key_fields()?, parent.basic_fields(&rel.join_fields)?),
            FieldKind::ToMany(rel) => (child.basic_fields(&rel.join_fields)?, parent.primary_key_fields()?),
            FieldKind::Basic(_) | FieldKind::Group(_) => {
                return Err(QueryError::join_field(&parent.name, &link.field.name, "is not a relationship"));
            }
        };

        if child_fields.is_empty() || child_fields.len() != parent_fields.len() {
            return Err(QueryError::join_field(
                &parent.name,
                &link.field.name,
                format!(
                    "join columns do not pair up ({} on {}, {} on {})",
                    child_fields.len(),
                    child.name,
                    parent_fields.len(),
                    parent.name
                ),
            ));
        }

        let alias = node.alias();
        let pairs = child_fields
            .iter()
            .zip(&parent_fields)
            .map(|(c, p)| format!("{alias}.{} = {}.{}", c.column, link.parent_alias, p.column))
            .collect::<Vec<_>>();

        Ok(pairs.join(" AND "))
    }

    /// JOIN clauses for every descendant of `node`, depth first.
    pub fn joins_sql(&self, node: NodeId, params: &mut ParamBag) -> Result<String, QueryError> {
        let mut sql = String::new();
        for &child in &self.node(node).children {
            sql.push_str(&self.join_clause(child, params)?);
            sql.push_str(&self.joins_sql(child, params)?);
        }

        Ok(sql)
    }

    fn join_clause(&self, id: NodeId, params: &mut ParamBag) -> Result<String, QueryError> {
        let node = self.node(id);
        let join_type = node.join.as_ref().map(|j| j.join_type).unwrap_or_default();
        let on = self.link_predicate(node)?;
        let condition = node.join.as_ref().and_then(|j| j.condition.as_ref());
        let extra = self.where_sql(id, &join_prefix(node), condition, true, params)?;

        let mut sql = format!(
            " {join_type} JOIN {} AS {} ON {on}",
            node.ctx.model.schema_and_table(),
            node.alias()
        );
        if !extra.is_empty() {
            sql.push_str(" AND ");
            sql.push_str(&extra);
        }

        Ok(sql)
    }

    /// The node's soft-delete and data-rights predicate under `<prefix>0`
    /// (allow-list bypassed) AND `condition` under `<prefix>1`.
    pub fn where_sql(
        &self,
        id: NodeId,
        prefix: &str,
        condition: Option<&Condition>,
        with_additional: bool,
        params: &mut ParamBag,
    ) -> Result<String, QueryError> {
        let node = self.node(id);
        let dialect = self.catalog.dialect;

        let additional = match node.ctx.additional_condition(node.ignore_soft_delete) {
            Some(c) if with_additional => {
                let resolver = NodeResolver::new(self, id, false);
                c.sql(&format!("{prefix}0"), Some(&resolver), dialect, params)?
            }
            _ => String::new(),
        };
        let user = match condition {
            Some(c) => {
                let resolver = NodeResolver::new(self, id, true);
                c.sql(&format!("{prefix}1"), Some(&resolver), dialect, params)?
            }
            None => String::new(),
        };

        Ok(and_fragments(&[additional, user]))
    }

    /// Correlated `SELECT 1 ...` over the relationship at `path`, plus a
    /// resolver owning the subquery's graph.
    pub fn exists_sql(
        &self,
        from: NodeId,
        path: &str,
        joins: &[Join],
        inner_fields: &[String],
        checked: bool,
        params: &mut ParamBag,
    ) -> Result<(String, SubqueryResolver<'a>), QueryError> {
        let (owner, name) = match path.rsplit_once('.') {
            Some((prefix, name)) => {
                let (node, target) = self.find(from, prefix, checked)?;
                if !matches!(target, Target::Field(f) if f.is_relation()) {
                    return Err(QueryError::field(
                        self.node(from).ctx.name(),
                        prefix,
                        format!("is not a relationship; cannot resolve '{path}'"),
                    ));
                }
                (node, name)
            }
            None => (from, path),
        };

        let owner_node = self.node(owner);
        let field = owner_node.ctx.field(name, checked)?;
        if !field.is_relation() {
            return Err(QueryError::field(
                owner_node.ctx.name(),
                name,
                "exists requires a relationship field",
            ));
        }
        let link = Link {
            field,
            parent_alias: owner_node.alias(),
            parent_model: owner_node.ctx.model,
        };

        let mut graph = JoinGraph::transient(self.catalog, self.counter, link)?;
        graph.add_joins(joins)?;
        graph.add_paths(inner_fields, checked)?;
        graph.add_additional_paths()?;

        let root = graph.root();
        let predicate = graph.link_predicate(root)?;
        let table = root.ctx.model.schema_and_table();
        let alias = root.alias();
        let prefix = join_prefix(root);
        let joins_sql = graph.joins_sql(NodeId::ROOT, params)?;
        let extra = graph.where_sql(NodeId::ROOT, &prefix, None, true, params)?;

        let mut sql = format!("SELECT 1 FROM {table} AS {alias}{joins_sql} WHERE {predicate}");
        if !extra.is_empty() {
            sql.push_str(" AND ");
            sql.push_str(&extra);
        }

        Ok((sql, SubqueryResolver::new(graph, checked)))
    }

    /// Selected columns in model declaration order, children after their
    /// parent in creation order.
    pub fn select_columns(&self, nested: bool) -> Vec<SelectColumn> {
        self.node_columns(NodeId::ROOT, "", nested)
    }

    fn node_columns(&self, id: NodeId, prefix: &str, nested: bool) -> Vec<SelectColumn> {
        let node = self.node(id);
        let alias = node.alias();
        let model = node.ctx.model;
        let mut columns = Vec::new();

        for field in &model.fields {
            let Some(selection) = node.selected.get(&field.name) else {
                continue;
            };
            if field.name == DELETE_FLAG_FIELD && !node.ignore_soft_delete {
                continue;
            }

            match &field.kind {
                FieldKind::Basic(basic) => columns.push(SelectColumn::Column {
                    sql: format!("{alias}.{}", basic.column),
                    property: format!("{prefix}{}", field.name),
                    id: model.is_primary_key(&field.name),
                    group_by: false,
                }),
                FieldKind::Group(group) => {
                    for sub in &group.fields {
                        let chosen = match selection {
                            Selection::Whole => true,
                            Selection::SubFields(subs) => subs.contains(&sub.name),
                        };
                        if chosen {
                            columns.push(SelectColumn::column(
                                format!("{alias}.{}", sub.column),
                                format!("{prefix}{}.{}", field.name, sub.name),
                            ));
                        }
                    }
                }
                FieldKind::ToOne(_) | FieldKind::ToMany(_) => {}
            }
        }

        for &child in &node.children {
            let Some(link) = &self.node(child).link else {
                continue;
            };
            let property = format!("{prefix}{}", link.field.name);
            let child_columns = self.node_columns(child, &format!("{property}."), nested);
            if child_columns.is_empty() {
                continue;
            }

            if !nested {
                columns.extend(child_columns);
            } else if link.field.is_to_many() {
                columns.push(SelectColumn::Collection {
                    property,
                    columns: child_columns,
                });
            } else {
                columns.push(SelectColumn::Association {
                    property,
                    columns: child_columns,
                });
            }
        }

        columns
    }

    /// Computed select columns, values bound under `select[i]`.
    pub fn custom_columns(
        &self,
        fields: &[CustomSelectField],
        params: &mut ParamBag,
    ) -> Result<Vec<SelectColumn>, QueryError> {
        let resolver = NodeResolver::new(self, NodeId::ROOT, true);
        let mut columns = Vec::with_capacity(fields.len());

        for (i, field) in fields.iter().enumerate() {
            let expr = format!("select[{i}]");
            let sql = replace_placeholders(&expr, Some(&resolver), &field.sql_template, &field.fields)?;
            if let Some(value) = &field.value {
                params.bind(value_path(&expr), value.clone());
            }
            columns.push(SelectColumn::column(sql, field.name.clone()));
        }

        Ok(columns)
    }

    pub fn aggregate_columns(&self, items: &[AggSelectItem]) -> Result<Vec<SelectColumn>, QueryError> {
        let resolver = NodeResolver::new(self, NodeId::ROOT, true);
        let dialect = self.catalog.dialect;

        items
            .iter()
            .map(|item| {
                if item.is_row_count() {
                    return Ok(SelectColumn::column("COUNT(*)", item.result_name()));
                }
                let column = resolver.convert_column(&item.field)?;
                let group_by = item.function.is_group_key();
                let sql = match &item.custom_function {
                    Some(template) if group_by => template.replace("$COL", &column),
                    _ => item.function.to_select_column(&column, dialect),
                };

                Ok(SelectColumn::Column {
                    sql,
                    property: item.result_name().to_string(),
                    id: false,
                    group_by,
                })
            })
            .collect()
    }

    /// `ORDER BY` body; function values bound under `o<i>`.
    pub fn order_by_sql(&self, items: &[OrderItem], params: &mut ParamBag) -> Result<String, QueryError> {
        let resolver = NodeResolver::new(self, NodeId::ROOT, true);
        let mut parts = Vec::with_capacity(items.len());

        for (i, item) in items.iter().enumerate() {
            let expr = format!("o{i}");
            let sql = match (&item.function_template, &item.field) {
                (Some(template), field) => {
                    let fields = field.iter().cloned().collect::<Vec<_>>();
                    let sql = replace_placeholders(&expr, Some(&resolver), template, &fields)?;
                    if let Some(value) = &item.function_value {
                        params.bind(value_path(&expr), value.clone());
                    }
                    sql
                }
                (None, Some(field)) => resolver.convert_column(field)?,
                (None, None) => continue,
            };

            if item.asc {
                parts.push(sql);
            } else {
                parts.push(format!("{sql} DESC"));
            }
        }

        Ok(parts.join(", "))
    }
}

/// Parameter namespace of a node's ON / subquery predicate.
fn join_prefix(node: &QueryNode<'_>) -> String {
    format!("j{}", node.alias_index)
}
