use crate::{
    condition::{Condition, Logic},
    dialect::Dialect,
    error::QueryError,
    resolver::FieldResolver,
    statement::{ParamBag, value_path},
    value::Value,
};

impl Condition {
    /// Render to SQL, binding values under `value_expr`.
    ///
    /// An empty string means the condition contributes no predicate. Without
    /// a resolver, field paths are used verbatim as column names.
    pub fn sql(
        &self,
        value_expr: &str,
        resolver: Option<&dyn FieldResolver>,
        dialect: Dialect,
        params: &mut ParamBag,
    ) -> Result<String, QueryError> {
        match self {
            Self::Simple(s) => {
                if s.field.is_empty()
                    || (s.ignore_if_empty && s.op.needs_value() && s.value.is_empty_value())
                {
                    return Ok(String::new());
                }
                let column = resolve_column(resolver, &s.field)?;

                s.op.render(&column, value_expr, &s.value, params)
            }

            Self::Group(g) => {
                let mut parts = Vec::with_capacity(g.conditions.len());
                for (i, c) in g.conditions.iter().enumerate() {
                    let expr = child_expr(value_expr, &format!("c[{i}]"));
                    parts.push(c.sql(&expr, resolver, dialect, params)?);
                }

                Ok(join_fragments(g.logic, &parts))
            }

            Self::Not(inner) => {
                let expr = child_expr(value_expr, "c");
                let sql = inner.sql(&expr, resolver, dialect, params)?;
                if sql.is_empty() {
                    return Ok(sql);
                }

                Ok(add_bracket(&format!("NOT {sql}")))
            }

            Self::Exists(e) => {
                if e.field.is_empty() {
                    return Ok(String::new());
                }
                let resolver = resolver.ok_or_else(|| {
                    QueryError::condition(format!(
                        "exists condition on '{}' requires a field resolver",
                        e.field
                    ))
                })?;
                let inner_fields = e
                    .condition
                    .as_deref()
                    .map(Self::join_paths)
                    .unwrap_or_default();
                let exists = resolver.convert_exists_sql(&e.field, &e.joins, &inner_fields, params)?;

                let where_sql = match e.condition.as_deref() {
                    Some(inner) => {
                        let expr = child_expr(value_expr, "c");
                        inner.sql(&expr, Some(exists.resolver.as_ref()), dialect, params)?
                    }
                    None => String::new(),
                };
                let not = if e.negated { "NOT " } else { "" };

                if where_sql.is_empty() {
                    Ok(format!("{not}EXISTS ({})", exists.sql))
                } else {
                    Ok(format!("{not}EXISTS ({} AND {where_sql})", exists.sql))
                }
            }

            Self::Custom(c) => {
                let sql = replace_placeholders(value_expr, resolver, &c.sql_template, &c.fields)?;
                if let Some(value) = &c.value {
                    bind_with_elements(params, &value_path(value_expr), value);
                }

                Ok(sql)
            }

            Self::Search(s) => {
                let template = dialect.search_template(s.mode)?;
                let sql =
                    replace_placeholders(value_expr, resolver, template, &[s.field.clone()])?;
                params.bind(value_path(value_expr), s.value.clone());

                Ok(sql)
            }
        }
    }

    /// Paths that must exist as join nodes before this condition renders:
    /// every simple field, plus the owning prefix of each exists path.
    #[must_use]
    pub fn join_paths(&self) -> Vec<String> {
        let mut paths = self.simple_fields();
        paths.extend(
            self.exists_fields()
                .iter()
                .filter_map(|f| f.rsplit_once('.').map(|(prefix, _)| prefix.to_string())),
        );
        paths
    }
}

/// Substitute `$COL[n]`, `$COL` and `EXPR` in a template.
///
/// `$COL[n]` maps to the n-th resolved field and bare `$COL` to the first.
/// `EXPR` becomes the bound value's path under `value_expr`.
pub fn replace_placeholders(
    value_expr: &str,
    resolver: Option<&dyn FieldResolver>,
    template: &str,
    fields: &[String],
) -> Result<String, QueryError> {
    let columns = fields
        .iter()
        .map(|f| resolve_column(resolver, f))
        .collect::<Result<Vec<_>, _>>()?;

    let mut sql = template.to_string();
    for (i, column) in columns.iter().enumerate().rev() {
        sql = sql.replace(&format!("$COL[{i}]"), column);
    }
    if let Some(first) = columns.first() {
        sql = sql.replace("$COL", first);
    }

    Ok(sql.replace("EXPR", &value_path(value_expr)))
}

/// Value expression of a nested condition.
#[must_use]
pub fn child_expr(value_expr: &str, child: &str) -> String {
    if value_expr.is_empty() {
        child.to_string()
    } else {
        format!("{value_expr}.{child}")
    }
}

/// Join non-empty fragments with ` AND `.
#[must_use]
pub fn and_fragments<S: AsRef<str>>(parts: &[S]) -> String {
    join_fragments(Logic::And, parts)
}

/// Join non-empty fragments with ` OR `.
#[must_use]
pub fn or_fragments<S: AsRef<str>>(parts: &[S]) -> String {
    join_fragments(Logic::Or, parts)
}

/// A single member is returned as-is; two or more are joined and bracketed.
pub(crate) fn join_fragments<S: AsRef<str>>(logic: Logic, parts: &[S]) -> String {
    let present = parts
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    match present.as_slice() {
        [] => String::new(),
        [single] => (*single).to_string(),
        many => add_bracket(&many.join(&format!(" {logic} "))),
    }
}

/// Wrap in parentheses unless the fragment is already one bracketed atom.
#[must_use]
pub fn add_bracket(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    if s.starts_with('(') && s.ends_with(')') && !s[1..].contains('(') {
        return s.to_string();
    }

    format!("({s})")
}

fn resolve_column(resolver: Option<&dyn FieldResolver>, field: &str) -> Result<String, QueryError> {
    match resolver {
        Some(r) => r.convert_column(field),
        None => Ok(field.to_string()),
    }
}

fn bind_with_elements(params: &mut ParamBag, path: &str, value: &Value) {
    if let Value::List(items) = value {
        for (i, item) in items.iter().enumerate() {
            params.bind(format!("{path}[{i}]"), item.clone());
        }
    }
    params.bind(path, value.clone());
}
