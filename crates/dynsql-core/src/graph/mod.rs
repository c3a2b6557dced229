//! Join graph.
//!
//! One arena of `QueryNode`s per compile call. Relationship paths referenced
//! anywhere in a query are materialized lazily, one node per distinct path,
//! each with a `t<N>` alias drawn from a counter owned by the compile call.
//! Exists subqueries build a separate, transient arena that borrows the same
//! counter and is dropped after rendering.

mod context;
mod render;
mod resolve;
mod select;


pub use select::{SelectColumn, render_select_list};

pub(crate) use context::{Catalog, ModelContext, soft_delete_condition};
pub(crate) use resolve::{NodeResolver, PlainResolver};

use crate::{
    condition::Condition,
    error::QueryError,
    model::{BasicField, Field, FieldKind, Model},
    obs::{self, CompileEvent},
    query::{Join, JoinType},
};
use std::{
    cell::Cell,
    collections::{BTreeMap, BTreeSet, btree_map::Entry},
};

/// Prefix of generated table aliases.
pub const TABLE_ALIAS_PREFIX: &str = "t";

///
/// AliasCounter
///
/// Monotonic table-alias source scoped to one compile call.
///

#[derive(Debug, Default)]
pub(crate) struct AliasCounter(Cell<usize>);

impl AliasCounter {
    pub fn next(&self) -> usize {
        let n = self.0.get();
        self.0.set(n + 1);
        n
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct NodeId(usize);

impl NodeId {
    pub const ROOT: Self = Self(0);
}

///
/// Link
///
/// Relationship edge from a parent table into a node.
///

#[derive(Clone, Debug)]
pub(crate) struct Link<'a> {
    pub field: &'a Field,
    pub parent_alias: String,
    pub parent_model: &'a Model,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Selection {
    Whole,
    /// Chosen sub-fields of a group field.
    SubFields(BTreeSet<String>),
}

///
/// QueryNode
///

#[derive(Debug)]
pub(crate) struct QueryNode<'a> {
    pub ctx: ModelContext<'a>,
    pub alias_index: usize,
    pub link: Option<Link<'a>>,
    /// `None` on graph roots.
    pub join: Option<Join>,
    pub ignore_soft_delete: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub selected: BTreeMap<String, Selection>,
}

impl<'a> QueryNode<'a> {
    fn new(ctx: ModelContext<'a>, alias_index: usize, link: Option<Link<'a>>) -> Self {
        Self {
            ctx,
            alias_index,
            link,
            join: None,
            ignore_soft_delete: false,
            parent: None,
            children: Vec::new(),
            selected: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn alias(&self) -> String {
        format!("{TABLE_ALIAS_PREFIX}{}", self.alias_index)
    }
}

///
/// Target
///
/// What a field path resolves to on its terminal node.
///

#[derive(Clone, Copy, Debug)]
pub(crate) enum Target<'a> {
    /// Basic, group or relationship field. For a relationship the returned
    /// node is the relationship's own node.
    Field(&'a Field),
    SubField(&'a Field, &'a BasicField),
    Wildcard,
    GroupWildcard(&'a Field),
}

///
/// JoinGraph
///

pub(crate) struct JoinGraph<'a> {
    pub catalog: Catalog<'a>,
    pub counter: &'a AliasCounter,
    pub nodes: Vec<QueryNode<'a>>,
    /// Where RIGHT and FULL joins are rejected; `None` allows them.
    outer_joins_rejected_in: Option<&'static str>,
}

impl<'a> JoinGraph<'a> {
    /// Persistent graph rooted at `model`.
    pub fn new(
        catalog: Catalog<'a>,
        counter: &'a AliasCounter,
        model: &str,
    ) -> Result<Self, QueryError> {
        let ctx = catalog.context(model)?;

        Ok(Self {
            catalog,
            counter,
            nodes: vec![QueryNode::new(ctx, counter.next(), None)],
            outer_joins_rejected_in: None,
        })
    }

    /// Transient graph for an exists subquery over `link`.
    pub fn transient(
        catalog: Catalog<'a>,
        counter: &'a AliasCounter,
        link: Link<'a>,
    ) -> Result<Self, QueryError> {
        let ctx = Self::target_context(catalog, &link)?;
        obs::record(CompileEvent::ExistsSubquery { model: ctx.name() });

        Ok(Self {
            catalog,
            counter,
            nodes: vec![QueryNode::new(ctx, counter.next(), Some(link))],
            outer_joins_rejected_in: Some("an exists subquery"),
        })
    }

    fn target_context(catalog: Catalog<'a>, link: &Link<'a>) -> Result<ModelContext<'a>, QueryError> {
        let relation = link.field.as_relation().ok_or_else(|| {
            QueryError::field(&link.parent_model.name, &link.field.name, "is not a relationship")
        })?;

        catalog
            .context(&relation.target_model)
            .map_err(|_| QueryError::Join {
                model: link.parent_model.name.clone(),
                field: link.field.name.clone(),
                target: relation.target_model.clone(),
            })
    }

    pub fn node(&self, id: NodeId) -> &QueryNode<'a> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut QueryNode<'a> {
        &mut self.nodes[id.0]
    }

    pub fn root(&self) -> &QueryNode<'a> {
        self.node(NodeId::ROOT)
    }

    /// Reject RIGHT and FULL joins added from here on.
    pub const fn reject_outer_joins(&mut self, context: &'static str) {
        self.outer_joins_rejected_in = Some(context);
    }

    /// Root-level soft-delete filtering is the caller's choice.
    pub fn set_root_ignore_soft_delete(&mut self, ignore: bool) {
        self.node_mut(NodeId::ROOT).ignore_soft_delete = ignore;
    }

    fn child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|c| self.node(*c).link.as_ref().is_some_and(|l| l.field.name == name))
    }

    fn create_child(&mut self, parent: NodeId, field: &'a Field, path: &str) -> Result<NodeId, QueryError> {
        let parent_node = self.node(parent);
        let link = Link {
            field,
            parent_alias: parent_node.alias(),
            parent_model: parent_node.ctx.model,
        };
        let ctx = Self::target_context(self.catalog, &link)?;

        let id = NodeId(self.nodes.len());
        let mut node = QueryNode::new(ctx, self.counter.next(), Some(link));
        node.join = Some(Join::new(path));
        node.parent = Some(parent);

        tracing::trace!(alias = %node.alias(), model = ctx.name(), path, "join node created");
        obs::record(CompileEvent::JoinNodeCreated { model: ctx.name() });

        self.nodes.push(node);
        self.node_mut(parent).children.push(id);

        Ok(id)
    }

    /// Walk `path` from `from`, materializing relationship nodes when
    /// `create` is set.
    pub fn get_or_create_node(
        &mut self,
        from: NodeId,
        path: &str,
        create: bool,
        checked: bool,
        allow_wildcard: bool,
    ) -> Result<(NodeId, Target<'a>), QueryError> {
        let segments = path.split('.').collect::<Vec<_>>();
        let mut node = from;

        for (i, segment) in segments.iter().copied().enumerate() {
            let ctx = self.node(node).ctx;
            let last = i + 1 == segments.len();

            if segment == "*" {
                if allow_wildcard && last {
                    return Ok((node, Target::Wildcard));
                }
                return Err(QueryError::field(ctx.name(), path, "wildcard is not allowed here"));
            }

            let field = ctx.field(segment, checked)?;
            match &field.kind {
                FieldKind::Basic(_) | FieldKind::Group(_) if last => {
                    return Ok((node, Target::Field(field)));
                }
                FieldKind::Basic(_) => return Err(scalar_prefix(ctx.name(), segment, path)),
                FieldKind::Group(group) => {
                    return match &segments[i + 1..] {
                        ["*"] if allow_wildcard => Ok((node, Target::GroupWildcard(field))),
                        [sub] => group
                            .sub_field(sub)
                            .map(|b| (node, Target::SubField(field, b)))
                            .ok_or_else(|| {
                                QueryError::field(ctx.name(), path, "group sub-field does not exist")
                            }),
                        _ => Err(QueryError::field(
                            ctx.name(),
                            path,
                            "group fields have a single level of sub-fields",
                        )),
                    };
                }
                FieldKind::ToOne(_) | FieldKind::ToMany(_) => {
                    node = match self.child_named(node, segment) {
                        Some(child) => child,
                        None if create => {
                            let joined = segments[..=i].join(".");
                            self.create_child(node, field, &joined)?
                        }
                        None => {
                            return Err(QueryError::field(ctx.name(), path, "relationship is not joined"));
                        }
                    };
                    if last {
                        return Ok((node, Target::Field(field)));
                    }
                }
            }
        }

        Err(QueryError::field(self.node(from).ctx.name(), path, "empty field path"))
    }

    /// Read-only resolution against nodes that already exist.
    pub fn find(&self, from: NodeId, path: &str, checked: bool) -> Result<(NodeId, Target<'a>), QueryError> {
        let segments = path.split('.').collect::<Vec<_>>();
        let mut node = from;

        for (i, segment) in segments.iter().copied().enumerate() {
            let ctx = self.node(node).ctx;
            let field = ctx.field(segment, checked)?;
            let last = i + 1 == segments.len();

            match &field.kind {
                FieldKind::Basic(_) | FieldKind::Group(_) if last => {
                    return Ok((node, Target::Field(field)));
                }
                FieldKind::Group(group) if i + 2 == segments.len() => {
                    let sub = group.sub_field(segments[i + 1]).ok_or_else(|| {
                        QueryError::field(ctx.name(), path, "group sub-field does not exist")
                    })?;
                    return Ok((node, Target::SubField(field, sub)));
                }
                FieldKind::Basic(_) | FieldKind::Group(_) => {
                    return Err(scalar_prefix(ctx.name(), segment, path));
                }
                FieldKind::ToOne(_) | FieldKind::ToMany(_) => {
                    node = self.child_named(node, segment).ok_or_else(|| {
                        QueryError::field(ctx.name(), path, "relationship is not joined")
                    })?;
                    if last {
                        return Ok((node, Target::Field(field)));
                    }
                }
            }
        }

        Err(QueryError::field(self.node(from).ctx.name(), path, "empty field path"))
    }

    /// Apply explicit joins in field-path order.
    pub fn add_joins(&mut self, joins: &[Join]) -> Result<(), QueryError> {
        let mut sorted = joins.iter().collect::<Vec<_>>();
        sorted.sort_by(|a, b| a.field_path.cmp(&b.field_path));

        for join in sorted {
            if let Some(context) = self.outer_joins_rejected_in
                && matches!(join.join_type, JoinType::Right | JoinType::Full)
            {
                return Err(QueryError::join_field(
                    self.root().ctx.name(),
                    &join.field_path,
                    format!("{} JOIN is not allowed in {context}", join.join_type),
                ));
            }

            let (node, target) = self.get_or_create_node(NodeId::ROOT, &join.field_path, true, true, false)?;
            if !matches!(target, Target::Field(f) if f.is_relation()) {
                return Err(QueryError::join_field(
                    self.root().ctx.name(),
                    &join.field_path,
                    "join path must end at a relationship field",
                ));
            }

            let on_paths = join
                .condition
                .as_ref()
                .map(Condition::join_paths)
                .unwrap_or_default();
            let entry = self.node_mut(node);
            entry.ignore_soft_delete = join.ignore_logic_delete;
            entry.join = Some(join.clone());
            self.add_paths_from(node, on_paths, true)?;
        }

        Ok(())
    }

    /// Materialize nodes for paths referenced from the root, in sorted order.
    pub fn add_paths<I, S>(&mut self, paths: I, checked: bool) -> Result<(), QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_paths_from(NodeId::ROOT, paths, checked)
    }

    fn add_paths_from<I, S>(&mut self, from: NodeId, paths: I, checked: bool) -> Result<(), QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sorted = paths
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .filter(|p| !p.is_empty())
            .collect::<BTreeSet<_>>();

        for path in sorted {
            self.get_or_create_node(from, &path, true, checked, false)?;
        }

        Ok(())
    }

    /// Materialize paths used by each node's soft-delete and data-rights
    /// predicate. Runs unchecked; nodes created here do not get a pass of
    /// their own.
    pub fn add_additional_paths(&mut self) -> Result<(), QueryError> {
        let existing = self.nodes.len();
        for index in 0..existing {
            let node = &self.nodes[index];
            let paths = node
                .ctx
                .additional_condition(node.ignore_soft_delete)
                .map(|c| c.join_paths())
                .unwrap_or_default();
            self.add_paths_from(NodeId(index), paths, false)?;
        }

        Ok(())
    }

    /// Record the select list. `None` selects every permitted, selectable
    /// field of every node.
    pub fn add_select_fields(&mut self, fields: Option<&[String]>) -> Result<(), QueryError> {
        let Some(fields) = fields else {
            self.select_default(NodeId::ROOT, true);
            return Ok(());
        };

        let mut touched = vec![NodeId::ROOT];
        for path in fields {
            let (node, target) = self.get_or_create_node(NodeId::ROOT, path, true, true, true)?;
            touched.push(node);

            match target {
                Target::Field(f) => match &f.kind {
                    FieldKind::Basic(_) => self.select(node, &f.name, Selection::Whole),
                    FieldKind::Group(g) => {
                        let subs = g.fields.iter().map(|b| b.name.clone()).collect();
                        self.select(node, &f.name, Selection::SubFields(subs));
                    }
                    FieldKind::ToOne(_) | FieldKind::ToMany(_) => self.select_default(node, false),
                },
                Target::SubField(f, sub) => {
                    let subs = BTreeSet::from([sub.name.clone()]);
                    self.select(node, &f.name, Selection::SubFields(subs));
                }
                Target::Wildcard => self.select_default(node, false),
                Target::GroupWildcard(f) => {
                    let subs = f
                        .as_group()
                        .map(|g| g.fields.iter().map(|b| b.name.clone()).collect())
                        .unwrap_or_default();
                    self.select(node, &f.name, Selection::SubFields(subs));
                }
            }
        }

        // keys of every node on a selected path
        let mut keyed = BTreeSet::new();
        for mut node in touched {
            loop {
                if keyed.insert(node.0) {
                    let model = self.node(node).ctx.model;
                    for pk in &model.primary_key {
                        self.select(node, pk, Selection::Whole);
                    }
                }
                match self.node(node).parent {
                    Some(parent) => node = parent,
                    None => break,
                }
            }
        }

        Ok(())
    }

    fn select(&mut self, node: NodeId, field: &str, selection: Selection) {
        match self.node_mut(node).selected.entry(field.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(selection);
            }
            Entry::Occupied(mut entry) => match (entry.get_mut(), selection) {
                (Selection::SubFields(existing), Selection::SubFields(more)) => existing.extend(more),
                (current, Selection::Whole) => *current = Selection::Whole,
                (Selection::Whole, Selection::SubFields(_)) => {}
            },
        }
    }

    fn select_default(&mut self, node: NodeId, recursive: bool) {
        let ctx = self.node(node).ctx;
        let defaults = ctx
            .permitted_fields()
            .filter(|f| f.is_selectable())
            .map(|field| {
                let selection = match &field.kind {
                    FieldKind::Group(g) => Selection::SubFields(
                        g.fields
                            .iter()
                            .filter(|b| b.select)
                            .map(|b| b.name.clone())
                            .collect(),
                    ),
                    _ => Selection::Whole,
                };
                (field.name.as_str(), selection)
            })
            .collect::<Vec<_>>();

        for (name, selection) in defaults {
            self.select(node, name, selection);
        }

        if recursive {
            for child in self.node(node).children.clone() {
                self.select_default(child, true);
            }
        }
    }
}

fn scalar_prefix(model: &str, segment: &str, path: &str) -> QueryError {
    QueryError::field(
        model,
        segment,
        format!("is not a relationship; cannot resolve '{path}'"),
    )
}
