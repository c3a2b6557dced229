//! Query request shapes consumed by the compiler.

mod aggregate;

pub use aggregate::{AggFunction, AggSelectItem};

use crate::{condition::Condition, value::Value};
use derive_more::Display;

///
/// JoinType
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum JoinType {
    #[default]
    #[display("LEFT")]
    Left,
    #[display("RIGHT")]
    Right,
    #[display("INNER")]
    Inner,
    #[display("FULL")]
    Full,
}

///
/// Join
///

#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub field_path: String,
    pub join_type: JoinType,
    /// Extra predicate appended to the ON clause.
    pub condition: Option<Condition>,
    pub ignore_logic_delete: bool,
}

impl Join {
    #[must_use]
    pub fn new(field_path: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            join_type: JoinType::Left,
            condition: None,
            ignore_logic_delete: false,
        }
    }

    #[must_use]
    pub fn inner(field_path: impl Into<String>) -> Self {
        Self::new(field_path).with_type(JoinType::Inner)
    }

    #[must_use]
    pub const fn with_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub const fn ignore_logic_delete(mut self) -> Self {
        self.ignore_logic_delete = true;
        self
    }
}

///
/// Page
///
/// `current` is 1-based. A `size` of zero means unbounded.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Page {
    pub current: u32,
    pub size: u32,
}

impl Page {
    #[must_use]
    pub const fn new(current: u32, size: u32) -> Self {
        Self { current, size }
    }

    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        self.size == 0
    }

    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.size) * u64::from(self.current.saturating_sub(1))
    }
}

///
/// OrderItem
///

#[derive(Clone, Debug, PartialEq)]
pub struct OrderItem {
    pub field: Option<String>,
    pub asc: bool,
    /// Ordering expression over `$COL` and `EXPR`; replaces the bare column.
    pub function_template: Option<String>,
    pub function_value: Option<Value>,
}

impl OrderItem {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            asc: true,
            function_template: None,
            function_value: None,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            asc: false,
            ..Self::asc(field)
        }
    }

    #[must_use]
    pub fn function(
        field: Option<String>,
        template: impl Into<String>,
        value: Option<Value>,
    ) -> Self {
        Self {
            field,
            asc: true,
            function_template: Some(template.into()),
            function_value: value,
        }
    }

    #[must_use]
    pub const fn descending(mut self) -> Self {
        self.asc = false;
        self
    }
}

///
/// CustomSelectField
///
/// Computed select column. `$COL[n]` refers to `fields[n]` and `EXPR` to
/// `value`.
///

#[derive(Clone, Debug, PartialEq)]
pub struct CustomSelectField {
    pub name: String,
    pub sql_template: String,
    pub fields: Vec<String>,
    pub value: Option<Value>,
}

impl CustomSelectField {
    #[must_use]
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        sql_template: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
        value: Option<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            sql_template: sql_template.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            value,
        }
    }
}

///
/// QueryRequest
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryRequest {
    pub condition: Option<Condition>,
    pub joins: Vec<Join>,
    /// `None` selects every permitted, select-enabled field.
    pub select_fields: Option<Vec<String>>,
    pub custom_select_fields: Vec<CustomSelectField>,
    pub order_items: Vec<OrderItem>,
    pub page: Option<Page>,
    pub ignore_logic_delete: bool,
    /// Group relationship columns as associations/collections.
    /// `None` uses the engine default.
    pub nested: Option<bool>,
}

impl QueryRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn with_join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    #[must_use]
    pub fn with_select<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.select_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_custom_select(mut self, field: CustomSelectField) -> Self {
        self.custom_select_fields.push(field);
        self
    }

    #[must_use]
    pub fn with_order(mut self, item: OrderItem) -> Self {
        self.order_items.push(item);
        self
    }

    #[must_use]
    pub const fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub const fn ignore_logic_delete(mut self) -> Self {
        self.ignore_logic_delete = true;
        self
    }

    #[must_use]
    pub const fn nested(mut self, nested: bool) -> Self {
        self.nested = Some(nested);
        self
    }
}

///
/// AggregateRequest
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateRequest {
    pub items: Vec<AggSelectItem>,
    pub condition: Option<Condition>,
    pub joins: Vec<Join>,
    pub order_items: Vec<OrderItem>,
    pub page: Option<Page>,
    pub ignore_logic_delete: bool,
}

///
/// Direction
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum Direction {
    /// Expand descendants of the initial nodes.
    #[default]
    #[display("down")]
    Down,
    /// Expand ancestors of the initial nodes.
    #[display("up")]
    Up,
}

///
/// RecursiveRequest
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecursiveRequest {
    pub query: QueryRequest,
    /// Anchor rows; empty disables recursion.
    pub init_condition: Option<Condition>,
    pub direction: Direction,
}

///
/// VectorSearchRequest
///

#[derive(Clone, Debug, PartialEq)]
pub struct VectorSearchRequest {
    pub embedding_field: String,
    pub query_vector: Vec<f32>,
    pub top_n: u32,
    pub max_distance: Option<f64>,
    pub condition: Option<Condition>,
    pub select_fields: Option<Vec<String>>,
    /// Select the distance itself under this name.
    pub distance_field: Option<String>,
}

impl VectorSearchRequest {
    #[must_use]
    pub fn new(embedding_field: impl Into<String>, query_vector: Vec<f32>, top_n: u32) -> Self {
        Self {
            embedding_field: embedding_field.into(),
            query_vector,
            top_n,
            max_distance: None,
            condition: None,
            select_fields: None,
            distance_field: None,
        }
    }
}

///
/// TESTS
///
