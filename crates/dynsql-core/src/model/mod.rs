//! Read-only model metadata.
//!
//! Models are registered once and shared across compile calls; nothing in
//! the compiler mutates them.

mod field;

pub use field::{BasicField, Field, FieldKind, GroupField, RelationField};

use crate::error::QueryError;
use std::collections::BTreeMap;

/// Reserved field name that turns on soft-delete filtering for a model.
pub const DELETE_FLAG_FIELD: &str = "delete_flag";

///
/// Model
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Model {
    pub name: String,
    pub schema: Option<String>,
    pub table: String,
    pub primary_key: Vec<String>,
    pub fields: Vec<Field>,
}

impl Model {
    #[must_use]
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            table: table.into(),
            primary_key: vec!["id".to_string()],
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn with_primary_key<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.primary_key = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// `schema.table`, or the bare table when no schema is set.
    #[must_use]
    pub fn schema_and_table(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table),
            None => self.table.clone(),
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn basic_field(&self, name: &str) -> Option<&BasicField> {
        self.field(name).and_then(Field::as_basic)
    }

    #[must_use]
    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key.iter().any(|pk| pk == name)
    }

    #[must_use]
    pub fn is_soft_delete(&self) -> bool {
        self.basic_field(DELETE_FLAG_FIELD).is_some()
    }

    /// Basic fields backing the primary key, in key order.
    pub fn primary_key_fields(&self) -> Result<Vec<&BasicField>, QueryError> {
        self.basic_fields(&self.primary_key)
    }

    /// Resolve a list of field names to basic fields of this model.
    pub fn basic_fields<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&BasicField>, QueryError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.basic_field(name)
                    .ok_or_else(|| QueryError::field(&self.name, name, "is not a basic field"))
            })
            .collect()
    }

    /// Columns that link a row to its parent in a self-referencing tree.
    ///
    /// Taken from the unique to-one field targeting this model, otherwise
    /// from the unique to-many field targeting this model.
    pub fn parent_id_fields(&self) -> Result<Vec<&BasicField>, QueryError> {
        if let Some(parent) = self.unique_self_relation(|k| matches!(k, FieldKind::ToOne(_))) {
            return self.basic_fields(&parent.join_fields);
        }
        if let Some(children) = self.unique_self_relation(|k| matches!(k, FieldKind::ToMany(_))) {
            return self.basic_fields(&children.join_fields);
        }

        Err(QueryError::RecursiveField {
            model: self.name.clone(),
        })
    }

    fn unique_self_relation(&self, kind: impl Fn(&FieldKind) -> bool) -> Option<&RelationField> {
        let mut found = self
            .fields
            .iter()
            .filter(|f| kind(&f.kind))
            .filter_map(Field::as_relation)
            .filter(|r| r.target_model == self.name);

        match (found.next(), found.next()) {
            (Some(rel), None) => Some(rel),
            _ => None,
        }
    }
}

///
/// ModelProvider
///
/// Lookup of registered models by name.
///

pub trait ModelProvider {
    fn model(&self, name: &str) -> Option<&Model>;
}

///
/// ModelRegistry
///
/// Immutable after construction; safe to share across threads.
///

#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Model>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(mut self, model: Model) -> Self {
        self.register(model);
        self
    }

    pub fn register(&mut self, model: Model) {
        self.models.insert(model.name.clone(), model);
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }
}

impl ModelProvider for ModelRegistry {
    fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }
}

impl<T: ModelProvider + ?Sized> ModelProvider for &T {
    fn model(&self, name: &str) -> Option<&Model> {
        (**self).model(name)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn department() -> Model {
        Model::new("Department", "department")
            .with_field(Field::basic("id"))
            .with_field(Field::basic("parentId"))
            .with_field(Field::basic("name"))
            .with_field(Field::to_one("parent", "Department", ["parentId"]))
    }

    #[test]
    fn basic_columns_default_to_snake_case() {
        let model = department();

        assert_eq!(model.basic_field("parentId").unwrap().column, "parent_id");
    }

    #[test]
    fn group_sub_fields_are_prefixed() {
        let field = Field::group("homeAddress", [BasicField::new("city")]);
        let group = field.as_group().unwrap();

        assert_eq!(group.sub_field("city").unwrap().column, "home_address_city");
    }

    #[test]
    fn parent_id_fields_prefer_to_one() {
        let model = department();
        let fields = model.parent_id_fields().unwrap();

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "parentId");
    }

    #[test]
    fn parent_id_fields_fall_back_to_to_many() {
        let model = Model::new("Node", "node")
            .with_field(Field::basic("id"))
            .with_field(Field::basic("owner"))
            .with_field(Field::to_many("children", "Node", ["owner"]));

        assert_eq!(model.parent_id_fields().unwrap()[0].column, "owner");
    }

    #[test]
    fn parent_id_fields_require_self_reference() {
        let model = Model::new("User", "users").with_field(Field::basic("id"));

        assert!(matches!(
            model.parent_id_fields(),
            Err(QueryError::RecursiveField { .. })
        ));
    }

    #[test]
    fn schema_prefixes_table() {
        let model = Model::new("User", "users").with_schema("app");

        assert_eq!(model.schema_and_table(), "app.users");
        assert!(!model.is_soft_delete());
    }
}
