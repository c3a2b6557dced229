use crate::{
    condition::Condition,
    dialect::Dialect,
    error::QueryError,
    model::{DELETE_FLAG_FIELD, Field, Model, ModelProvider},
    permission::{Permission, PermissionProvider},
};

///
/// Catalog
///
/// Read-only inputs shared by every node of one compile call.
///

#[derive(Clone, Copy)]
pub(crate) struct Catalog<'a> {
    pub models: &'a dyn ModelProvider,
    pub permissions: &'a dyn PermissionProvider,
    pub dialect: Dialect,
}

impl<'a> Catalog<'a> {
    pub fn context(&self, model: &str) -> Result<ModelContext<'a>, QueryError> {
        let models = self.models;
        let model = models
            .model(model)
            .ok_or_else(|| QueryError::UnknownModel(model.to_string()))?;

        Ok(self.context_for(model))
    }

    pub fn context_for(&self, model: &'a Model) -> ModelContext<'a> {
        let permissions = self.permissions;

        ModelContext {
            model,
            permission: permissions.permission(&model.name),
        }
    }
}

///
/// ModelContext
///
/// A model paired with the caller's permission for it.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct ModelContext<'a> {
    pub model: &'a Model,
    pub permission: Option<&'a Permission>,
}

impl<'a> ModelContext<'a> {
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.model.name
    }

    /// Primary-key fields are always permitted.
    #[must_use]
    pub fn is_permitted(&self, field: &str) -> bool {
        self.model.is_primary_key(field) || self.permission.is_none_or(|p| p.allows(field))
    }

    /// Look up a field, enforcing the allow-list when `checked`.
    pub fn field(&self, name: &str, checked: bool) -> Result<&'a Field, QueryError> {
        let model = self.model;
        let field = model
            .field(name)
            .ok_or_else(|| QueryError::field(&model.name, name, "does not exist"))?;

        if checked && !self.is_permitted(name) {
            return Err(QueryError::field(&model.name, name, "is not permitted"));
        }

        Ok(field)
    }

    pub fn permitted_fields(&self) -> impl Iterator<Item = &'a Field> + '_ {
        let model = self.model;
        model.fields.iter().filter(|f| self.is_permitted(&f.name))
    }

    /// Soft-delete and data-rights predicate applied to every read of this
    /// model.
    #[must_use]
    pub fn additional_condition(&self, ignore_soft_delete: bool) -> Option<Condition> {
        let soft_delete = (!ignore_soft_delete && self.model.is_soft_delete())
            .then(soft_delete_condition);
        let data_rights = self.permission.and_then(|p| p.data_rights.clone());

        Condition::and_optional(soft_delete, data_rights)
    }
}

/// `delete_flag = false`
#[must_use]
pub(crate) fn soft_delete_condition() -> Condition {
    Condition::eq(DELETE_FLAG_FIELD, false)
}
