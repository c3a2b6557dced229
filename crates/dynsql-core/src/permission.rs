use crate::condition::Condition;
use std::collections::{BTreeMap, HashMap};

///
/// Permission
///
/// Per-model access rules. `field_rights` is an allow-list of field names;
/// `None` permits every field. `data_rights` is an extra row filter.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Permission {
    pub field_rights: Option<Vec<String>>,
    pub data_rights: Option<Condition>,
}

impl Permission {
    #[must_use]
    pub fn fields<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            field_rights: Some(fields.into_iter().map(Into::into).collect()),
            data_rights: None,
        }
    }

    #[must_use]
    pub fn with_data_rights(mut self, condition: Condition) -> Self {
        self.data_rights = Some(condition);
        self
    }

    #[must_use]
    pub fn allows(&self, field: &str) -> bool {
        self.field_rights
            .as_ref()
            .is_none_or(|rights| rights.iter().any(|r| r == field))
    }
}

///
/// PermissionProvider
///

pub trait PermissionProvider {
    fn permission(&self, model: &str) -> Option<&Permission>;
}

/// No restrictions.
impl PermissionProvider for () {
    fn permission(&self, _model: &str) -> Option<&Permission> {
        None
    }
}

impl PermissionProvider for BTreeMap<String, Permission> {
    fn permission(&self, model: &str) -> Option<&Permission> {
        self.get(model)
    }
}

impl PermissionProvider for HashMap<String, Permission> {
    fn permission(&self, model: &str) -> Option<&Permission> {
        self.get(model)
    }
}

///
/// TESTS
///
