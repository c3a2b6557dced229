use convert_case::{Case, Casing};

///
/// Field
/// Runtime field metadata used by the join graph and the condition compiler.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Field {
    /// Field name as used in condition and select paths.
    pub name: String,
    pub kind: FieldKind,
}

///
/// FieldKind
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldKind {
    /// Single column.
    Basic(BasicField),
    /// Composite of columns addressed as `group.sub`.
    Group(GroupField),
    /// Many-to-one. `join_fields` are local FK fields pairing with the
    /// target's primary key.
    ToOne(RelationField),
    /// One-to-many. `join_fields` are target FK fields pairing with the
    /// local primary key.
    ToMany(RelationField),
}

///
/// BasicField
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BasicField {
    pub name: String,
    pub column: String,
    /// Included in default select lists.
    pub select: bool,
}

impl BasicField {
    /// Column defaults to the snake_case form of the field name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let column = name.to_case(Case::Snake);

        Self {
            name,
            column,
            select: true,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    #[must_use]
    pub const fn not_selected(mut self) -> Self {
        self.select = false;
        self
    }
}

///
/// GroupField
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupField {
    pub fields: Vec<BasicField>,
    pub select: bool,
}

impl GroupField {
    #[must_use]
    pub fn sub_field(&self, name: &str) -> Option<&BasicField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

///
/// RelationField
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationField {
    pub target_model: String,
    pub join_fields: Vec<String>,
}

impl Field {
    #[must_use]
    pub fn basic(name: impl Into<String>) -> Self {
        Self::from_basic(BasicField::new(name))
    }

    #[must_use]
    pub fn from_basic(basic: BasicField) -> Self {
        Self {
            name: basic.name.clone(),
            kind: FieldKind::Basic(basic),
        }
    }

    /// Sub-field columns are prefixed with the group's snake_case name.
    #[must_use]
    pub fn group(name: impl Into<String>, sub_fields: impl IntoIterator<Item = BasicField>) -> Self {
        let name = name.into();
        let prefix = name.to_case(Case::Snake);
        let fields = sub_fields
            .into_iter()
            .map(|mut f| {
                f.column = format!("{prefix}_{}", f.column);
                f
            })
            .collect();

        Self {
            name,
            kind: FieldKind::Group(GroupField {
                fields,
                select: true,
            }),
        }
    }

    #[must_use]
    pub fn to_one<S: Into<String>>(
        name: impl Into<String>,
        target_model: impl Into<String>,
        local_fields: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::ToOne(RelationField {
                target_model: target_model.into(),
                join_fields: local_fields.into_iter().map(Into::into).collect(),
            }),
        }
    }

    #[must_use]
    pub fn to_many<S: Into<String>>(
        name: impl Into<String>,
        target_model: impl Into<String>,
        target_fields: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::ToMany(RelationField {
                target_model: target_model.into(),
                join_fields: target_fields.into_iter().map(Into::into).collect(),
            }),
        }
    }

    #[must_use]
    pub const fn as_basic(&self) -> Option<&BasicField> {
        match &self.kind {
            FieldKind::Basic(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_group(&self) -> Option<&GroupField> {
        match &self.kind {
            FieldKind::Group(g) => Some(g),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_relation(&self) -> Option<&RelationField> {
        match &self.kind {
            FieldKind::ToOne(r) | FieldKind::ToMany(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_relation(&self) -> bool {
        self.as_relation().is_some()
    }

    #[must_use]
    pub const fn is_to_many(&self) -> bool {
        matches!(self.kind, FieldKind::ToMany(_))
    }

    /// Whether default select lists include this field.
    #[must_use]
    pub const fn is_selectable(&self) -> bool {
        match &self.kind {
            FieldKind::Basic(b) => b.select,
            FieldKind::Group(g) => g.select,
            FieldKind::ToOne(_) | FieldKind::ToMany(_) => false,
        }
    }

    #[must_use]
    pub fn not_selected(mut self) -> Self {
        match &mut self.kind {
            FieldKind::Basic(b) => b.select = false,
            FieldKind::Group(g) => g.select = false,
            FieldKind::ToOne(_) | FieldKind::ToMany(_) => {}
        }
        self
    }
}
