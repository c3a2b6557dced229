use crate::model::{BasicField, DELETE_FLAG_FIELD, Field, Model, ModelRegistry};

///
/// Sample schema shared by unit tests.
///
/// User -> dept (Department) -> company (Company)
/// User -> orders (Order) -> items (LineItem)
/// Department -> parent (Department)
///

pub fn company() -> Model {
    Model::new("Company", "company")
        .with_field(Field::basic("id"))
        .with_field(Field::basic("name"))
}

pub fn department() -> Model {
    Model::new("Department", "department")
        .with_field(Field::basic("id"))
        .with_field(Field::basic("name"))
        .with_field(Field::basic("parentId"))
        .with_field(Field::basic("companyId"))
        .with_field(Field::basic(DELETE_FLAG_FIELD))
        .with_field(Field::to_one("parent", "Department", ["parentId"]))
        .with_field(Field::to_one("company", "Company", ["companyId"]))
        .with_field(Field::to_many("employees", "User", ["deptId"]))
}

pub fn user() -> Model {
    Model::new("User", "users")
        .with_field(Field::basic("id"))
        .with_field(Field::basic("name"))
        .with_field(Field::basic("email"))
        .with_field(Field::from_basic(BasicField::new("salary").not_selected()))
        .with_field(Field::basic("deptId"))
        .with_field(Field::group(
            "homeAddress",
            [BasicField::new("city"), BasicField::new("street")],
        ))
        .with_field(Field::basic(DELETE_FLAG_FIELD))
        .with_field(Field::to_one("dept", "Department", ["deptId"]))
        .with_field(Field::to_many("orders", "Order", ["userId"]))
        .with_field(Field::to_one("manager", "Manager", ["managerId"]))
}

pub fn order() -> Model {
    Model::new("Order", "order_table")
        .with_field(Field::basic("id"))
        .with_field(Field::basic("userId"))
        .with_field(Field::basic("status"))
        .with_field(Field::basic("amount"))
        .with_field(Field::basic("embedding"))
        .with_field(Field::to_one("user", "User", ["userId"]))
        .with_field(Field::to_many("items", "LineItem", ["orderId"]))
}

pub fn line_item() -> Model {
    Model::new("LineItem", "line_item")
        .with_field(Field::basic("id"))
        .with_field(Field::basic("orderId"))
        .with_field(Field::basic("sku"))
}

/// `Manager` is referenced by `User.manager` but deliberately not
/// registered.
pub fn registry() -> ModelRegistry {
    ModelRegistry::new()
        .with_model(company())
        .with_model(department())
        .with_model(user())
        .with_model(order())
        .with_model(line_item())
}
