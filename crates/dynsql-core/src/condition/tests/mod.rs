
use crate::{
    condition::{Condition, Logic, add_bracket},
    dialect::{Dialect, SearchMode},
    error::QueryError,
    statement::ParamBag,
    value::Value,
};

fn render(condition: &Condition) -> (String, ParamBag) {
    let mut params = ParamBag::new();
    let sql = condition
        .sql("", None, Dialect::Mysql, &mut params)
        .unwrap();

    (sql, params)
}

fn render_err(condition: &Condition) -> QueryError {
    let mut params = ParamBag::new();

    condition
        .sql("", None, Dialect::Mysql, &mut params)
        .unwrap_err()
}

#[test]
fn simple_operators_bind_under_expression() {
    let mut params = ParamBag::new();
    let sql = Condition::eq("name", "Ann")
        .sql("c1", None, Dialect::Mysql, &mut params)
        .unwrap();

    assert_eq!(sql, "name = #{c1.v}");
    assert_eq!(params.get("c1.v"), Some(&Value::from("Ann")));

    let (sql, params) = render(&Condition::gte("age", 18));
    assert_eq!(sql, "age >= #{v}");
    assert_eq!(params.len(), 1);

    let (sql, params) = render(&Condition::is_null("age"));
    assert_eq!(sql, "age IS NULL");
    assert!(params.is_empty());

    let (sql, _) = render(&Condition::is_not_blank("name"));
    assert_eq!(sql, "(name IS NOT NULL AND name != '')");
}

#[test]
fn like_family_templates() {
    assert_eq!(
        render(&Condition::contains("name", "n")).0,
        "name LIKE CONCAT(CONCAT('%', #{v}), '%')"
    );
    assert_eq!(
        render(&Condition::starts_with("name", "A")).0,
        "name LIKE CONCAT(#{v}, '%')"
    );
    assert_eq!(
        render(&Condition::ends_with("name", "n")).0,
        "name LIKE CONCAT('%', #{v})"
    );
}

#[test]
fn in_expands_one_placeholder_per_element() {
    let (sql, params) = render(&Condition::in_("id", [1, 2, 3]));

    assert_eq!(sql, "id IN (#{v[0]},#{v[1]},#{v[2]})");
    assert_eq!(params.get("v[2]"), Some(&Value::Int(3)));

    let (sql, _) = render(&Condition::not_in("id", [7]));
    assert_eq!(sql, "id NOT IN (#{v[0]})");
}

#[test]
fn empty_collections_are_rejected() {
    for condition in [
        Condition::in_("id", Vec::<i64>::new()),
        Condition::not_in("id", Vec::<i64>::new()),
        Condition::eq_or_in("id", Value::List(vec![])),
        Condition::eq_or_in("id", Value::Null),
    ] {
        assert!(matches!(
            render_err(&condition),
            QueryError::ConditionParameter(_)
        ));
    }
}

#[test]
fn eq_or_in_picks_operator_by_arity() {
    let (sql, params) = render(&Condition::eq_or_in("id", 5));
    assert_eq!(sql, "id = #{v}");
    assert_eq!(params.get("v"), Some(&Value::Int(5)));

    let (sql, params) = render(&Condition::eq_or_in("id", vec![5]));
    assert_eq!(sql, "id = #{v}");
    assert_eq!(params.get("v"), Some(&Value::Int(5)));

    let (sql, _) = render(&Condition::eq_or_in("id", vec![5, 6]));
    assert_eq!(sql, "id IN (#{v[0]},#{v[1]})");
}

#[test]
fn ignore_if_empty_drops_the_leaf() {
    assert_eq!(render(&Condition::eq("name", "").ignore_if_empty()).0, "");
    assert_eq!(render(&Condition::eq("name", Value::Null).ignore_if_empty()).0, "");
    assert_eq!(
        render(&Condition::in_("id", Vec::<i64>::new()).ignore_if_empty()).0,
        ""
    );
    // operators without a value are never dropped
    assert_eq!(
        render(&Condition::is_null("name").ignore_if_empty()).0,
        "name IS NULL"
    );
    assert_eq!(render(&Condition::eq("", 1)).0, "");
}

#[test]
fn groups_bracket_only_multiple_members() {
    let (sql, params) = render(&Condition::and([
        Condition::eq("a", 1),
        Condition::or([Condition::eq("b", 2), Condition::eq("c", 3)]),
    ]));
    assert_eq!(
        sql,
        "(a = #{c[0].v} AND (b = #{c[1].c[0].v} OR c = #{c[1].c[1].v}))"
    );
    assert_eq!(params.len(), 3);

    assert_eq!(
        render(&Condition::and([Condition::eq("a", 1)])).0,
        "a = #{c[0].v}"
    );
    assert_eq!(
        render(&Condition::or([
            Condition::eq("a", "").ignore_if_empty(),
            Condition::eq("b", 2),
        ]))
        .0,
        "b = #{c[1].v}"
    );
    assert_eq!(render(&Condition::and([])).0, "");
}

#[test]
fn negation_brackets_and_skips_empty() {
    assert_eq!(render(&!Condition::eq("a", 1)).0, "(NOT a = #{c.v})");
    assert_eq!(
        render(&!(Condition::eq("a", 1) | Condition::eq("b", 2))).0,
        "(NOT (a = #{c.c[0].v} OR b = #{c.c[1].v}))"
    );
    assert_eq!(render(&!Condition::and([])).0, "");
}

#[test]
fn operators_build_groups() {
    let both = Condition::eq("a", 1) & Condition::eq("b", 2);

    assert_eq!(
        both,
        Condition::group(Logic::And, [Condition::eq("a", 1), Condition::eq("b", 2)])
    );
}

#[test]
fn custom_template_substitutes_columns_and_value() {
    let condition = Condition::custom(
        "COALESCE($COL[1], $COL[0]) BETWEEN #{EXPR[0]} AND #{EXPR[1]}",
        ["created", "updated"],
        Some(Value::from(vec![1, 9])),
    );

    let (sql, params) = render(&condition);

    assert_eq!(sql, "COALESCE(updated, created) BETWEEN #{v[0]} AND #{v[1]}");
    assert_eq!(params.get("v[1]"), Some(&Value::Int(9)));
    assert_eq!(params.get("v"), Some(&Value::from(vec![1, 9])));
}

#[test]
fn search_follows_dialect() {
    let condition = Condition::search("body", "rust", SearchMode::Default);
    let mut params = ParamBag::new();

    let sql = condition
        .sql("c1", None, Dialect::Postgresql, &mut params)
        .unwrap();
    assert_eq!(
        sql,
        "to_tsvector('chinese', body) @@ to_tsquery('chinese', #{c1.v})"
    );

    let err = condition
        .sql("c1", None, Dialect::H2, &mut params)
        .unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedOperation { .. }));
}

#[test]
fn exists_needs_a_resolver() {
    assert!(matches!(
        render_err(&Condition::exists("orders", None)),
        QueryError::ConditionParameter(_)
    ));
}

#[test]
fn join_paths_collect_leaves_and_exists_prefixes() {
    let condition = Condition::and([
        Condition::eq("dept.name", "R&D"),
        Condition::exists(
            "dept.employees",
            Some(Condition::eq("orders.status", "PAID")),
        ),
        Condition::exists("orders", None),
    ]);

    assert_eq!(condition.join_paths(), vec!["dept.name", "dept"]);
    assert_eq!(condition.exists_fields(), vec!["dept.employees", "orders"]);
}

#[test]
fn bracket_helper() {
    assert_eq!(add_bracket(""), "");
    assert_eq!(add_bracket("a = 1"), "(a = 1)");
    assert_eq!(add_bracket("(a = 1)"), "(a = 1)");
    assert_eq!(add_bracket("(a = 1) OR (b = 2)"), "((a = 1) OR (b = 2))");
}
