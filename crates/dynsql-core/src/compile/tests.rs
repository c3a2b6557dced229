use super::*;
use crate::{
    dialect::SearchMode,
    model::ModelRegistry,
    obs::{compile_report, compile_reset_all},
    permission::Permission,
    query::{
        AggFunction, AggSelectItem, CustomSelectField, Direction, JoinType, RecursiveRequest,
        VectorSearchRequest,
    },
    statement::PlaceholderStyle,
    test_fixtures::registry,
};
use std::collections::BTreeMap;

fn compiler<'a>(models: &'a ModelRegistry, dialect: Dialect) -> Compiler<'a> {
    Compiler::new(models, &(), EngineConfig::new(dialect))
}

fn department_tree(init: Option<Condition>, direction: Direction) -> RecursiveRequest {
    RecursiveRequest {
        query: QueryRequest::new(),
        init_condition: init,
        direction,
    }
}

const DEPT_CTE_COLUMNS: &str = "id, name, parent_id, company_id, delete_flag";
const DEPT_CTE_SELECT: &str = "t.id, t.name, t.parent_id, t.company_id, t.delete_flag";
const DEPT_OUTER_SELECT: &str =
    "t0.id AS `id`, t0.name AS `name`, t0.parent_id AS `parentId`, t0.company_id AS `companyId`";

//
// Query
//

#[test]
fn query_with_join_condition_order_and_page() {
    let models = registry();
    let request = QueryRequest::new()
        .with_select(["name", "dept.name"])
        .with_condition(Condition::eq("dept.name", "R&D"))
        .with_order(OrderItem::asc("name"))
        .with_page(Page::new(2, 10));

    let statement = compiler(&models, Dialect::Mysql)
        .compile_query("User", &request)
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT t0.id AS `id`, t0.name AS `name`, t1.id AS `dept.id`, t1.name AS `dept.name` \
         FROM users AS t0 \
         LEFT JOIN department AS t1 ON t1.id = t0.dept_id AND t1.delete_flag = #{j10.v} \
         WHERE (t0.delete_flag = #{c0.v} AND t1.name = #{c1.v}) \
         ORDER BY t0.name \
         LIMIT #{_rows} OFFSET #{_offset}"
    );
    assert_eq!(statement.kind, StatementKind::Query);
    assert_eq!(statement.params.get("c1.v"), Some(&Value::from("R&D")));
    assert_eq!(statement.params.get(ROWS_PARAM), Some(&Value::Uint(10)));
    assert_eq!(statement.params.get(OFFSET_PARAM), Some(&Value::Uint(10)));
}

#[test]
fn first_page_binds_no_offset() {
    let models = registry();
    let request = QueryRequest::new().with_page(Page::new(1, 25));

    let statement = compiler(&models, Dialect::Mysql)
        .compile_query("Company", &request)
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT t0.id AS `id`, t0.name AS `name` FROM company AS t0 LIMIT #{_rows}"
    );
    assert!(statement.params.get(OFFSET_PARAM).is_none());
}

#[test]
fn unbounded_page_has_no_limit() {
    let models = registry();
    let request = QueryRequest::new().with_page(Page::new(4, 0));

    let statement = compiler(&models, Dialect::Mysql)
        .compile_query("Company", &request)
        .unwrap();

    assert_eq!(statement.sql, "SELECT t0.id AS `id`, t0.name AS `name` FROM company AS t0");
    assert!(statement.params.is_empty());
}

#[test]
fn oracle_paging_and_quoting() {
    let models = registry();
    let request = QueryRequest::new().with_page(Page::new(3, 20));

    let statement = compiler(&models, Dialect::Oracle)
        .compile_query("Company", &request)
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT t0.id AS \"id\", t0.name AS \"name\" FROM company AS t0 \
         OFFSET #{_offset} ROWS FETCH NEXT #{_rows} ROWS ONLY"
    );
    assert_eq!(statement.params.get(OFFSET_PARAM), Some(&Value::Uint(40)));
}

#[test]
fn page_size_is_clamped_by_config() {
    let models = registry();
    let config = EngineConfig {
        max_page_size: Some(50),
        ..EngineConfig::new(Dialect::Mysql)
    };
    let compiler = Compiler::new(&models, &(), config);

    let statement = compiler
        .compile_query("Company", &QueryRequest::new().with_page(Page::new(2, 1000)))
        .unwrap();

    assert_eq!(statement.params.get(ROWS_PARAM), Some(&Value::Uint(50)));
    assert_eq!(statement.params.get(OFFSET_PARAM), Some(&Value::Uint(50)));
}

#[test]
fn ignore_logic_delete_drops_root_predicate() {
    let models = registry();
    let request = QueryRequest::new()
        .with_select(["name"])
        .ignore_logic_delete();

    let statement = compiler(&models, Dialect::Mysql)
        .compile_query("User", &request)
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT t0.id AS `id`, t0.name AS `name` FROM users AS t0"
    );
}

#[test]
fn custom_select_and_function_order() {
    let models = registry();
    let request = QueryRequest::new()
        .with_select(["status"])
        .with_custom_select(CustomSelectField::new(
            "discounted",
            "$COL[0] * #{EXPR}",
            ["amount"],
            Some(Value::from(0.9)),
        ))
        .with_order(OrderItem::desc("amount"));

    let statement = compiler(&models, Dialect::Postgresql)
        .compile_query("Order", &request)
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT t0.id AS \"id\", t0.status AS \"status\", t0.amount * #{select[0].v} AS \"discounted\" \
         FROM order_table AS t0 ORDER BY t0.amount DESC"
    );
    assert_eq!(statement.params.get("select[0].v"), Some(&Value::Float64(0.9)));
}

#[test]
fn nested_select_keeps_sql_and_groups_columns() {
    let models = registry();
    let request = QueryRequest::new().with_select(["name", "orders.status"]);
    let compiler = compiler(&models, Dialect::Mysql);

    let flat = compiler.compile_query("User", &request).unwrap();
    let nested = compiler
        .compile_query("User", &request.clone().nested(true))
        .unwrap();

    assert_eq!(flat.sql, nested.sql);
    assert!(matches!(
        nested.columns.last(),
        Some(SelectColumn::Collection { property, .. }) if property == "orders"
    ));
    assert_eq!(flat.columns.len(), 4);
}

#[test]
fn search_condition_uses_dialect_template() {
    let models = registry();
    let request = QueryRequest::new()
        .with_select(["name"])
        .with_condition(Condition::search("name", "ann", SearchMode::Boolean))
        .ignore_logic_delete();

    let statement = compiler(&models, Dialect::Mysql)
        .compile_query("User", &request)
        .unwrap();
    assert!(
        statement
            .sql
            .ends_with("WHERE MATCH (t0.name) AGAINST (#{c1.v} IN BOOLEAN MODE)")
    );

    let err = compiler(&models, Dialect::Postgresql)
        .compile_query("User", &request)
        .unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedOperation { .. }));
}

#[test]
fn permissions_restrict_query_fields() {
    let models = registry();
    let permissions = BTreeMap::from([("User".to_string(), Permission::fields(["name"]))]);
    let compiler = Compiler::new(&models, &permissions, EngineConfig::default());

    let err = compiler
        .compile_query("User", &QueryRequest::new().with_select(["email"]))
        .unwrap_err();
    assert!(matches!(err, QueryError::FieldParameter { .. }));

    let err = compiler
        .compile_query(
            "User",
            &QueryRequest::new().with_condition(Condition::eq("email", "a@b.c")),
        )
        .unwrap_err();
    assert!(matches!(err, QueryError::FieldParameter { .. }));

    let statement = compiler.compile_query("User", &QueryRequest::new()).unwrap();
    assert!(statement.sql.starts_with("SELECT t0.id AS `id`, t0.name AS `name` FROM users AS t0"));
}

#[test]
fn data_rights_join_their_own_paths() {
    let models = registry();
    let permissions = BTreeMap::from([(
        "User".to_string(),
        Permission::fields(["name", "deptId"]).with_data_rights(Condition::eq("dept.name", "R&D")),
    )]);
    let compiler = Compiler::new(&models, &permissions, EngineConfig::default());

    let statement = compiler.compile_count("User", None, &[], false).unwrap();

    assert_eq!(
        statement.sql,
        "SELECT COUNT(*) AS `count` FROM users AS t0 \
         LEFT JOIN department AS t1 ON t1.id = t0.dept_id AND t1.delete_flag = #{j10.v} \
         WHERE (t0.delete_flag = #{c0.c[0].v} AND t1.name = #{c0.c[1].v})"
    );
}

#[test]
fn unknown_model_is_reported() {
    let models = registry();

    let err = compiler(&models, Dialect::Mysql)
        .compile_query("Invoice", &QueryRequest::new())
        .unwrap_err();

    assert_eq!(err, QueryError::UnknownModel("Invoice".to_string()));
}

//
// Count / exists / aggregate
//

#[test]
fn count_statement() {
    let models = registry();
    let condition = Condition::eq("name", "Ann");

    let statement = compiler(&models, Dialect::Mysql)
        .compile_count("User", Some(&condition), &[], false)
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT COUNT(*) AS `count` FROM users AS t0 \
         WHERE (t0.delete_flag = #{c0.v} AND t0.name = #{c1.v})"
    );
    assert_eq!(statement.kind, StatementKind::Count);
    assert_eq!(statement.columns, vec![SelectColumn::column("COUNT(*)", "count")]);
}

#[test]
fn count_keeps_explicit_inner_join() {
    let models = registry();

    let statement = compiler(&models, Dialect::Mysql)
        .compile_count("User", None, &[Join::inner("orders")], true)
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT COUNT(*) AS `count` FROM users AS t0 INNER JOIN order_table AS t1 ON t1.user_id = t0.id"
    );
}

#[test]
fn exists_statement_limits_to_one_row() {
    let models = registry();
    let condition = Condition::eq("name", "Ann");

    let statement = compiler(&models, Dialect::Mysql)
        .compile_exists("User", Some(&condition), &[], true)
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT 1 FROM users AS t0 WHERE t0.name = #{c1.v} LIMIT #{_rows}"
    );
    assert_eq!(statement.params.get(ROWS_PARAM), Some(&Value::Uint(1)));
}

#[test]
fn exists_statement_rejects_right_and_full_joins() {
    let models = registry();
    let compiler = compiler(&models, Dialect::Mysql);

    for join_type in [JoinType::Right, JoinType::Full] {
        let err = compiler
            .compile_exists("User", None, &[Join::new("dept").with_type(join_type)], false)
            .unwrap_err();
        assert!(matches!(err, QueryError::JoinField { ref field, .. } if field == "dept"));
    }

    let left = compiler
        .compile_exists("User", None, &[Join::new("dept")], false)
        .unwrap();
    assert!(left.sql.contains(" LEFT JOIN department AS t1 "));

    let query = compiler
        .compile_query(
            "User",
            &QueryRequest::new().with_join(Join::new("dept").with_type(JoinType::Right)),
        )
        .unwrap();
    assert!(query.sql.contains(" RIGHT JOIN department AS t1 "));
}

#[test]
fn aggregate_groups_by_plain_columns() {
    let models = registry();
    let request = AggregateRequest {
        items: vec![
            AggSelectItem::group_by("dept.name"),
            AggSelectItem::count_all(),
            AggSelectItem::new("salary", AggFunction::Sum).with_alias("total"),
        ],
        ..AggregateRequest::default()
    };

    let statement = compiler(&models, Dialect::Mysql)
        .compile_aggregate("User", &request)
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT t1.name AS `dept.name`, COUNT(*) AS `count`, SUM(t0.salary) AS `total` \
         FROM users AS t0 \
         LEFT JOIN department AS t1 ON t1.id = t0.dept_id AND t1.delete_flag = #{j10.v} \
         WHERE t0.delete_flag = #{c0.v} \
         GROUP BY t1.name"
    );
}

#[test]
fn aggregate_custom_group_key_and_list_agg() {
    let models = registry();
    let request = AggregateRequest {
        items: vec![
            AggSelectItem::group_by("status")
                .with_custom_function("UPPER($COL)")
                .with_alias("state"),
            AggSelectItem::new("id", AggFunction::ListAggDistinct).with_alias("ids"),
        ],
        ..AggregateRequest::default()
    };

    let statement = compiler(&models, Dialect::Postgresql)
        .compile_aggregate("Order", &request)
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT UPPER(t0.status) AS \"state\", STRING_AGG(DISTINCT t0.id , ',') AS \"ids\" \
         FROM order_table AS t0 GROUP BY UPPER(t0.status)"
    );
}

//
// Delete
//

#[test]
fn delete_where_uses_bare_columns() {
    let models = registry();

    let statement = compiler(&models, Dialect::Mysql)
        .compile_delete_where("User", &Condition::eq("name", "Ann"), true)
        .unwrap();

    assert_eq!(statement.sql, "DELETE FROM users WHERE name = #{c1.v}");
    assert!(statement.columns.is_empty());
}

#[test]
fn delete_where_on_soft_delete_model_sets_the_flag() {
    let models = registry();

    let statement = compiler(&models, Dialect::Mysql)
        .compile_delete_where("Department", &Condition::eq("name", "R&D"), false)
        .unwrap();

    assert_eq!(
        statement.sql,
        "UPDATE department SET delete_flag = #{_delete_flag} WHERE name = #{c1.v}"
    );
    assert_eq!(statement.params.get(DELETE_FLAG_PARAM), Some(&Value::Bool(true)));
    assert_eq!(statement.params.get("c1.v"), Some(&Value::from("R&D")));
}

#[test]
fn delete_where_without_flag_column_is_physical() {
    let models = registry();
    let compiler = compiler(&models, Dialect::Mysql);

    let statement = compiler
        .compile_delete_where("Company", &Condition::eq("name", "Acme"), false)
        .unwrap();
    assert_eq!(statement.sql, "DELETE FROM company WHERE name = #{c1.v}");

    let forced = compiler
        .compile_delete_where("Department", &Condition::eq("name", "R&D"), true)
        .unwrap();
    assert_eq!(forced.sql, "DELETE FROM department WHERE name = #{c1.v}");
    assert_eq!(forced.params.get(DELETE_FLAG_PARAM), None);
}

#[test]
fn delete_where_applies_data_rights() {
    let models = registry();
    let permissions = BTreeMap::from([(
        "User".to_string(),
        Permission::fields(["name"]).with_data_rights(Condition::eq("deptId", 7)),
    )]);
    let compiler = Compiler::new(&models, &permissions, EngineConfig::default());

    let statement = compiler
        .compile_delete_where("User", &Condition::eq("name", "Ann"), false)
        .unwrap();

    assert_eq!(
        statement.sql,
        "UPDATE users SET delete_flag = #{_delete_flag} WHERE (dept_id = #{c0.v} AND name = #{c1.v})"
    );
}

#[test]
fn delete_where_rejects_empty_condition() {
    let models = registry();
    let compiler = compiler(&models, Dialect::Mysql);

    let err = compiler
        .compile_delete_where("User", &Condition::and([]), false)
        .unwrap_err();
    assert!(matches!(err, QueryError::ConditionParameter(_)));

    let err = compiler
        .compile_delete_where("User", &Condition::eq("name", "").ignore_if_empty(), false)
        .unwrap_err();
    assert!(matches!(err, QueryError::ConditionParameter(_)));

    let err = compiler
        .compile_delete_where("User", &Condition::eq("dept.name", "R&D"), false)
        .unwrap_err();
    assert!(matches!(err, QueryError::FieldParameter { .. }));
}

//
// Recursive
//

#[test]
fn recursive_down_builds_cte() {
    let models = registry();
    let request = department_tree(Some(Condition::eq("id", 1)), Direction::Down);

    let statement = compiler(&models, Dialect::Mysql)
        .compile_recursive("Department", &request)
        .unwrap();

    assert_eq!(
        statement.sql,
        format!(
            "WITH RECURSIVE t0({DEPT_CTE_COLUMNS}) AS (\
             SELECT {DEPT_CTE_SELECT} FROM department t \
             WHERE (t.delete_flag = #{{r_t00.v}} AND t.id = #{{r_t01.v}}) \
             UNION ALL SELECT {DEPT_CTE_SELECT} FROM department t \
             JOIN t0 ON t.delete_flag = #{{r_t02.v}} AND t.parent_id = t0.id) \
             SELECT {DEPT_OUTER_SELECT} FROM t0"
        )
    );
    assert_eq!(statement.kind, StatementKind::Recursive);
    assert_eq!(statement.params.get("r_t01.v"), Some(&Value::Int(1)));
}

#[test]
fn recursive_up_swaps_columns() {
    let models = registry();
    let request = department_tree(Some(Condition::eq("id", 5)), Direction::Up);

    let statement = compiler(&models, Dialect::Mysql)
        .compile_recursive("Department", &request)
        .unwrap();

    assert!(statement.sql.contains("JOIN t0 ON t.delete_flag = #{r_t02.v} AND t.id = t0.parent_id)"));
}

#[test]
fn recursive_on_oracle_omits_keyword() {
    let models = registry();
    let request = department_tree(Some(Condition::eq("id", 1)), Direction::Down);

    let statement = compiler(&models, Dialect::Oracle)
        .compile_recursive("Department", &request)
        .unwrap();

    assert!(statement.sql.starts_with("WITH t0("));
}

#[test]
fn recursive_count_wraps_cte() {
    let models = registry();
    let mut request = department_tree(Some(Condition::eq("id", 1)), Direction::Down);
    request.query = QueryRequest::new().with_condition(Condition::like("name", "R%"));

    let statement = compiler(&models, Dialect::Mysql)
        .compile_recursive_count("Department", &request)
        .unwrap();

    assert!(
        statement
            .sql
            .ends_with(") SELECT COUNT(*) AS `count` FROM t0 WHERE t0.name LIKE #{c1.v}")
    );
    assert_eq!(statement.kind, StatementKind::RecursiveCount);
}

#[test]
fn recursive_cte_projects_only_needed_columns() {
    let models = registry();
    let mut request = department_tree(Some(Condition::eq("id", 1)), Direction::Down);
    request.query = QueryRequest::new()
        .with_select(["name"])
        .ignore_logic_delete();

    let statement = compiler(&models, Dialect::Mysql)
        .compile_recursive("Department", &request)
        .unwrap();

    assert_eq!(
        statement.sql,
        "WITH RECURSIVE t0(id, name, parent_id) AS (\
         SELECT t.id, t.name, t.parent_id FROM department t WHERE t.id = #{r_t01.v} \
         UNION ALL SELECT t.id, t.name, t.parent_id FROM department t JOIN t0 ON t.parent_id = t0.id) \
         SELECT t0.id AS `id`, t0.name AS `name` FROM t0"
    );
}

#[test]
fn recursive_without_init_is_plain_query() {
    let models = registry();
    let compiler = compiler(&models, Dialect::Mysql);

    for init in [None, Some(Condition::eq("id", Value::Null).ignore_if_empty())] {
        let request = department_tree(init, Direction::Down);

        let statement = compiler.compile_recursive("Department", &request).unwrap();
        assert_eq!(statement.kind, StatementKind::Recursive);
        assert_eq!(
            statement.sql,
            format!("SELECT {DEPT_OUTER_SELECT} FROM department AS t0 WHERE t0.delete_flag = #{{c0.v}}")
        );

        let count = compiler.compile_recursive_count("Department", &request).unwrap();
        assert_eq!(count.kind, StatementKind::RecursiveCount);
        assert!(count.sql.starts_with("SELECT COUNT(*)"));
    }
}

#[test]
fn recursive_requires_self_reference() {
    let models = registry();
    let request = department_tree(Some(Condition::eq("id", 1)), Direction::Down);

    let err = compiler(&models, Dialect::Mysql)
        .compile_recursive("Company", &request)
        .unwrap_err();

    assert_eq!(
        err,
        QueryError::RecursiveField {
            model: "Company".to_string()
        }
    );
}

//
// Vector search
//

#[test]
fn vector_search_orders_by_distance() {
    let models = registry();
    let mut request = VectorSearchRequest::new("embedding", vec![0.5, 1.0], 5);
    request.max_distance = Some(0.8);
    request.distance_field = Some("distance".to_string());

    let statement = compiler(&models, Dialect::Mysql)
        .compile_vector_search("Order", &request)
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT t0.id AS `id`, t0.user_id AS `userId`, t0.status AS `status`, \
         t0.amount AS `amount`, t0.embedding AS `embedding`, \
         DISTANCE(t0.embedding, #{select[0].v}, 'COSINE') AS `distance` \
         FROM order_table AS t0 \
         WHERE DISTANCE(t0.embedding, #{c1.v}, 'COSINE') <= 0.8 \
         ORDER BY DISTANCE(t0.embedding, #{o0.v}, 'COSINE') \
         LIMIT #{_rows}"
    );
    assert_eq!(statement.kind, StatementKind::VectorSearch);
    assert_eq!(
        statement.params.get("o0.v"),
        Some(&Value::List(vec![Value::Float64(0.5), Value::Float64(1.0)]))
    );
    assert_eq!(statement.params.get(ROWS_PARAM), Some(&Value::Uint(5)));
}

#[test]
fn vector_search_approximate_ordering_on_oceanbase() {
    let models = registry();
    let request = VectorSearchRequest::new("embedding", vec![0.0; 3], 10);

    let statement = compiler(&models, Dialect::OceanBase)
        .compile_vector_search("Order", &request)
        .unwrap();

    assert!(
        statement
            .sql
            .contains("ORDER BY l2_distance(t0.embedding, #{o0.v}) APPROXIMATE")
    );
}

#[test]
fn vector_search_unsupported_dialect() {
    let models = registry();
    let request = VectorSearchRequest::new("embedding", vec![1.0], 1);

    let err = compiler(&models, Dialect::Sqlite)
        .compile_vector_search("Order", &request)
        .unwrap_err();

    assert!(matches!(err, QueryError::UnsupportedOperation { .. }));
}

//
// Positional output and counters
//

#[test]
fn positional_follows_config_style() {
    let models = registry();
    let condition = Condition::in_("name", ["Ann", "Bob"]);
    let config = EngineConfig {
        placeholder: Some(PlaceholderStyle::Numbered),
        ..EngineConfig::new(Dialect::Mysql)
    };
    let compiler = Compiler::new(&models, &(), config);

    let statement = compiler
        .compile_count("User", Some(&condition), &[], false)
        .unwrap();
    let positional = compiler.to_positional(&statement).unwrap();

    assert_eq!(
        positional.sql,
        "SELECT COUNT(*) AS `count` FROM users AS t0 WHERE (t0.delete_flag = $1 AND t0.name IN ($2,$3))"
    );
    assert_eq!(
        positional.values,
        vec![Value::Bool(false), Value::from("Ann"), Value::from("Bob")]
    );
}

#[test]
fn compile_calls_are_counted() {
    compile_reset_all();
    let models = registry();
    let compiler = compiler(&models, Dialect::Mysql);

    let request = QueryRequest::new()
        .with_select(["dept.name"])
        .with_condition(Condition::exists("orders", None));
    compiler.compile_query("User", &request).unwrap();
    compiler.compile_count("User", None, &[], false).unwrap();
    compiler
        .compile_query("Invoice", &QueryRequest::new())
        .unwrap_err();

    let report = compile_report();
    assert_eq!(report.ops.query_calls, 1);
    assert_eq!(report.ops.count_calls, 1);
    assert_eq!(report.ops.failures, 1);
    assert_eq!(report.ops.join_nodes, 1);
    assert_eq!(report.ops.exists_subqueries, 1);
    assert_eq!(report.models["User"].statements, 2);
    assert_eq!(report.models["Department"].joined, 1);
    assert_eq!(report.models["Order"].exists_subqueries, 1);
}
