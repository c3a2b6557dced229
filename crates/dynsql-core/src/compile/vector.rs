use crate::{
    compile::Compiler,
    condition::Condition,
    error::QueryError,
    query::{CustomSelectField, OrderItem, Page, QueryRequest, VectorSearchRequest},
    statement::{Statement, StatementKind},
    value::Value,
};

impl Compiler<'_> {
    /// Nearest-neighbour query ordered by the dialect's distance function.
    pub fn compile_vector_search(
        &self,
        model: &str,
        request: &VectorSearchRequest,
    ) -> Result<Statement, QueryError> {
        self.instrument(StatementKind::VectorSearch, model, || {
            let query = self.vector_query(request)?;
            self.query(model, &query, StatementKind::VectorSearch)
        })
    }

    fn vector_query(&self, request: &VectorSearchRequest) -> Result<QueryRequest, QueryError> {
        let dialect = self.dialect();
        let ordering = dialect.distance_template(true)?;
        let distance = dialect.distance_template(false)?;
        let field = request.embedding_field.clone();
        let vector = Value::List(
            request
                .query_vector
                .iter()
                .map(|f| Value::Float64(f64::from(*f)))
                .collect(),
        );

        let within = request.max_distance.map(|max| {
            Condition::custom(
                format!("{distance} <= {max}"),
                [field.clone()],
                Some(vector.clone()),
            )
        });

        let mut query = QueryRequest {
            condition: Condition::and_optional(request.condition.clone(), within),
            select_fields: request.select_fields.clone(),
            order_items: vec![OrderItem::function(
                Some(field.clone()),
                ordering,
                Some(vector.clone()),
            )],
            page: Some(Page::new(1, request.top_n)),
            ..QueryRequest::default()
        };
        if let Some(name) = &request.distance_field {
            query
                .custom_select_fields
                .push(CustomSelectField::new(name.clone(), distance, [field], Some(vector)));
        }

        Ok(query)
    }
}
