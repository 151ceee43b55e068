//! GraphQL endpoint: JSON and multipart (file upload) requests on `POST /graphql`.

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{extract::State, response::Html};

use crate::AppState;

pub const GRAPHQL_PATH: &str = "/graphql";

/// Execute a GraphQL request
pub async fn graphql_handler(State(state): State<AppState>, request: GraphQLRequest) -> GraphQLResponse {
    state.schema.execute(request.into_inner()).await.into()
}

/// GraphiQL IDE pointed at this server
pub async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish())
}
