/// GraphQL handlers - queries and mutations over HTTP, subscriptions over WebSocket
use actix_middleware::RequestIdentity;
use actix_web::{web, HttpRequest, HttpResponse};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};

use crate::routes::AppState;

/// POST /graphql
pub async fn graphql_handler(
    state: web::Data<AppState>,
    identity: RequestIdentity,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let request = req.into_inner().data(identity.into_inner());
    state.schema.execute(request).await.into()
}

/// GET /graphql (WebSocket upgrade)
pub async fn graphql_subscription_handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Payload,
) -> actix_web::Result<HttpResponse> {
    GraphQLSubscription::new(state.schema.clone()).start(&req, payload)
}

/// GET /graphql/schema
pub async fn schema_handler(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain")
        .body(state.schema.sdl())
}
