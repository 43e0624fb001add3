//! GraphQL schema and HTTP handlers
//!
//! Query / Mutation 根对象只做参数转换，业务逻辑全部在 `CampService`。

mod mutation;
mod query;
pub mod types;

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use async_graphql::http::GraphiQLSource;
use async_graphql::{EmptySubscription, ErrorExtensions, Schema};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};
use tracing::trace;

use crate::config::ApiConfig;
use crate::errors::CampError;
use crate::services::{CacheSyncService, CampService};

pub use mutation::MutationRoot;
pub use query::QueryRoot;

pub type CampSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// 构建 schema，注入服务并设置查询深度/复杂度上限
pub fn build_schema(
    service: Arc<CampService>,
    cache_sync: Arc<CacheSyncService>,
    api: &ApiConfig,
) -> CampSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .data(cache_sync)
        .limit_depth(api.max_query_depth)
        .limit_complexity(api.max_query_complexity)
        .finish()
}

/// CampError → GraphQL 错误（extensions 带 code / type）
pub(crate) trait GqlResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T> GqlResultExt<T> for crate::errors::Result<T> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(|e: CampError| e.extend())
    }
}

pub async fn graphql_handler(
    schema: web::Data<CampSchema>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(request.into_inner()).await.into()
}

pub async fn graphiql_handler(path: web::Data<GraphqlPath>) -> HttpResponse {
    trace!("Serving GraphiQL for {}", path.0);
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint(&path.0).finish())
}

/// GraphiQL 页面里请求的端点
#[derive(Clone, Debug)]
pub struct GraphqlPath(pub String);

/// GraphQL 路由：POST 执行查询，开启 playground 时 GET 返回 GraphiQL
pub fn graphql_routes(enable_playground: bool) -> actix_web::Resource {
    let resource = web::resource("").route(web::post().to(graphql_handler));
    if enable_playground {
        resource.route(web::get().to(graphiql_handler))
    } else {
        resource
    }
}
