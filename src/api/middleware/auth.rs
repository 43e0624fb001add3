//! Bearer-token guard for the GraphQL endpoint
//!
//! - token 为空：端点关闭，一律 404
//! - OPTIONS 预检直接放行给 CORS 处理
//! - 开启 playground 时 GET（GraphiQL 页面）无需 token
//! - 其余请求必须带 `Authorization: Bearer <token>`，常量时间比较

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use subtle::ConstantTimeEq;
use tracing::{trace, warn};

#[derive(Clone)]
pub struct GraphqlAuth {
    token: Rc<str>,
    allow_playground: bool,
}

impl GraphqlAuth {
    pub fn new(token: &str, allow_playground: bool) -> Self {
        Self {
            token: Rc::from(token),
            allow_playground,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for GraphqlAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = GraphqlAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GraphqlAuthMiddleware {
            service: Rc::new(service),
            token: self.token.clone(),
            allow_playground: self.allow_playground,
        }))
    }
}

pub struct GraphqlAuthMiddleware<S> {
    service: Rc<S>,
    token: Rc<str>,
    allow_playground: bool,
}

/// 提取 `Bearer` 之后的部分
fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim())
    } else {
        None
    }
}

pub fn token_matches(provided: &str, expected: &str) -> bool {
    bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}

impl<S, B> Service<ServiceRequest> for GraphqlAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let token = self.token.clone();
        let allow_playground = self.allow_playground;

        Box::pin(async move {
            if token.is_empty() {
                trace!("GraphQL token not configured - endpoint disabled");
                return Ok(req.into_response(
                    HttpResponse::NotFound()
                        .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
                        .body("Not Found")
                        .map_into_right_body(),
                ));
            }

            let is_preflight = req.method() == Method::OPTIONS;
            let is_playground = allow_playground && req.method() == Method::GET;
            if is_preflight || is_playground {
                return Ok(srv.call(req).await?.map_into_left_body());
            }

            let authorized = bearer_token(&req).is_some_and(|t| token_matches(t, &token));
            if !authorized {
                warn!("GraphQL authentication failed - invalid or missing bearer token");
                return Ok(req.into_response(
                    HttpResponse::Unauthorized()
                        .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
                        .json(serde_json::json!({
                            "errors": [{
                                "message": "Unauthorized: invalid or missing token",
                                "extensions": { "code": "UNAUTHORIZED" }
                            }]
                        }))
                        .map_into_right_body(),
                ));
            }

            trace!("GraphQL authentication successful");
            Ok(srv.call(req).await?.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("secret", "secret"));
        assert!(!token_matches("secret", "Secret"));
        assert!(!token_matches("sec", "secret"));
        assert!(!token_matches("", "secret"));
    }
}
