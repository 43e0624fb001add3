pub mod auth;
pub mod request_id;

pub use auth::GraphqlAuth;
pub use request_id::{RequestId, RequestIdMiddleware};
